//! Conversion between `.omwscripts` text and Lua subrecords
//!
//! Each non empty line has the form `KEY[, KEY...]: path`, where every key is either an
//! attachment flag or an object type:
//!
//! ```text
//! # comments start with '#' or '//'
//! GLOBAL: scripts/mymod/global.lua
//! NPC, CREATURE: scripts/mymod/actor.lua
//! ```
//!
//! ```
//! use tes3_esm::omwscripts;
//!
//! let subrecords = omwscripts::package("PLAYER: scripts/player.lua")?;
//! assert_eq!(subrecords.len(), 2);
//! assert_eq!(omwscripts::extract(&subrecords)?, "PLAYER: scripts/player.lua\n");
//! # Ok::<(), tes3_esm::error::Error>(())
//! ```

use tracing::warn;

use crate::{
    error::{Error, Result},
    field::Field,
    lua::{LuaAttachment, LuaFlags, LuaScriptPath},
    subrecord::Subrecord,
    tag::{self, targets, Tag},
};

/// Flag keys, in bit order
const FLAG_KEYS: [(&str, u32); 4] = [
    ("GLOBAL", LuaFlags::GLOBAL),
    ("CUSTOM", LuaFlags::CUSTOM),
    ("PLAYER", LuaFlags::PLAYER),
    ("MENU", LuaFlags::MENU),
];

const TARGET_KEYS: [(&str, Tag); 17] = [
    ("ACTIVATOR", targets::ACTI),
    ("ARMOR", targets::ARMO),
    ("BOOK", targets::BOOK),
    ("CLOTHING", targets::CLOT),
    ("CONTAINER", targets::CONT),
    ("CREATURE", targets::CREA),
    ("DOOR", targets::DOOR),
    ("INGREDIENT", targets::INGR),
    ("LIGHT", targets::LIGH),
    ("MISC_ITEM", targets::MISC),
    ("NPC", targets::NPC_),
    ("POTION", targets::ALCH),
    ("WEAPON", targets::WEAP),
    ("APPARATUS", targets::APPA),
    ("LOCKPICK", targets::LOCK),
    ("PROBE", targets::PROB),
    ("REPAIR", targets::REPA),
];

fn parse_line(number: usize, line: &str) -> Result<(LuaScriptPath, LuaAttachment)> {
    let invalid = || Error::InvalidScriptLine {
        line: number,
        content: line.to_owned(),
    };

    let (keys, path) = line.split_once(':').ok_or_else(invalid)?;
    let (keys, path) = (keys.trim(), path.trim());
    if keys.is_empty() || path.is_empty() {
        return Err(invalid());
    }

    let mut attachment = LuaAttachment::default();
    for key in keys.split(',') {
        let key = key.trim().to_uppercase();
        if let Some((_, flag)) = FLAG_KEYS.iter().find(|(name, _)| *name == key) {
            attachment.flags |= flag;
        } else if let Some((_, target)) = TARGET_KEYS.iter().find(|(name, _)| *name == key) {
            attachment.targets.push(target.to_string());
        } else {
            return Err(Error::UnknownAttachKey { line: number, key });
        }
    }

    Ok((LuaScriptPath::new(path), attachment))
}

/// Turn omwscripts text into `LUAS`/`LUAF` subrecord pairs, one pair per script line.
pub fn package(content: &str) -> Result<Vec<Subrecord>> {
    let mut out = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let (path, attachment) = parse_line(index + 1, line)?;
        out.push(path.to_subrecord()?);
        out.push(attachment.to_subrecord()?);
    }
    Ok(out)
}

fn render_keys(attachment: &LuaAttachment) -> Vec<String> {
    let mut keys = Vec::new();
    for (name, flag) in FLAG_KEYS {
        if attachment.has_flag(flag) {
            keys.push(name.to_owned());
        }
    }

    let known = FLAG_KEYS.iter().fold(0, |all, (_, flag)| all | flag);
    if attachment.flags & !known != 0 {
        warn!(
            "dropping lua flags {:#x} without an omwscripts key",
            attachment.flags & !known
        );
    }

    for target in &attachment.targets {
        let name = TARGET_KEYS
            .iter()
            .find(|(_, tag)| tag.as_bytes() == target.as_bytes())
            .map_or(target.as_str(), |(name, _)| *name);
        keys.push(name.to_owned());
    }
    keys
}

/// Render the `LUAS`/`LUAF` pairs found in `subrecords` as omwscripts text.
///
/// Other Lua subrecords are ignored. A script path without an attachment is skipped.
pub fn extract(subrecords: &[Subrecord]) -> Result<String> {
    let mut out = String::new();
    let mut pending: Option<LuaScriptPath> = None;

    for subrecord in subrecords {
        match subrecord.tag {
            tag::LUAS => {
                if let Some(path) = pending.replace(LuaScriptPath::from_subrecord(subrecord)?) {
                    warn!("script {} has no attachment, skipping", path);
                }
            }
            tag::LUAF => {
                let attachment = LuaAttachment::from_subrecord(subrecord)?;
                let Some(path) = pending.take() else {
                    warn!("attachment without a script path, skipping");
                    continue;
                };
                out.push_str(&render_keys(&attachment).join(", "));
                out.push_str(": ");
                out.push_str(&path.value.to_string_lossy());
                out.push('\n');
            }
            _ => {}
        }
    }

    if let Some(path) = pending {
        warn!("script {} has no attachment, skipping", path);
    }

    Ok(out)
}
