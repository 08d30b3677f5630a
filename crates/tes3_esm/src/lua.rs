//! OpenMW Lua script attachments stored in a `LUAL` record
//!
//! Each script is a `LUAS` path immediately followed by a `LUAF` describing what it attaches to.

use crate::{
    error::{Error, Result},
    field::{require_len, Field},
    string_field,
    tag::{self, Tag},
};

string_field!(
    /// Virtual file system path of a Lua script
    LuaScriptPath,
    tag::LUAS
);

/// Attachment flags of a [`LuaAttachment`]
pub struct LuaFlags;

impl LuaFlags {
    /// Start as a global script
    pub const GLOBAL: u32 = 1 << 0;
    /// Local script that global scripts attach and detach
    pub const CUSTOM: u32 = 1 << 1;
    /// Attach to the player
    pub const PLAYER: u32 = 1 << 2;
    /// Merge with the configuration of earlier content files
    pub const MERGE: u32 = 1 << 3;
    /// Start as a menu script
    pub const MENU: u32 = 1 << 4;
}

/// Width of one attachment target
pub const LUA_TARGET_WIDTH: usize = 4;

/// What a Lua script is attached to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LuaAttachment {
    pub flags: u32,
    /// Record tags of the object types the script attaches to, such as `NPC_` or `CREA`
    pub targets: Vec<String>,
}

impl LuaAttachment {
    pub fn new(flags: u32, targets: Vec<String>) -> Self {
        LuaAttachment { flags, targets }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }
}

impl Field for LuaAttachment {
    const TAG: Tag = tag::LUAF;

    fn decode(data: &[u8]) -> Result<Self> {
        require_len(Self::TAG, data, 4)?;
        let flags = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);

        let raw = &data[4..];
        if raw.len() % LUA_TARGET_WIDTH != 0 {
            return Err(Error::InvalidLength {
                tag: Self::TAG,
                expected: raw.len() / LUA_TARGET_WIDTH * LUA_TARGET_WIDTH + 4,
                actual: data.len(),
            });
        }

        let targets = raw
            .chunks_exact(LUA_TARGET_WIDTH)
            .map(|target| String::from_utf8(target.to_vec()))
            .collect::<core::result::Result<_, _>>()?;

        Ok(LuaAttachment { flags, targets })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(4 + self.targets.len() * LUA_TARGET_WIDTH);
        out.extend_from_slice(&self.flags.to_le_bytes());
        for target in &self.targets {
            let bytes = target.as_bytes();
            if bytes.len() > LUA_TARGET_WIDTH {
                return Err(Error::ValueTooLong {
                    width: LUA_TARGET_WIDTH,
                    len: bytes.len(),
                });
            }
            out.extend_from_slice(bytes);
            out.resize(out.len() + LUA_TARGET_WIDTH - bytes.len(), b'_');
        }
        Ok(out)
    }
}
