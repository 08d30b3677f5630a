use itertools::Itertools;
use miette::{Context, Result};
use omw_cfg::OpenMwConfig;
use std::path::{Path, PathBuf};
use tes3_esm::{read_plugin_file, tag, Record};
use tracing::info;

pub mod diff;
pub mod read;
pub mod verify;

/// Plugin extensions the commands look for
const PLUGIN_EXTENSIONS: [&str; 3] = ["esm", "esp", "omwaddon"];

#[derive(clap::Subcommand)]
pub enum EsmCommands {
    /// Print the records of a plugin or of every plugin in an openmw.cfg
    Read(read::ReadArgs),
    /// Check that plugins in a directory are written back unchanged
    Verify(verify::VerifyArgs),
    /// Compare two plugins
    Diff(diff::DiffArgs),
}

impl EsmCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            EsmCommands::Read(read) => read.handle(),
            EsmCommands::Verify(verify) => verify.handle(),
            EsmCommands::Diff(diff) => diff.handle(),
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

pub(crate) fn is_plugin(path: &Path) -> bool {
    has_extension(path, &PLUGIN_EXTENSIONS)
}

/// Read a plugin, or every plugin of a `.cfg` in load order
pub(crate) fn load_plugins(path: &Path) -> Result<Vec<(PathBuf, Vec<Record>)>> {
    if !has_extension(path, &["cfg"]) {
        let records =
            read_plugin_file(path).with_context(|| format!("path: {}", path.display()))?;
        return Ok(vec![(path.to_path_buf(), records)]);
    }

    let config = OpenMwConfig::load(path)?;
    info!("reading {} plugins", config.content.len());
    config
        .content
        .into_iter()
        .map(|plugin| -> Result<_> {
            let records =
                read_plugin_file(&plugin).with_context(|| format!("path: {}", plugin.display()))?;
            Ok((plugin, records))
        })
        .collect()
}

/// Text of a zero padded string payload
fn zstring(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Identify a record by its tag and its first `NAME`, or `INTV` for landscape
pub(crate) fn record_key(record: &Record) -> String {
    if let Some(name) = record.subrecord(tag::NAME) {
        return format!("{} {}", record.tag, zstring(&name.data));
    }
    match record.subrecord(tag::INTV) {
        Some(intv) if intv.data.len() == 8 => {
            let x = i32::from_le_bytes([intv.data[0], intv.data[1], intv.data[2], intv.data[3]]);
            let y = i32::from_le_bytes([intv.data[4], intv.data[5], intv.data[6], intv.data[7]]);
            format!("{} ({}, {})", record.tag, x, y)
        }
        _ => record.tag.to_string(),
    }
}

/// Classic 16 bytes per line dump with offsets, hex and printable ASCII
pub(crate) fn hex_dump(data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(line, chunk)| {
            let hex = chunk.iter().map(|b| format!("{:02x}", b)).join(" ");
            let ascii: String = chunk
                .iter()
                .map(|b| {
                    if b.is_ascii_graphic() || *b == b' ' {
                        *b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{:08x}  {:<47}  {}", line * 16, hex, ascii)
        })
        .collect()
}
