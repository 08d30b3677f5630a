//! Reading the load order from a vanilla `morrowind.ini`

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{instrument, warn};

use crate::error::Result;

/// Directory next to `morrowind.ini` holding plugins and archives
pub const DATA_DIR_NAME: &str = "Data Files";

/// Load order read from `morrowind.ini`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorrowindIni {
    pub path: PathBuf,
    /// The `Data Files` directory
    pub data: PathBuf,
    /// Masters first, then plugins, each in file order
    pub plugins: Vec<PathBuf>,
    pub archives: Vec<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum Section {
    GameFiles,
    Archives,
    Other,
}

impl MorrowindIni {
    /// Read `morrowind.ini` at `path`. Entries naming missing files are skipped.
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let data = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join(DATA_DIR_NAME);

        Ok(Self::parse(path, data, &text))
    }

    fn parse(path: &Path, data: PathBuf, text: &str) -> Self {
        let mut masters = Vec::new();
        let mut plugins = Vec::new();
        let mut archives = Vec::new();
        let mut section = Section::Other;

        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = match name.trim().to_lowercase().as_str() {
                    "game files" => Section::GameFiles,
                    "archives" => Section::Archives,
                    _ => Section::Other,
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match section {
                Section::GameFiles if key.starts_with("gamefile") => {
                    let file = data.join(value);
                    if !file.is_file() {
                        warn!("skipping {}, not found in {}", value, data.display());
                        continue;
                    }
                    match Path::new(value)
                        .extension()
                        .map(|ext| ext.to_string_lossy().to_lowercase())
                        .as_deref()
                    {
                        Some("esm") => masters.push(file),
                        Some("esp") => plugins.push(file),
                        _ => warn!("skipping {}, not a plugin", value),
                    }
                }
                Section::Archives if key.starts_with("archive") => {
                    let file = data.join(value);
                    if file.is_file() {
                        archives.push(file);
                    } else {
                        warn!("skipping {}, not found in {}", value, data.display());
                    }
                }
                _ => {}
            }
        }

        masters.extend(plugins);
        MorrowindIni {
            path: path.to_path_buf(),
            data,
            plugins: masters,
            archives,
        }
    }
}
