//! Reading `openmw.cfg` and the configurations it pulls in
//!
//! A configuration is a list of `key=value` lines. The keys used here are:
//!
//! | Key                | Meaning                                                       |
//! |--------------------|---------------------------------------------------------------|
//! | `data`             | A data directory, later ones take priority                    |
//! | `data-local`       | The highest priority data directory                           |
//! | `user-data`        | Directory for saves and screenshots                           |
//! | `fallback-archive` | A BSA archive, found through the data directories             |
//! | `content`          | A plugin, found through the data directories                  |
//! | `config`           | A directory with another `openmw.cfg`, loaded after this one  |
//! | `replace`          | Drop everything earlier configurations set for a key          |
//!
//! Every other key is ignored.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

/// Name of the configuration file in every configuration directory
pub const CONFIG_FILE_NAME: &str = "openmw.cfg";

/// Plugin extensions accepted in `content=` lines
pub const PLUGIN_EXTENSIONS: [&str; 3] = ["esm", "esp", "omwaddon"];

/// Locate the `openmw.cfg` to start from.
///
/// The hint may be the file itself or its directory. After the hint, the current directory, the
/// directory of the executable and the per platform OpenMW configuration directories are tried.
pub fn find_root(hint: Option<&Path>) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(hint) = hint {
        candidates.push(hint.to_path_buf());
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd);
    }
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir);
    }
    if let Some(config) = dirs::config_dir() {
        candidates.push(config.join("openmw"));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("Library").join("Preferences").join("openmw"));
    }
    if let Some(documents) = dirs::document_dir() {
        candidates.push(documents.join("My Games").join("OpenMW"));
    }

    for candidate in &candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
        let nested = candidate.join(CONFIG_FILE_NAME);
        if nested.is_file() {
            return Ok(nested);
        }
    }

    Err(Error::ConfigNotFound {
        searched: candidates,
    })
}

/// Undo OpenMW quoting: a value in double quotes may contain `&&` for `&` and `&"` for `"`.
///
/// Returns `None` for an opening quote without a closing one.
pub fn unquote(value: &str) -> Option<String> {
    let Some(quoted) = value.strip_prefix('"') else {
        return Some(value.to_owned());
    };

    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => match chars.next() {
                Some(escaped @ ('&' | '"')) => out.push(escaped),
                Some(other) => {
                    out.push('&');
                    out.push(other);
                }
                None => out.push('&'),
            },
            '"' => return Some(out),
            _ => out.push(c),
        }
    }
    None
}

/// Expand a leading `?token?` or `~` in a path
fn expand_tokens(value: &str, local: &Path, source: &Path) -> Result<PathBuf> {
    if let Some(rest) = value.strip_prefix('?') {
        let Some((token, rest)) = rest.split_once('?') else {
            return Ok(PathBuf::from(value));
        };
        let base = match token {
            "local" => Some(local.to_path_buf()),
            "userconfig" => dirs::config_dir().map(|dir| dir.join("openmw")),
            "userdata" => dirs::data_dir().map(|dir| dir.join("openmw")),
            "global" => Some(global_dir()),
            _ => None,
        };
        let base = base.ok_or_else(|| Error::UnknownToken {
            path: source.to_path_buf(),
            token: format!("?{}?", token),
        })?;
        return Ok(base.join(rest.trim_start_matches(['/', '\\'])));
    }

    if let Some(rest) = value.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return Ok(home.join(rest.trim_start_matches(['/', '\\'])));
        }
    }

    Ok(PathBuf::from(value))
}

fn global_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Library/Application Support")
    } else if cfg!(windows) {
        PathBuf::from("C:\\Program Files\\OpenMW")
    } else {
        PathBuf::from("/usr/share/games")
    }
}

/// One key that `replace=` can clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Replace {
    Config,
    Data,
    Content,
    FallbackArchive,
}

/// A name to be found through the data directories, remembered with the directory of the
/// configuration that named it
#[derive(Debug, Clone, PartialEq)]
struct Named {
    name: String,
    base: PathBuf,
}

/// Values read from one configuration file
#[derive(Debug, Clone, Default)]
struct Context {
    path: PathBuf,
    data: Vec<PathBuf>,
    data_local: Vec<PathBuf>,
    user_data: Vec<PathBuf>,
    archives: Vec<Named>,
    content: Vec<Named>,
    nested: Vec<PathBuf>,
    replace: HashSet<Replace>,
}

/// The merged result of an `openmw.cfg` and every configuration it loads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenMwConfig {
    /// The root configuration file
    pub path: PathBuf,
    /// Every configuration file that contributed, in load order
    pub sources: Vec<PathBuf>,
    pub data: Vec<PathBuf>,
    pub data_local: Vec<PathBuf>,
    pub user_data: Vec<PathBuf>,
    /// Resolved BSA archives in load order
    pub archives: Vec<PathBuf>,
    /// Resolved plugins in load order
    pub content: Vec<PathBuf>,
}

impl OpenMwConfig {
    /// Find the root configuration from `hint` and load it
    pub fn find(hint: Option<&Path>) -> Result<Self> {
        Self::load(find_root(hint)?)
    }

    /// Load `path` and the configurations it pulls in through `config=`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let root = fs::canonicalize(path)?;
        let local = root.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut visited = HashSet::new();
        let mut contexts = Vec::new();
        load_recursive(&root, &local, &mut contexts, &mut visited)?;

        let mut config = OpenMwConfig {
            path: root,
            ..Default::default()
        };
        let mut archives = Vec::new();
        let mut content = Vec::new();

        for context in contexts {
            if context.replace.contains(&Replace::Data) {
                config.data.clear();
            }
            if context.replace.contains(&Replace::Content) {
                content.clear();
            }
            if context.replace.contains(&Replace::FallbackArchive) {
                archives.clear();
            }

            config.sources.push(context.path);
            config.data.extend(context.data);
            config.data_local.extend(context.data_local);
            config.user_data.extend(context.user_data);
            archives.extend(context.archives);
            content.extend(context.content);
        }

        config.archives = archives
            .iter()
            .map(|named| config.resolve(named))
            .collect();
        config.content = content.iter().map(|named| config.resolve(named)).collect();

        debug!(
            "loaded {} data directories, {} archives and {} plugins",
            config.data.len(),
            config.archives.len(),
            config.content.len()
        );
        Ok(config)
    }

    /// Directories searched for plugins and archives, highest priority first
    pub fn search_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        self.data_local.iter().rev().chain(self.data.iter().rev())
    }

    fn resolve(&self, named: &Named) -> PathBuf {
        if let Some(found) = self
            .search_dirs()
            .find_map(|dir| crate::vfs::find_file(dir, &named.name))
        {
            return found;
        }
        warn!("{} not found in any data directory", named.name);
        named.base.join(&named.name)
    }
}

fn load_recursive(
    path: &Path,
    local: &Path,
    contexts: &mut Vec<Context>,
    visited: &mut HashSet<PathBuf>,
) -> Result<()> {
    let path = fs::canonicalize(path)?;
    if !visited.insert(path.clone()) {
        debug!("skipping {}, already loaded", path.display());
        return Ok(());
    }

    let context = parse_config(&path, &fs::read_to_string(&path)?, local)?;
    if context.replace.contains(&Replace::Config) {
        contexts.clear();
    }

    let nested = context.nested.clone();
    contexts.push(context);

    for config in nested {
        load_recursive(&config, local, contexts, visited)?;
    }
    Ok(())
}

fn parse_config(path: &Path, text: &str, local: &Path) -> Result<Context> {
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut context = Context {
        path: path.to_path_buf(),
        ..Default::default()
    };

    let resolve = |value: &str| -> Result<PathBuf> {
        let expanded = expand_tokens(value, local, path)?;
        Ok(if expanded.is_relative() {
            base.join(expanded)
        } else {
            expanded
        })
    };

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let invalid = || Error::InvalidConfigLine {
            path: path.to_path_buf(),
            line: index + 1,
            content: line.to_owned(),
        };
        let (key, value) = line.split_once('=').ok_or_else(invalid)?;
        let key = key.trim().to_lowercase();
        let value = unquote(value.trim()).ok_or_else(invalid)?;

        match key.as_str() {
            "data" => context.data.push(resolve(&value)?),
            "data-local" => context.data_local.push(resolve(&value)?),
            "user-data" => context.user_data.push(resolve(&value)?),
            "fallback-archive" => context.archives.push(Named {
                name: value,
                base: base.clone(),
            }),
            "content" => {
                let extension = Path::new(&value)
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                if PLUGIN_EXTENSIONS.contains(&extension.as_str()) {
                    context.content.push(Named {
                        name: value,
                        base: base.clone(),
                    });
                } else {
                    debug!("skipping content {}, not a plugin", value);
                }
            }
            "config" => {
                let nested = resolve(&value)?.join(CONFIG_FILE_NAME);
                if nested.is_file() {
                    context.nested.push(nested);
                } else {
                    debug!("skipping config {}, no {}", value, CONFIG_FILE_NAME);
                }
            }
            "replace" => {
                for target in value.split(',').map(str::trim) {
                    match target {
                        "config" => context.replace.insert(Replace::Config),
                        "data" => context.replace.insert(Replace::Data),
                        "content" => context.replace.insert(Replace::Content),
                        "fallback-archive" => context.replace.insert(Replace::FallbackArchive),
                        other => {
                            debug!("ignoring replace={}", other);
                            false
                        }
                    };
                }
            }
            _ => {}
        }
    }

    Ok(context)
}
