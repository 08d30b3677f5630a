//! A virtual file system over loose data directories and BSA archives

use std::{
    collections::HashMap,
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tes3_bsa::{read::normalize_name, BsaArchive};
use tracing::{debug, instrument, trace};

use crate::{
    error::{Error, Result},
    ini::MorrowindIni,
    openmw::OpenMwConfig,
};

/// Find `name` below `dir`, matching every path component without regard to case.
///
/// Returns `None` if any component is missing.
pub fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let mut current = dir.to_path_buf();
    for component in name.split(['/', '\\']).filter(|c| !c.is_empty()) {
        let exact = current.join(component);
        if exact.exists() {
            current = exact;
            continue;
        }

        let lower = component.to_lowercase();
        let entry = fs::read_dir(&current)
            .ok()?
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_name().to_string_lossy().to_lowercase() == lower)?;
        current = entry.path();
    }
    current.is_file().then_some(current)
}

type CachedArchive = BsaArchive<BufReader<File>>;

/// Resolved game files and the directories to look up game data in
#[derive(Debug, Default)]
pub struct Environment {
    /// The configuration this environment was built from
    pub path: PathBuf,
    /// Plugins in load order
    pub plugins: Vec<PathBuf>,
    /// Archives in load order, later ones take priority
    pub archives: Vec<PathBuf>,
    /// Data directories in load order, later ones take priority
    pub data: Vec<PathBuf>,
    /// Directories searched before any in `data`
    pub data_local: Vec<PathBuf>,
    pub user_data: Vec<PathBuf>,

    cache: Mutex<HashMap<PathBuf, CachedArchive>>,
}

impl From<OpenMwConfig> for Environment {
    fn from(config: OpenMwConfig) -> Self {
        Environment {
            path: config.path,
            plugins: config.content,
            archives: config.archives,
            data: config.data,
            data_local: config.data_local,
            user_data: config.user_data,
            cache: Mutex::default(),
        }
    }
}

impl From<MorrowindIni> for Environment {
    fn from(ini: MorrowindIni) -> Self {
        Environment {
            path: ini.path,
            plugins: ini.plugins,
            archives: ini.archives,
            data: vec![ini.data],
            ..Default::default()
        }
    }
}

impl Environment {
    /// Build from the `openmw.cfg` found through `hint`, see [`crate::openmw::find_root`]
    pub fn load(hint: Option<&Path>) -> Result<Self> {
        Ok(OpenMwConfig::find(hint)?.into())
    }

    /// Build from a `morrowind.ini`
    pub fn from_ini<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(MorrowindIni::load(path)?.into())
    }

    /// Read a game file by its data path, e.g. `meshes/f/flora_tree_01.nif`.
    ///
    /// Loose files win over archives. Among each, later entries win over earlier ones.
    #[instrument(skip(self), err)]
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let name = normalize_name(name);

        let loose = self
            .data_local
            .iter()
            .rev()
            .chain(self.data.iter().rev())
            .find_map(|dir| find_file(dir, &name));
        if let Some(path) = loose {
            trace!("{} found at {}", name, path.display());
            return Ok(fs::read(path)?);
        }

        // a poisoned lock still holds usable indexes
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for path in self.archives.iter().rev() {
            if !cache.contains_key(path) {
                debug!("indexing {}", path.display());
                let archive = BsaArchive::new(BufReader::new(File::open(path)?))?;
                cache.insert(path.clone(), archive);
            }
            let Some(archive) = cache.get_mut(path) else {
                continue;
            };
            if archive.index_for_name(&name).is_some() {
                trace!("{} found in {}", name, path.display());
                return Ok(archive.read_file(&name)?);
            }
        }

        Err(Error::FileNotFound(name))
    }
}
