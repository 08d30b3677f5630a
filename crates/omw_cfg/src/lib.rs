//! This library resolves the game files of an *OpenMW* or *Morrowind* installation.
//!
//! # Load order
//!
//! OpenMW reads `openmw.cfg` from several places and merges them, see [`openmw`]. The vanilla
//! engine reads `Morrowind.ini` next to its `Data Files` directory, see [`ini`]. Both produce a
//! list of plugins, a list of BSA archives and the directories loose files are read from.
//!
//! # Virtual file system
//!
//! [`Environment`] looks game data up the way the engine does: loose files in data directories
//! first, newest directory first, then archives, newest archive first.
//!
//! ```no_run
//! fn read_sky(hint: &std::path::Path) -> omw_cfg::error::Result<Vec<u8>> {
//!     let env = omw_cfg::Environment::load(Some(hint))?;
//!     env.read_file("textures\\tx_sky_clear.dds")
//! }
//! ```

pub mod error;
pub mod ini;
pub mod openmw;
pub mod vfs;

pub use ini::MorrowindIni;
pub use openmw::{find_root, OpenMwConfig};
pub use vfs::Environment;
