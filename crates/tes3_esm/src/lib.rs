//! This library handles reading from and writing **TES3** plugin files used by *Morrowind* and
//! *OpenMW* (`.esm`, `.esp` and `.omwaddon`).
//!
//! # Plugin Format Documentation
//!
//! A plugin is a flat sequence of records with no file level header or index. The first record is
//! always `TES3`, which describes the plugin and lists its masters.
//!
//! ## Records
//!
//! Every record starts with a fixed 16 byte header:
//!
//! | Offset (bytes) | Field     | Description                                            |
//! |----------------|-----------|--------------------------------------------------------|
//! | 0x0000         | Tag       | 4 bytes: record type such as `CELL` or `LAND`          |
//! | 0x0004         | Size      | 4 bytes: size of the subrecords following the header   |
//! | 0x0008         | Reserved  | 4 bytes: ignored, written as zero                      |
//! | 0x000C         | Flags     | 4 bytes: persistence, blocked and deleted flags        |
//!
//! The size covers exactly the subrecords of the record, so unknown records can be skipped and
//! copied without being understood.
//!
//! ## Subrecords
//!
//! | Offset (bytes) | Field     | Description                                            |
//! |----------------|-----------|--------------------------------------------------------|
//! | 0x0000         | Tag       | 4 bytes: field type such as `NAME` or `DATA`           |
//! | 0x0004         | Size      | 4 bytes: size of the payload                           |
//! | 0x0008         | Payload   | `Size` bytes                                           |
//!
//! All integers and floats are little endian. The meaning of a subrecord depends on the record it
//! is in: `DATA` holds the grid of a `CELL`, but the data type flags of a `LAND`.
//!
//! Records and subrecords are always kept as raw bytes by [`Record`] and [`Subrecord`], so
//! reading and writing a plugin is lossless. Typed views are layered on top:
//!
//! - [`field::Field`] decodes one subrecord payload
//! - [`header::Tes3`], [`cell::Cell`] and [`land::Land`] decode whole records
//! - [`omwscripts`] converts OpenMW script lists to and from `LUAS`/`LUAF` pairs
//!
//! ## Cells
//!
//! A cell has no explicit structure for the references it contains. Each placed object is a run
//! of subrecords starting at `FRMR` and ending right before the first tag that does not belong to
//! it, that it has already seen, or that starts another reference. See [`cell`] for the details.
//!
//! # Example
//!
//! ```no_run
//! use tes3_esm::{cell::Cell, read::read_plugin_file, tag};
//!
//! fn list_cells() -> tes3_esm::error::Result<()> {
//!     for record in read_plugin_file("Morrowind.esm")? {
//!         if record.tag == tag::CELL {
//!             let cell = Cell::from_record(&record)?;
//!             println!("{}: {} references", cell.display_name(), cell.persistent_children.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cell;
pub mod error;
pub mod field;
pub mod grid;
pub mod header;
pub mod land;
pub mod lua;
pub mod omwscripts;
pub mod read;
pub mod record;
pub mod subrecord;
pub mod tag;
pub mod write;

#[cfg(feature = "serde")]
mod serde_impl;

pub use read::{read_plugin_data, read_plugin_file, RecordReader};
pub use record::{Record, RecordHeader};
pub use subrecord::Subrecord;
pub use tag::Tag;
pub use write::{write_plugin_file, write_records};
