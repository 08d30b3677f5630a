//! This library handles reading **BSA** archives used by *Morrowind*.
//!
//! # BSA Archive Format Documentation
//!
//! A TES3 BSA is a flat archive of uncompressed files with a single index in front of the data.
//!
//! | Offset (bytes)        | Field          | Description                                            |
//! |-----------------------|----------------|--------------------------------------------------------|
//! | 0x0000                | Version        | 4 bytes: fixed value 0x00000100                        |
//! | 0x0004                | Hash Offset    | 4 bytes: offset of the hash table minus the header     |
//! | 0x0008                | File Count     | 4 bytes: number of files in the archive                |
//! | 0x000C                | Records        | 8 bytes per file: size, offset into the data section   |
//! | 0x000C + 8n           | Name Offsets   | 4 bytes per file: offset into the name block           |
//! | 0x000C + 12n          | Names          | NUL terminated file names                              |
//! | 0x000C + Hash Offset  | Hashes         | 8 bytes per file: hash of the file name                |
//! | after the hashes      | Data           | The raw file data                                      |
//!
//! Names use `\` as separator and are matched case-insensitively by the game. This crate exposes
//! them lowercased with `/` separators, see [`read::normalize_name`].

pub mod error;
pub mod read;
pub mod types;

pub use read::{BsaArchive, BsaFile};
