//! Types for reading BSA archives
//!

use binrw::BinRead;
use byteorder::{LittleEndian, ReadBytesExt};
use indexmap::IndexMap;
use std::{
    fmt::{self, Debug},
    io::{BufRead, BufReader, Read, Seek, SeekFrom, Take},
    sync::Arc,
};
use tracing::debug;

use crate::{
    error::{Error, FileNotFoundError, Result},
    types::{BsaHeader, BsaRecord, MAX_FILE_COUNT},
};

/// Longest file name accepted in the name table
const MAX_NAME_LEN: u64 = 4096;

/// Lowercase a path and use `/` separators, the form every archive name is stored in
pub fn normalize_name(name: &str) -> String {
    name.replace('\\', "/").to_lowercase()
}

/// A struct for reading an entry from a BSA file
pub struct BsaFile<'a, R: Read + Seek> {
    data: &'a BsaFileData,
    reader: Take<&'a mut R>,
}

impl<'a, R: Read + Seek> Debug for BsaFile<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BsaFile({:#?})", self.data)
    }
}

/// Methods for retrieving information on BSA file entries
impl<'a, R: Read + Seek> BsaFile<'a, R> {
    /// Get the normalized name of the file
    ///
    /// # Warnings
    ///
    /// It is dangerous to use this name directly when extracting an archive.
    /// It may contain an absolute path (`/etc/shadow`), or break out of the
    /// current directory (`../runtime`).
    pub fn name(&self) -> &str {
        &self.data.file_name
    }

    /// Get the size of the file, in bytes
    pub fn size(&self) -> u64 {
        self.data.size
    }

    /// Get the absolute offset of the file data
    pub fn data_start(&self) -> u64 {
        self.data.data_start
    }

    /// Get the name hash stored in the archive
    pub fn hash(&self) -> u64 {
        self.data.hash
    }
}

impl<R: Read + Seek> Read for BsaFile<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Structure representing a BSA file entry.
#[derive(Debug, Clone, Default)]
pub struct BsaFileData {
    /// Hash of the file name
    pub hash: u64,
    /// Size of the file
    pub size: u64,
    /// Normalized name of the file
    pub file_name: Box<str>,
    /// Absolute offset of the file data
    pub data_start: u64,
}

#[derive(Debug)]
pub(crate) struct Shared {
    header: BsaHeader,
    files: IndexMap<Box<str>, BsaFileData>,
}

/// BSA archive reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_bsa_contents(reader: impl Read + Seek) -> tes3_bsa::error::Result<()> {
///     let mut bsa = tes3_bsa::BsaArchive::new(reader)?;
///
///     for i in 0..bsa.len() {
///         let mut file = bsa.by_index(i)?;
///         println!("Filename: {}", file.name());
///         std::io::copy(&mut file, &mut std::io::stdout())?;
///     }
///
///     Ok(())
/// }
/// ```
pub struct BsaArchive<R> {
    reader: R,
    shared: Arc<Shared>,
}

impl<R> Clone for BsaArchive<R>
where
    R: Clone,
{
    fn clone(&self) -> Self {
        BsaArchive {
            reader: self.reader.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<R> Debug for BsaArchive<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BsaArchive")
            .field("header", &self.shared.header)
            .field("files", &self.shared.files.len())
            .finish_non_exhaustive()
    }
}

impl<R> BsaArchive<R> {
    /// Total size of the files in the archive
    pub fn total_size(&self) -> u64 {
        self.shared.files.values().map(|file| file.size).sum()
    }

    /// Absolute offset of the data section
    pub fn data_start(&self) -> u64 {
        self.shared.header.data_start()
    }
}

impl<R: Read + Seek> BsaArchive<R> {
    /// Read a BSA archive collecting the files it contains.
    pub fn new(mut reader: R) -> Result<BsaArchive<R>> {
        let shared = Self::get_metadata(&mut reader)?;
        Ok(BsaArchive {
            reader,
            shared: shared.into(),
        })
    }

    /// Number of entries contained in this BSA.
    pub fn len(&self) -> usize {
        self.shared.files.len()
    }

    /// Whether this BSA archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over all the file names in this archive.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.shared.files.keys().map(|s| s.as_ref())
    }

    /// Get the index of a file entry by name, if it's present.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.shared.files.get_index_of(normalize_name(name).as_str())
    }

    /// Get the name of a file entry, if it's present.
    #[inline(always)]
    pub fn name_for_index(&self, index: usize) -> Option<&str> {
        self.shared
            .files
            .get_index(index)
            .map(|(name, _)| name.as_ref())
    }

    /// Search for a file entry by name, ignoring case and separator style
    pub fn by_name(&mut self, name: &str) -> Result<BsaFile<'_, R>> {
        let Some(index) = self.index_for_name(name) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.by_index(index)
    }

    /// Get a contained file by index
    pub fn by_index(&mut self, file_number: usize) -> Result<BsaFile<'_, R>> {
        let (_, data) = self
            .shared
            .files
            .get_index(file_number)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(file_number)))?;

        self.reader.seek(SeekFrom::Start(data.data_start))?;
        Ok(BsaFile {
            data,
            reader: (&mut self.reader).take(data.size),
        })
    }

    /// Read the whole contents of a file by name
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.by_name(name)?;
        let size = file.size();
        let mut out = Vec::with_capacity(size as usize);
        file.read_to_end(&mut out)?;

        if out.len() as u64 != size {
            return Err(Error::CorruptEntry {
                index: self.index_for_name(name).unwrap_or_default(),
                reason: format!("expected {} bytes, read {}", size, out.len()),
            });
        }
        Ok(out)
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn get_records(reader: &mut R, header: &BsaHeader) -> Result<Vec<BsaRecord>> {
        (0..header.file_count)
            .map(|_| BsaRecord::read(reader).map_err(Error::from))
            .collect()
    }

    fn get_name_offsets(reader: &mut R, header: &BsaHeader) -> Result<Vec<u32>> {
        (0..header.file_count)
            .map(|_| Ok(reader.read_u32::<LittleEndian>()?))
            .collect()
    }

    fn get_names(
        reader: &mut R,
        header: &BsaHeader,
        offsets: &[u32],
        end: u64,
    ) -> Result<Vec<String>> {
        offsets
            .iter()
            .enumerate()
            .map(|(index, offset)| {
                let start = header.names_start() + *offset as u64;
                if start >= end {
                    return Err(Error::CorruptEntry {
                        index,
                        reason: format!("name offset {} is past the end of the archive", offset),
                    });
                }

                reader.seek(SeekFrom::Start(start))?;
                let mut raw = Vec::new();
                BufReader::new((&mut *reader).take(MAX_NAME_LEN + 1)).read_until(0, &mut raw)?;
                match raw.pop() {
                    Some(0) => Ok(normalize_name(&String::from_utf8_lossy(&raw))),
                    _ => Err(Error::CorruptEntry {
                        index,
                        reason: "name is not terminated".to_owned(),
                    }),
                }
            })
            .collect()
    }

    fn get_hashes(reader: &mut R, header: &BsaHeader) -> Result<Vec<u64>> {
        reader.seek(SeekFrom::Start(header.hashes_start()))?;
        (0..header.file_count)
            .map(|_| Ok(reader.read_u64::<LittleEndian>()?))
            .collect()
    }

    fn get_metadata(reader: &mut R) -> Result<Shared> {
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header = BsaHeader::read(reader).map_err(|e| match e {
            binrw::Error::BadMagic { .. } => Error::InvalidArchive("not a TES3 archive".to_owned()),
            other => Error::from(other),
        })?;
        if header.file_count > MAX_FILE_COUNT {
            return Err(Error::InvalidArchive(format!(
                "unreasonable file count {}",
                header.file_count
            )));
        }
        if header.data_start() > end {
            return Err(Error::InvalidArchive(format!(
                "hash table at {} with {} entries runs past the end of the archive",
                header.hashes_start(),
                header.file_count
            )));
        }

        let records = Self::get_records(reader, &header)?;
        let offsets = Self::get_name_offsets(reader, &header)?;
        let names = Self::get_names(reader, &header, &offsets, end)?;
        let hashes = Self::get_hashes(reader, &header)?;

        let mut files = IndexMap::with_capacity(header.file_count as usize);
        for (index, ((record, name), hash)) in records.into_iter().zip(names).zip(hashes).enumerate() {
            let data_start = header.data_start() + record.offset as u64;
            if data_start + record.size as u64 > end {
                return Err(Error::CorruptEntry {
                    index,
                    reason: format!(
                        "data at {} with size {} runs past the end of the archive",
                        data_start, record.size
                    ),
                });
            }

            let file = BsaFileData {
                hash,
                size: record.size as u64,
                file_name: name.into(),
                data_start,
            };
            files.insert(file.file_name.clone(), file);
        }

        debug!("read bsa index with {} files", files.len());
        Ok(Shared { header, files })
    }
}

#[cfg(test)]
mod test {
    use std::io::prelude::*;

    use pretty_assertions::assert_eq;

    use crate::{
        error::{Error, Result},
        read::BsaArchive,
    };
    use std::io::Cursor;

    #[test]
    fn read_invalid_magic() {
        #[rustfmt::skip]
        let input = [
            0x42, 0x53, 0x41, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        assert!(matches!(
            BsaArchive::new(Cursor::new(input)),
            Err(Error::InvalidArchive(_))
        ));
    }

    #[test]
    fn read_empty_bsa() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x00, 0x01, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let archive = BsaArchive::new(Cursor::new(input))?;
        assert!(archive.is_empty());

        Ok(())
    }

    #[test]
    fn read_unreasonable_count() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x01, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x41, 0x0D, 0x03, 0x00,
        ];

        assert!(matches!(
            BsaArchive::new(Cursor::new(input)),
            Err(Error::InvalidArchive(_))
        ));
    }

    #[test]
    fn read_bsa_with_entry() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            // Header (12)
            0x00, 0x01, 0x00, 0x00,
            0x16, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            // Records (8)
            0x05, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            // Name offsets (4)
            0x00, 0x00, 0x00, 0x00,
            // Names (10)
            b'A', b'\\', b'B', b'.', b'T', b'X', b'T', 0x00, 0x00, 0x00,
            // Hashes (8)
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
            // Data (5)
            b'h', b'e', b'l', b'l', b'o',
        ];

        let mut archive = BsaArchive::new(Cursor::new(input))?;
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.name_for_index(0), Some("a/b.txt"));
        assert_eq!(archive.index_for_name("A\\B.TXT"), Some(0));

        let mut file = archive.by_name("a/B.txt")?;
        assert_eq!(file.data_start(), 42);
        assert_eq!(file.size(), 5);
        assert_eq!(file.hash(), 0x0807_0605_0403_0201);

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        assert_eq!(buffer, b"hello");

        assert!(matches!(
            archive.by_name("missing.txt"),
            Err(Error::FileNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn read_bsa_with_data_out_of_bounds() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x01, 0x00, 0x00,
            0x12, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            b'a', b'.', b't', b'x', b't', 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            b'h', b'i',
        ];

        assert!(matches!(
            BsaArchive::new(Cursor::new(input)),
            Err(Error::CorruptEntry { index: 0, .. })
        ));
    }
}
