//! Base types for the structure of a BSA file.

use binrw::{BinRead, BinWrite};

/// Size of the [`BsaHeader`] including its magic
pub const BSA_HEADER_LEN: u64 = 12;

/// Largest number of files an archive may declare
pub const MAX_FILE_COUNT: u32 = 200_000;

/// BSA file header
///
/// Always starts with the version `0x100`. All data is stored in little endian format.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(magic = 0x100u32, little)]
pub struct BsaHeader {
    /// Offset of the hash table, counted from the end of this header
    pub hash_offset: u32,

    /// The number of files stored in the archive
    pub file_count: u32,
}

impl BsaHeader {
    /// Absolute offset of the name offset table
    pub fn name_offsets_start(&self) -> u64 {
        BSA_HEADER_LEN + 8 * self.file_count as u64
    }

    /// Absolute offset of the names, which name offsets are relative to
    pub fn names_start(&self) -> u64 {
        BSA_HEADER_LEN + 12 * self.file_count as u64
    }

    /// Absolute offset of the hash table
    pub fn hashes_start(&self) -> u64 {
        BSA_HEADER_LEN + self.hash_offset as u64
    }

    /// Absolute offset of the file data, which record offsets are relative to
    pub fn data_start(&self) -> u64 {
        self.hashes_start() + 8 * self.file_count as u64
    }
}

/// Size and location of one file
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct BsaRecord {
    /// The size of the file data
    pub size: u32,

    /// The offset of the file data from the start of the data section
    pub offset: u32,
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{BsaHeader, BsaRecord};

    #[test]
    fn read_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x00, 0x01, 0x00, 0x00,
            0x2E, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
        ]);

        let header = BsaHeader::read(&mut input)?;
        assert_eq!(
            header,
            BsaHeader {
                hash_offset: 46,
                file_count: 2,
            }
        );
        assert_eq!(header.names_start(), 36);
        assert_eq!(header.data_start(), 12 + 46 + 16);

        Ok(())
    }

    #[test]
    fn read_wrong_magic() {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x42, 0x53, 0x41, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ]);

        assert!(BsaHeader::read(&mut input).is_err());
    }

    #[test]
    fn write_record() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x0B, 0x00, 0x00, 0x00,
            0x24, 0x00, 0x00, 0x00,
        ];

        let mut actual = Vec::new();
        BsaRecord { size: 11, offset: 36 }.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }
}
