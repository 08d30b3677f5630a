//! Outer record framing

use binrw::{binrw, BinRead, BinWrite};
use std::io::{Cursor, Read, Write};

use crate::{
    error::{Error, Result},
    subrecord::Subrecord,
    tag::Tag,
};

/// Size of the fixed header in front of every record
pub const RECORD_HEADER_LEN: usize = 16;

/// Fixed 16 byte record header
///
/// The reserved word between the size and the flags is skipped on read and always written as zero.
#[binrw]
#[brw(little)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RecordHeader {
    /// The record type
    pub tag: Tag,

    /// The size in bytes of the subrecords following the header
    pub size: u32,

    #[br(temp)]
    #[bw(calc = 0)]
    _reserved: u32,

    /// Record flags such as persistence, blocked or deleted
    pub flags: u32,
}

impl RecordHeader {
    pub fn new(tag: Tag, size: u32, flags: u32) -> Self {
        RecordHeader { tag, size, flags }
    }
}

/// A top level record: a tag, flags and the ordered subrecords that make it up
///
/// The plugin name and offset describe where the record was read from and are never written back.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    pub tag: Tag,
    pub flags: u32,
    pub subrecords: Vec<Subrecord>,

    #[cfg_attr(feature = "serde", serde(skip))]
    pub plugin_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub plugin_offset: u64,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.flags == other.flags && self.subrecords == other.subrecords
    }
}

impl Eq for Record {}

impl Record {
    pub fn new(tag: Tag) -> Self {
        Record {
            tag,
            ..Default::default()
        }
    }

    pub fn with_subrecords(tag: Tag, flags: u32, subrecords: Vec<Subrecord>) -> Self {
        Record {
            tag,
            flags,
            subrecords,
            ..Default::default()
        }
    }

    /// Decode a record body given its already parsed header.
    pub fn from_body(header: &RecordHeader, body: &[u8]) -> Result<Record> {
        if body.len() != header.size as usize {
            return Err(Error::Truncated {
                context: "record body",
                needed: header.size as usize,
                available: body.len(),
            });
        }

        Ok(Record::with_subrecords(
            header.tag,
            header.flags,
            Subrecord::parse_all(body, header.tag)?,
        ))
    }

    /// Parse a header from exactly [`RECORD_HEADER_LEN`] bytes
    pub fn parse_header(bytes: &[u8; RECORD_HEADER_LEN]) -> Result<RecordHeader> {
        Ok(RecordHeader::read(&mut Cursor::new(bytes))?)
    }

    /// Read one complete record from a stream.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly before the first header byte.
    pub fn read<R: Read>(mut reader: R) -> Result<Option<Record>> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        let filled = read_full(&mut reader, &mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < RECORD_HEADER_LEN {
            return Err(Error::Truncated {
                context: "record header",
                needed: RECORD_HEADER_LEN,
                available: filled,
            });
        }

        let header = Self::parse_header(&header)?;
        let mut body = Vec::new();
        reader.take(header.size as u64).read_to_end(&mut body)?;

        Self::from_body(&header, &body).map(Some)
    }

    /// Header describing this record as it would currently be written
    pub fn header(&self) -> Result<RecordHeader> {
        let size = self.body_size();
        let size = u32::try_from(size).map_err(|_| Error::ValueTooLong {
            width: u32::MAX as usize,
            len: size,
        })?;
        Ok(RecordHeader::new(self.tag, size, self.flags))
    }

    fn body_size(&self) -> usize {
        self.subrecords.iter().map(Subrecord::serialized_size).sum()
    }

    /// Number of bytes this record occupies once written, including its header
    pub fn serialized_size(&self) -> usize {
        RECORD_HEADER_LEN + self.body_size()
    }

    /// Write the record with a size computed from its subrecords.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let mut body = Vec::with_capacity(self.body_size());
        for subrecord in &self.subrecords {
            subrecord.write(&mut body)?;
        }

        let header = self.header()?;
        let mut head = Cursor::new(Vec::with_capacity(RECORD_HEADER_LEN));
        header.write(&mut head)?;

        writer.write_all(head.get_ref())?;
        writer.write_all(&body)?;
        Ok(())
    }

    /// First subrecord with the given tag
    pub fn subrecord(&self, tag: Tag) -> Option<&Subrecord> {
        self.subrecords.iter().find(|s| s.tag == tag)
    }

    /// All subrecords with the given tag, in order
    pub fn subrecords_by_tag(&self, tag: Tag) -> impl Iterator<Item = &Subrecord> {
        self.subrecords.iter().filter(move |s| s.tag == tag)
    }

    pub fn push(&mut self, subrecord: Subrecord) {
        self.subrecords.push(subrecord);
    }

    /// Keep only the subrecords matching the predicate
    pub fn retain<F: FnMut(&Subrecord) -> bool>(&mut self, f: F) {
        self.subrecords.retain(f);
    }
}

/// Fill as much of `buf` as the reader allows, stopping early only at end of stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod test {
    use binrw::{BinRead, BinWrite};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use crate::{
        error::{Error, Result},
        record::{Record, RecordHeader},
        subrecord::Subrecord,
        tag,
    };

    #[test]
    fn read_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            b'C', b'E', b'L', b'L',
            0x20, 0x00, 0x00, 0x00,
            0xAA, 0xBB, 0xCC, 0xDD,
            0x00, 0x04, 0x00, 0x00,
        ]);

        assert_eq!(
            RecordHeader::read(&mut input)?,
            RecordHeader::new(tag::CELL, 32, 0x400)
        );

        Ok(())
    }

    #[test]
    fn write_header_zeroes_reserved() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            b'L', b'A', b'N', b'D',
            0x08, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
        ];

        let mut actual = Vec::new();
        RecordHeader::new(tag::LAND, 8, 1).write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn write_computes_size() -> Result<()> {
        let record = Record::with_subrecords(
            tag::LUAL,
            0,
            vec![
                Subrecord::new(tag::LUAS, b"a.lua".to_vec()),
                Subrecord::new(tag::LUAF, vec![0; 8]),
            ],
        );

        let mut actual = Vec::new();
        record.write(&mut actual)?;

        assert_eq!(actual.len(), 16 + 8 + 5 + 8 + 8);
        assert_eq!(&actual[4..8], &[29, 0, 0, 0]);
        assert_eq!(Record::read(Cursor::new(actual))?, Some(record));

        Ok(())
    }

    #[test]
    fn read_empty_stream() -> Result<()> {
        assert_eq!(Record::read(Cursor::new(Vec::new()))?, None);
        Ok(())
    }

    #[test]
    fn read_partial_header() {
        let result = Record::read(Cursor::new(vec![b'C', b'E', b'L', b'L', 0x00]));
        assert!(matches!(
            result,
            Err(Error::Truncated { needed: 16, available: 5, .. })
        ));
    }

    #[test]
    fn read_truncated_body() {
        #[rustfmt::skip]
        let input = vec![
            b'C', b'E', b'L', b'L',
            0x20, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            b'N', b'A', b'M', b'E',
        ];

        let result = Record::read(Cursor::new(input));
        assert!(matches!(
            result,
            Err(Error::Truncated { needed: 32, available: 4, .. })
        ));
    }

    #[test]
    fn subrecord_past_record_end() {
        #[rustfmt::skip]
        let input = vec![
            b'C', b'E', b'L', b'L',
            0x0C, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            b'N', b'A', b'M', b'E',
            0x08, 0x00, 0x00, 0x00,
            b'a', b'b', b'c', b'd',
            b'R', b'G', b'N', b'N',
        ];

        let result = Record::read(Cursor::new(input));
        assert!(matches!(
            result,
            Err(Error::StructuralOverrun { declared: 8, remaining: 4, .. })
        ));
    }

    #[test]
    fn equality_ignores_provenance() {
        let mut left = Record::new(tag::CELL);
        left.plugin_name = Some("a.esp".into());
        left.plugin_offset = 120;

        assert_eq!(left, Record::new(tag::CELL));
    }
}
