//! Tag-length-value framing of a single subrecord

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use winnow::{binary::le_u32, error::ContextError, token::take, PResult, Parser};

use crate::{
    error::{Error, Result},
    tag::Tag,
};

/// Size of the tag and length that precede every subrecord payload
pub const SUBRECORD_HEADER_LEN: usize = 8;

/// A tagged field inside a [`Record`](crate::record::Record)
///
/// The payload is kept exactly as read, so writing a subrecord back out is lossless regardless of
/// whether a typed [`Field`](crate::field::Field) exists for its tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subrecord {
    pub tag: Tag,
    pub data: Vec<u8>,
}

fn subrecord_header(input: &mut &[u8]) -> PResult<(Tag, u32)> {
    (take(4usize).try_map(<[u8; 4]>::try_from).map(Tag), le_u32).parse_next(input)
}

impl Subrecord {
    pub fn new(tag: Tag, data: Vec<u8>) -> Self {
        Subrecord { tag, data }
    }

    /// Number of bytes this subrecord occupies once written
    pub fn serialized_size(&self) -> usize {
        SUBRECORD_HEADER_LEN + self.data.len()
    }

    /// Parse one subrecord from the front of `input`, advancing it past the payload.
    ///
    /// `record` is only used to describe the enclosing record when the declared length runs past
    /// the end of `input`.
    pub fn parse(input: &mut &[u8], record: Tag) -> Result<Subrecord> {
        if input.len() < SUBRECORD_HEADER_LEN {
            return Err(Error::Truncated {
                context: "subrecord header",
                needed: SUBRECORD_HEADER_LEN,
                available: input.len(),
            });
        }

        let (tag, declared) = subrecord_header(input)?;
        if declared as usize > input.len() {
            return Err(Error::StructuralOverrun {
                record,
                tag,
                declared,
                remaining: input.len(),
            });
        }

        let data = take::<_, _, ContextError>(declared as usize).parse_next(input)?;
        Ok(Subrecord::new(tag, data.to_vec()))
    }

    /// Parse every subrecord in a record body, which must be consumed exactly.
    pub fn parse_all(mut input: &[u8], record: Tag) -> Result<Vec<Subrecord>> {
        let mut subrecords = Vec::new();
        while !input.is_empty() {
            subrecords.push(Subrecord::parse(&mut input, record)?);
        }
        Ok(subrecords)
    }

    /// Read one subrecord from a stream.
    pub fn read<R: Read>(mut reader: R) -> Result<Subrecord> {
        let mut tag = [0u8; 4];
        reader.read_exact(&mut tag).map_err(|e| truncated(e, "subrecord header"))?;
        let len = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| truncated(e, "subrecord header"))?;

        let mut data = Vec::new();
        reader.take(len as u64).read_to_end(&mut data)?;
        if data.len() != len as usize {
            return Err(Error::Truncated {
                context: "subrecord payload",
                needed: len as usize,
                available: data.len(),
            });
        }

        Ok(Subrecord::new(Tag(tag), data))
    }

    /// Write the tag, payload length and payload.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let len = u32::try_from(self.data.len()).map_err(|_| Error::ValueTooLong {
            width: u32::MAX as usize,
            len: self.data.len(),
        })?;

        writer.write_all(self.tag.as_bytes())?;
        writer.write_u32::<LittleEndian>(len)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

fn truncated(e: io::Error, context: &'static str) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated {
            context,
            needed: SUBRECORD_HEADER_LEN,
            available: 0,
        }
    } else {
        Error::IOError(e)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use crate::{
        error::{Error, Result},
        subrecord::Subrecord,
        tag::{self, Tag},
    };

    #[test]
    fn parse_subrecord() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            b'N', b'A', b'M', b'E',  // Tag
            0x07, 0x00, 0x00, 0x00,  // Length
            b'B', b'a', b'l', b'm', b'o', b'r', b'a',
            b'D', b'A', b'T', b'A',  // Next subrecord
        ];

        let mut buf = input.as_slice();
        let subrecord = Subrecord::parse(&mut buf, tag::CELL)?;

        assert_eq!(subrecord, Subrecord::new(tag::NAME, b"Balmora".to_vec()));
        assert_eq!(buf, b"DATA");

        Ok(())
    }

    #[test]
    fn parse_empty_payload() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            b'Z', b'N', b'A', b'M',
            0x00, 0x00, 0x00, 0x00,
        ];

        let subrecord = Subrecord::parse(&mut input.as_slice(), tag::CELL)?;
        assert_eq!(subrecord, Subrecord::new(tag::ZNAM, Vec::new()));

        Ok(())
    }

    #[test]
    fn parse_overrun() {
        #[rustfmt::skip]
        let input = vec![
            b'N', b'A', b'M', b'E',
            0x10, 0x00, 0x00, 0x00,
            b'B', b'a', b'l',
        ];

        let result = Subrecord::parse(&mut input.as_slice(), tag::CELL);
        assert!(matches!(
            result,
            Err(Error::StructuralOverrun { record, tag: found, declared: 16, remaining: 3 })
                if record == tag::CELL && found == tag::NAME
        ));
    }

    #[test]
    fn parse_partial_header() {
        let input = vec![b'N', b'A', b'M', b'E', 0x10];

        let result = Subrecord::parse(&mut input.as_slice(), tag::CELL);
        assert!(matches!(result, Err(Error::Truncated { available: 5, .. })));
    }

    #[test]
    fn read_truncated_payload() {
        #[rustfmt::skip]
        let input = vec![
            b'N', b'A', b'M', b'E',
            0x04, 0x00, 0x00, 0x00,
            b'a', b'b',
        ];

        let result = Subrecord::read(Cursor::new(input));
        assert!(matches!(
            result,
            Err(Error::Truncated { needed: 4, available: 2, .. })
        ));
    }

    #[test]
    fn write_subrecord() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            b'L', b'U', b'A', b'S',
            0x03, 0x00, 0x00, 0x00,
            b'a', b'/', b'b',
        ];

        let mut actual = Vec::new();
        Subrecord::new(Tag::new(b"LUAS"), b"a/b".to_vec()).write(&mut actual)?;

        assert_eq!(actual, expected);
        assert_eq!(Subrecord::read(Cursor::new(&actual))?.data, b"a/b");

        Ok(())
    }
}
