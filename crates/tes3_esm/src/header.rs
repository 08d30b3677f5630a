//! The `TES3` record that opens every plugin

use bon::Builder;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::{
    error::{Error, Result},
    field::{read_padded_string, require_len, warn_trailing, write_padded_string, Field, Text},
    record::Record,
    scalar_field, string_field,
    tag::{self, Tag},
};

/// Size of the `HEDR` payload
pub const HEADER_SIZE: usize = 300;
/// Width of the author field
pub const HEADER_NAME_WIDTH: usize = 32;
/// Width of the description field
pub const HEADER_DESCRIPTION_WIDTH: usize = 256;

/// Plugin header data stored in `HEDR`
///
/// ```
/// use tes3_esm::header::FileHeader;
///
/// let header = FileHeader::builder()
///     .name("me")
///     .description("My plugin")
///     .build();
/// assert_eq!(header.version, 1.3);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileHeader {
    /// Format version, 1.2 or 1.3
    #[builder(default = 1.3)]
    pub version: f32,

    /// Plugin flags, bit 0 marks a master file
    #[builder(default)]
    pub flags: u32,

    /// Author, at most 32 bytes
    #[builder(into, default)]
    pub name: Text,

    /// Description, at most 256 bytes
    #[builder(into, default)]
    pub description: Text,

    /// Number of records following the header
    #[builder(default)]
    pub num_records: u32,
}

impl Default for FileHeader {
    fn default() -> Self {
        FileHeader::builder().build()
    }
}

impl Field for FileHeader {
    const TAG: Tag = tag::HEDR;

    fn decode(data: &[u8]) -> Result<Self> {
        require_len(Self::TAG, data, HEADER_SIZE)?;
        warn_trailing(Self::TAG, data, HEADER_SIZE);

        let mut reader = Cursor::new(data);
        let version = reader.read_f32::<LittleEndian>()?;
        let flags = reader.read_u32::<LittleEndian>()?;
        let name = read_padded_string(&data[8..8 + HEADER_NAME_WIDTH]);
        let description = read_padded_string(&data[40..40 + HEADER_DESCRIPTION_WIDTH]);

        reader.set_position(296);
        let num_records = reader.read_u32::<LittleEndian>()?;

        Ok(FileHeader {
            version,
            flags,
            name,
            description,
            num_records,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.write_f32::<LittleEndian>(self.version)?;
        out.write_u32::<LittleEndian>(self.flags)?;
        write_padded_string(&mut out, &self.name, HEADER_NAME_WIDTH)?;
        write_padded_string(&mut out, &self.description, HEADER_DESCRIPTION_WIDTH)?;
        out.write_u32::<LittleEndian>(self.num_records)?;
        Ok(out)
    }
}

string_field!(
    /// File name of a master this plugin depends on
    MasterName,
    tag::MAST
);

scalar_field!(
    /// Size in bytes of the master when the plugin was saved
    MasterSize(u64),
    tag::DATA
);

/// A master dependency
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Master {
    pub name: MasterName,
    pub size: MasterSize,
}

/// The decoded `TES3` record
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tes3 {
    pub flags: u32,
    pub header: FileHeader,
    pub masters: Vec<Master>,
}

impl Tes3 {
    /// A header for a new plugin without masters
    pub fn new(name: impl Into<Text>, description: impl Into<Text>) -> Self {
        Tes3 {
            flags: 0,
            header: FileHeader::builder()
                .name(name)
                .description(description)
                .build(),
            masters: Vec::new(),
        }
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        if record.tag != tag::TES3 {
            return Err(Error::TagMismatch {
                expected: tag::TES3,
                actual: record.tag,
            });
        }

        let mut header = None;
        let mut masters = Vec::new();
        let mut pending: Option<MasterName> = None;

        for subrecord in &record.subrecords {
            match subrecord.tag {
                tag::HEDR => header = Some(FileHeader::from_subrecord(subrecord)?),
                tag::MAST => {
                    if pending.is_some() {
                        return Err(Error::MissingField {
                            record: tag::TES3,
                            tag: tag::DATA,
                        });
                    }
                    pending = Some(MasterName::from_subrecord(subrecord)?);
                }
                tag::DATA => {
                    let name = pending.take().ok_or(Error::MissingField {
                        record: tag::TES3,
                        tag: tag::MAST,
                    })?;
                    masters.push(Master {
                        name,
                        size: MasterSize::from_subrecord(subrecord)?,
                    });
                }
                other => {
                    return Err(Error::UnknownSubrecord {
                        record: tag::TES3,
                        tag: other,
                    })
                }
            }
        }

        if pending.is_some() {
            return Err(Error::MissingField {
                record: tag::TES3,
                tag: tag::DATA,
            });
        }

        Ok(Tes3 {
            flags: record.flags,
            header: header.ok_or(Error::MissingField {
                record: tag::TES3,
                tag: tag::HEDR,
            })?,
            masters,
        })
    }

    pub fn to_record(&self) -> Result<Record> {
        let mut subrecords = vec![self.header.to_subrecord()?];
        for master in &self.masters {
            subrecords.push(master.name.to_subrecord()?);
            subrecords.push(master.size.to_subrecord()?);
        }
        Ok(Record::with_subrecords(tag::TES3, self.flags, subrecords))
    }
}
