//! Cells and the references placed in them
//!
//! A `CELL` record is a flat run of subrecords: a handful of cell level fields followed by any
//! number of moved reference (`MVRF`) and form reference (`FRMR`) groups. Groups carry no length
//! or terminator, they end at the first subrecord that cannot belong to them. References after a
//! `NAM0` count are temporary, the ones before it are persistent.
//!
//! | Tag    | Size | Contents                                         |
//! |--------|------|--------------------------------------------------|
//! | `NAME` | var  | Cell name, empty for most exteriors              |
//! | `DATA` | 12   | Flags, grid x, grid y                            |
//! | `RGNN` | var  | Region name                                      |
//! | `NAM5` | 4    | Map color                                        |
//! | `WHGT` | 4    | Water height                                     |
//! | `AMBI` | 16   | Ambient, sunlight and fog colors, fog density    |
//! | `MVRF` | 4    | Starts a [`MovedReference`]                      |
//! | `FRMR` | 4    | Starts a [`FormReference`]                       |
//! | `NAM0` | 4    | Number of temporary references that follow       |

pub mod form_reference;
pub mod moved_reference;

use binrw::{BinRead, BinWrite};
use derive_more::derive::{Deref, From};
use tracing::{debug, warn};

pub use form_reference::FormReference;
pub use moved_reference::MovedReference;

use crate::{
    error::{Error, Result},
    field::{assign, push_field, Field},
    record::Record,
    scalar_field, string_field, struct_field,
    subrecord::Subrecord,
    tag,
};

string_field!(
    /// Cell name
    CellName,
    tag::NAME
);

string_field!(
    /// Region an exterior cell belongs to
    RegionName,
    tag::RGNN
);

scalar_field!(
    /// Water level of an interior cell
    WaterHeight(f32),
    tag::WHGT
);

scalar_field!(
    /// Number of temporary references
    TemporaryCount(u32),
    tag::NAM0
);

/// Cell flags and exterior grid position
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct CellData {
    pub flags: u32,
    pub grid_x: i32,
    pub grid_y: i32,
}
struct_field!(CellData, tag::DATA, 12);

impl CellData {
    pub const INTERIOR: u32 = 0x01;
    pub const HAS_WATER: u32 = 0x02;
    pub const ILLEGAL_TO_SLEEP: u32 = 0x04;
    pub const BEHAVES_LIKE_EXTERIOR: u32 = 0x80;

    pub fn is_interior(&self) -> bool {
        self.flags & Self::INTERIOR != 0
    }
}

/// A color with an unused fourth byte
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Color of the cell on the world map
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default, Deref, From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct MapColor(pub Rgba);
struct_field!(MapColor, tag::NAM5, 4);

/// Interior lighting
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct AmbientLight {
    pub ambient: Rgba,
    pub sunlight: Rgba,
    pub fog_color: Rgba,
    pub fog_density: f32,
}
struct_field!(AmbientLight, tag::AMBI, 16);

/// A decoded `CELL` record
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    /// Record flags
    pub flags: u32,
    pub name: Option<CellName>,
    pub data: Option<CellData>,
    pub region: Option<RegionName>,
    pub map_color: Option<MapColor>,
    pub water_height: Option<WaterHeight>,
    pub ambient: Option<AmbientLight>,
    pub moved_references: Vec<MovedReference>,
    pub persistent_children: Vec<FormReference>,
    pub temporary_children: Vec<FormReference>,
}

impl Cell {
    pub fn from_record(record: &Record) -> Result<Self> {
        if record.tag != tag::CELL {
            return Err(Error::TagMismatch {
                expected: tag::CELL,
                actual: record.tag,
            });
        }
        Self::from_subrecords(record.flags, &record.subrecords)
    }

    /// Build a cell from its subrecords in file order.
    ///
    /// Cell level fields may appear in any order; a repeated one replaces the earlier value with a
    /// warning. A tag that is neither a cell field nor the start of a group is an error.
    pub fn from_subrecords(flags: u32, subrecords: &[Subrecord]) -> Result<Self> {
        let mut cell = Cell {
            flags,
            ..Default::default()
        };
        let mut count: Option<TemporaryCount> = None;

        let mut cursor = 0;
        while let Some(subrecord) = subrecords.get(cursor) {
            match subrecord.tag {
                tag::NAME => assign(&mut cell.name, subrecord, tag::CELL)?,
                tag::DATA => assign(&mut cell.data, subrecord, tag::CELL)?,
                tag::RGNN => assign(&mut cell.region, subrecord, tag::CELL)?,
                tag::NAM5 => assign(&mut cell.map_color, subrecord, tag::CELL)?,
                tag::WHGT => assign(&mut cell.water_height, subrecord, tag::CELL)?,
                tag::AMBI => assign(&mut cell.ambient, subrecord, tag::CELL)?,
                tag::NAM0 => assign(&mut count, subrecord, tag::CELL)?,
                tag::MVRF => {
                    let (moved, consumed) = MovedReference::parse(&subrecords[cursor..])?;
                    cell.moved_references.push(moved);
                    cursor += consumed;
                    continue;
                }
                tag::FRMR if cursor + 1 == subrecords.len() => {
                    let id = form_reference::ReferenceId::from_subrecord(subrecord)?;
                    warn!(
                        "dropping reference id {} at the end of cell {} without an object",
                        *id,
                        cell.display_name()
                    );
                }
                tag::FRMR => {
                    let (reference, consumed) = FormReference::parse(&subrecords[cursor..])?;
                    if count.is_some() {
                        cell.temporary_children.push(reference);
                    } else {
                        cell.persistent_children.push(reference);
                    }
                    cursor += consumed;
                    continue;
                }
                other => {
                    return Err(Error::UnknownSubrecord {
                        record: tag::CELL,
                        tag: other,
                    })
                }
            }
            cursor += 1;
        }

        if let Some(count) = count {
            if *count as usize != cell.temporary_children.len() {
                warn!(
                    "cell {} declares {} temporary references but has {}",
                    cell.display_name(),
                    *count,
                    cell.temporary_children.len()
                );
            }
        }

        debug!(
            "parsed cell {} with {} moved, {} persistent and {} temporary references",
            cell.display_name(),
            cell.moved_references.len(),
            cell.persistent_children.len(),
            cell.temporary_children.len()
        );

        Ok(cell)
    }

    /// Subrecords in canonical order, with the temporary count recomputed
    pub fn to_subrecords(&self) -> Result<Vec<Subrecord>> {
        let mut out = Vec::new();
        push_field(&mut out, &self.name)?;
        push_field(&mut out, &self.data)?;
        push_field(&mut out, &self.region)?;
        push_field(&mut out, &self.map_color)?;
        push_field(&mut out, &self.water_height)?;
        push_field(&mut out, &self.ambient)?;

        for moved in &self.moved_references {
            out.extend(moved.to_subrecords()?);
        }
        for reference in &self.persistent_children {
            out.extend(reference.to_subrecords()?);
        }

        if !self.temporary_children.is_empty() {
            let count = u32::try_from(self.temporary_children.len()).map_err(|_| {
                Error::CustomError("too many temporary references".to_owned())
            })?;
            out.push(TemporaryCount(count).to_subrecord()?);
            for reference in &self.temporary_children {
                out.extend(reference.to_subrecords()?);
            }
        }

        Ok(out)
    }

    pub fn to_record(&self) -> Result<Record> {
        Ok(Record::with_subrecords(
            tag::CELL,
            self.flags,
            self.to_subrecords()?,
        ))
    }

    /// The cell name, or its grid position for unnamed exteriors
    pub fn display_name(&self) -> String {
        match (&self.name, &self.data) {
            (Some(name), _) if !name.value.is_empty() => name.value.to_string(),
            (_, Some(data)) => format!("({}, {})", data.grid_x, data.grid_y),
            _ => String::from("<unnamed>"),
        }
    }
}
