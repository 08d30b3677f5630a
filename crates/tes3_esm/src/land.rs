//! Landscape records and their terrain grids
//!
//! | Tag    | Size   | Contents                                                  |
//! |--------|--------|-----------------------------------------------------------|
//! | `INTV` | 8      | Grid x, grid y of the exterior cell                       |
//! | `DATA` | 4      | Which of the following grids are present                  |
//! | `VNML` | 12675  | 65x65 vertex normals, three signed bytes each             |
//! | `VHGT` | 4232   | Height offset, 65x65 signed height deltas, 3 unused bytes |
//! | `WNAM` | 81     | 9x9 world map heights                                     |
//! | `VCLR` | 12675  | 65x65 vertex colors, three bytes each                     |
//! | `VTEX` | 512    | 16x16 texture indices                                     |
//!
//! All grids are row-major with the bottom row first.

use binrw::{BinRead, BinWrite};
use tracing::debug;

use crate::{
    error::{Error, Result},
    field::{assign, push_field, require_len, Field},
    grid::{Grid, GridElement, Normal, Rgb},
    record::Record,
    scalar_field, struct_field,
    subrecord::Subrecord,
    tag::{self, Tag},
};

/// Vertices along one side of a landscape cell
pub const LAND_SIZE: usize = 65;
/// Texture cells along one side of a landscape cell
pub const LAND_TEXTURE_SIZE: usize = 16;
/// World map samples along one side of a landscape cell
pub const LAND_GLOBAL_MAP_SIZE: usize = 9;
/// World units per stored height step
pub const LAND_HEIGHT_SCALE: f32 = 8.0;

/// Exterior cell coordinates of the landscape
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct LandCoordinates {
    pub x: i32,
    pub y: i32,
}
struct_field!(LandCoordinates, tag::INTV, 8);

scalar_field!(
    /// Flags for which terrain grids are present
    LandDataTypes(u32),
    tag::DATA
);

/// Fail unless the payload holds exactly one grid of `width` x `height` elements
fn exact_grid_len<T: GridElement>(tag: Tag, data: &[u8], width: usize, height: usize) -> Result<()> {
    let expected = width * height * T::SIZE;
    require_len(tag, data, expected)?;
    if data.len() != expected {
        return Err(Error::InvalidLength {
            tag,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

macro_rules! grid_field {
    ($(#[$meta:meta])* $name:ident, $tag:expr, $elem:ty, $size:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name {
            pub grid: Grid<$elem>,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    grid: Grid::new($size, $size),
                }
            }
        }

        impl Field for $name {
            const TAG: Tag = $tag;

            fn decode(data: &[u8]) -> Result<Self> {
                exact_grid_len::<$elem>(Self::TAG, data, $size, $size)?;
                Ok(Self {
                    grid: Grid::fill($size, $size, data)?,
                })
            }

            fn encode(&self) -> Result<Vec<u8>> {
                self.grid.check_dimensions($size, $size)?;
                self.grid.flatten()
            }
        }
    };
}

grid_field!(
    /// Per vertex normals
    VertexNormals,
    tag::VNML,
    Normal,
    LAND_SIZE
);

grid_field!(
    /// Per vertex colors
    VertexColors,
    tag::VCLR,
    Rgb,
    LAND_SIZE
);

grid_field!(
    /// Land texture indices, offset by one with zero meaning the default texture
    TextureIndices,
    tag::VTEX,
    u16,
    LAND_TEXTURE_SIZE
);

grid_field!(
    /// Low resolution heights for the world map
    WorldMapHeights,
    tag::WNAM,
    u8,
    LAND_GLOBAL_MAP_SIZE
);

/// Terrain heights stored as a base offset and per vertex deltas
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeightMap {
    pub offset: f32,
    pub deltas: Grid<i8>,
    /// Unused bytes after the deltas, normally three
    pub trailer: Vec<u8>,
}

impl Default for HeightMap {
    fn default() -> Self {
        HeightMap {
            offset: 0.0,
            deltas: Grid::new(LAND_SIZE, LAND_SIZE),
            trailer: vec![0; 3],
        }
    }
}

impl HeightMap {
    /// Reconstruct absolute heights in world units.
    ///
    /// Column zero of each row is relative to column zero of the row below, the first row being
    /// relative to the offset. Every other vertex is relative to its left neighbour.
    pub fn absolute_heights(&self) -> Grid<f32> {
        let mut row_base = self.offset;
        let rows = self
            .deltas
            .rows
            .iter()
            .map(|row| {
                let mut current = 0.0;
                row.iter()
                    .enumerate()
                    .map(|(x, delta)| {
                        if x == 0 {
                            row_base += *delta as f32;
                            current = row_base;
                        } else {
                            current += *delta as f32;
                        }
                        current * LAND_HEIGHT_SCALE
                    })
                    .collect()
            })
            .collect();
        Grid::from_rows(rows)
    }
}

impl Field for HeightMap {
    const TAG: Tag = tag::VHGT;

    fn decode(data: &[u8]) -> Result<Self> {
        let grid_len = LAND_SIZE * LAND_SIZE;
        require_len(Self::TAG, data, 4 + grid_len)?;

        Ok(HeightMap {
            offset: f32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            deltas: Grid::fill(LAND_SIZE, LAND_SIZE, &data[4..4 + grid_len])?,
            trailer: data[4 + grid_len..].to_vec(),
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        self.deltas.check_dimensions(LAND_SIZE, LAND_SIZE)?;

        let mut out = Vec::with_capacity(4 + LAND_SIZE * LAND_SIZE + self.trailer.len());
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend(self.deltas.flatten()?);
        out.extend_from_slice(&self.trailer);
        Ok(out)
    }
}

/// A decoded `LAND` record
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Land {
    /// Record flags
    pub flags: u32,
    pub coordinates: Option<LandCoordinates>,
    pub data_types: Option<LandDataTypes>,
    pub normals: Option<VertexNormals>,
    pub heights: Option<HeightMap>,
    pub world_map: Option<WorldMapHeights>,
    pub colors: Option<VertexColors>,
    pub textures: Option<TextureIndices>,
}

impl Land {
    pub fn from_record(record: &Record) -> Result<Self> {
        if record.tag != tag::LAND {
            return Err(Error::TagMismatch {
                expected: tag::LAND,
                actual: record.tag,
            });
        }

        let mut land = Land {
            flags: record.flags,
            ..Default::default()
        };

        for subrecord in &record.subrecords {
            match subrecord.tag {
                tag::INTV => assign(&mut land.coordinates, subrecord, tag::LAND)?,
                tag::DATA => assign(&mut land.data_types, subrecord, tag::LAND)?,
                tag::VNML => assign(&mut land.normals, subrecord, tag::LAND)?,
                tag::VHGT => assign(&mut land.heights, subrecord, tag::LAND)?,
                tag::WNAM => assign(&mut land.world_map, subrecord, tag::LAND)?,
                tag::VCLR => assign(&mut land.colors, subrecord, tag::LAND)?,
                tag::VTEX => assign(&mut land.textures, subrecord, tag::LAND)?,
                other => {
                    return Err(Error::UnknownSubrecord {
                        record: tag::LAND,
                        tag: other,
                    })
                }
            }
        }

        debug!("parsed land at {:?}", land.coordinates);
        Ok(land)
    }

    pub fn to_subrecords(&self) -> Result<Vec<Subrecord>> {
        let mut out = Vec::new();
        push_field(&mut out, &self.coordinates)?;
        push_field(&mut out, &self.data_types)?;
        push_field(&mut out, &self.normals)?;
        push_field(&mut out, &self.heights)?;
        push_field(&mut out, &self.world_map)?;
        push_field(&mut out, &self.colors)?;
        push_field(&mut out, &self.textures)?;
        Ok(out)
    }

    pub fn to_record(&self) -> Result<Record> {
        Ok(Record::with_subrecords(
            tag::LAND,
            self.flags,
            self.to_subrecords()?,
        ))
    }
}
