//! Fixed size two dimensional arrays stored row-major, bottom row first

use crate::error::{Error, Result};

/// An element that can be stored in a [`Grid`] with a fixed byte size
pub trait GridElement: Copy + Default {
    /// Number of bytes one element occupies
    const SIZE: usize;

    /// Decode from exactly [`Self::SIZE`] bytes
    fn read(bytes: &[u8]) -> Self;

    /// Append exactly [`Self::SIZE`] bytes
    fn write(&self, out: &mut Vec<u8>);
}

impl GridElement for u8 {
    const SIZE: usize = 1;

    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl GridElement for i8 {
    const SIZE: usize = 1;

    fn read(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

impl GridElement for u16 {
    const SIZE: usize = 2;

    fn read(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// A vertex normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Normal {
    pub x: i8,
    pub y: i8,
    pub z: i8,
}

impl GridElement for Normal {
    const SIZE: usize = 3;

    fn read(bytes: &[u8]) -> Self {
        Normal {
            x: bytes[0] as i8,
            y: bytes[1] as i8,
            z: bytes[2] as i8,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.x as u8, self.y as u8, self.z as u8]);
    }
}

/// A vertex color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl GridElement for Rgb {
    const SIZE: usize = 3;

    fn read(bytes: &[u8]) -> Self {
        Rgb {
            r: bytes[0],
            g: bytes[1],
            b: bytes[2],
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.r, self.g, self.b]);
    }
}

/// A rectangular array of values indexed `[y][x]`, with row 0 at the bottom
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid<T> {
    pub rows: Vec<Vec<T>>,
}

impl<T: Copy + Default> Grid<T> {
    /// A `width` x `height` grid of default values
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            rows: vec![vec![T::default(); width]; height],
        }
    }

    /// A grid where every element is `value`
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Grid {
            rows: vec![vec![value; width]; height],
        }
    }
}

impl<T> Grid<T> {
    pub fn from_rows(rows: Vec<Vec<T>>) -> Self {
        Grid { rows }
    }

    /// Width of the first row
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.rows.get(y).and_then(|row| row.get(x))
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.rows.get_mut(y).and_then(|row| row.get_mut(x))
    }

    /// Fail unless every row is as wide as the first
    pub fn check_rows(&self) -> Result<()> {
        let expected = self.width();
        match self.rows.iter().position(|row| row.len() != expected) {
            Some(row) => Err(Error::RaggedGrid {
                row,
                width: self.rows[row].len(),
                expected,
            }),
            None => Ok(()),
        }
    }

    /// Fail unless the grid is exactly `width` x `height`
    pub fn check_dimensions(&self, width: usize, height: usize) -> Result<()> {
        self.check_rows()?;
        if self.width() != width || self.height() != height {
            return Err(Error::DimensionMismatch {
                expected_width: width,
                expected_height: height,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }
}

impl<T: GridElement> Grid<T> {
    /// Copy `width * height` elements out of the front of `data`, row by row.
    pub fn fill(width: usize, height: usize, data: &[u8]) -> Result<Self> {
        let needed = width * height * T::SIZE;
        if data.len() < needed {
            return Err(Error::Truncated {
                context: "grid",
                needed,
                available: data.len(),
            });
        }
        if needed == 0 {
            return Ok(Grid {
                rows: (0..height).map(|_| Vec::new()).collect(),
            });
        }

        let rows = data[..needed]
            .chunks_exact(width * T::SIZE)
            .map(|row| row.chunks_exact(T::SIZE).map(T::read).collect())
            .collect();
        Ok(Grid { rows })
    }

    /// Serialize the grid row by row. Ragged grids are rejected.
    pub fn flatten(&self) -> Result<Vec<u8>> {
        self.check_rows()?;
        let mut out = Vec::with_capacity(self.width() * self.height() * T::SIZE);
        for row in &self.rows {
            for element in row {
                element.write(&mut out);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fill_bottom_row_first() -> Result<()> {
        #[rustfmt::skip]
        let data = vec![
            0x01, 0x02, 0x03,
            0x04, 0x05, 0x06,
        ];

        let grid = Grid::<u8>::fill(3, 2, &data)?;
        assert_eq!(grid.rows, vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(grid.get(2, 1), Some(&6));
        assert_eq!(grid.flatten()?, data);

        Ok(())
    }

    #[test]
    fn fill_wide_elements() -> Result<()> {
        #[rustfmt::skip]
        let data = vec![
            0x01, 0x00, 0xFF, 0xFF,
            0x00, 0x01, 0x02, 0x00,
        ];

        let grid = Grid::<u16>::fill(2, 2, &data)?;
        assert_eq!(grid.rows, vec![vec![1, 0xFFFF], vec![0x100, 2]]);
        assert_eq!(grid.flatten()?, data);

        Ok(())
    }

    #[test]
    fn fill_triples() -> Result<()> {
        let data = vec![0xFF, 0x00, 0x7F, 0x01, 0x02, 0x03];

        let normals = Grid::<Normal>::fill(2, 1, &data)?;
        assert_eq!(normals.rows[0][0], Normal { x: -1, y: 0, z: 127 });

        let colors = Grid::<Rgb>::fill(1, 2, &data)?;
        assert_eq!(colors.rows[1][0], Rgb { r: 1, g: 2, b: 3 });
        assert_eq!(colors.flatten()?, data);

        Ok(())
    }

    #[test]
    fn fill_short_buffer() {
        assert!(matches!(
            Grid::<u16>::fill(2, 2, &[0; 7]),
            Err(Error::Truncated { needed: 8, available: 7, .. })
        ));
    }

    #[test]
    fn flatten_ragged() {
        let grid = Grid::from_rows(vec![vec![1u8, 2], vec![3]]);
        assert!(matches!(
            grid.flatten(),
            Err(Error::RaggedGrid { row: 1, width: 1, expected: 2 })
        ));
    }

    #[test]
    fn check_dimensions() {
        let grid = Grid::<u8>::new(9, 8);
        assert!(grid.check_dimensions(9, 8).is_ok());
        assert!(matches!(
            grid.check_dimensions(9, 9),
            Err(Error::DimensionMismatch { height: 8, .. })
        ));
    }
}
