//! Fixed-width binary tile grids.
//!
//! A grid file is a sequence of little-endian `u16` values:
//!
//! ```text
//! [width] [height] ([tile] [special]) * width * height
//! ```
//!
//! Dune 2000's `.map` member is the only grid format in use; its limits live
//! in [`DUNE_2000`].

use tracing::debug;

use crate::binary::read_u16_le;
use crate::config::Limits;
use crate::error::{MapError, Result};

/// Shape and value ranges of a tile grid format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Smallest legal width and height.
    pub min_dimension: u16,
    /// Largest legal width and height.
    pub max_dimension: u16,
    /// Bytes before the first cell.
    pub header_size: usize,
    /// Bytes per cell.
    pub bytes_per_cell: usize,
    /// Largest tile index the tileset defines.
    pub max_tile: u16,
    /// Largest special index the special tileset defines.
    pub max_special: u16,
}

/// Dune 2000 `.map` grids.
pub const DUNE_2000: GridLayout = GridLayout {
    min_dimension: 1,
    max_dimension: 128,
    header_size: 4,
    bytes_per_cell: 4,
    max_tile: 799,
    max_special: 999,
};

/// Width and height of a grid that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    /// Cells per row.
    pub width: u16,
    /// Rows.
    pub height: u16,
}

impl GridLayout {
    /// Checks dimensions, total length and every cell of a grid file.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The whole grid file, header included
    ///
    /// # Errors
    ///
    /// - `MapError::SizeMismatch` if the buffer is shorter than the header or
    ///   its length disagrees with the dimensions
    /// - `MapError::InvalidDimension` if width or height is out of range
    /// - `MapError::InvalidTile` for the first cell with an out-of-range index
    ///
    /// # Example
    ///
    /// ```
    /// use cnc_map_core::legacy::grid::DUNE_2000;
    ///
    /// let mut grid = vec![1, 0, 1, 0];
    /// grid.extend_from_slice(&[12, 0, 0, 0]);
    /// let dims = DUNE_2000.validate(&grid).unwrap();
    /// assert_eq!((dims.width, dims.height), (1, 1));
    /// ```
    pub fn validate(&self, bytes: &[u8]) -> Result<GridDimensions> {
        if bytes.len() < self.header_size {
            return Err(MapError::SizeMismatch {
                what: "map grid header",
                expected: self.header_size,
                actual: bytes.len(),
            });
        }

        let width = read_u16_le(bytes, 0)?;
        let height = read_u16_le(bytes, 2)?;
        self.check_dimension("width", width)?;
        self.check_dimension("height", height)?;

        let cells = usize::from(width) * usize::from(height);
        let expected = self.header_size + cells * self.bytes_per_cell;
        if bytes.len() != expected {
            return Err(MapError::SizeMismatch {
                what: "map grid",
                expected,
                actual: bytes.len(),
            });
        }

        for cell in 0..cells {
            let offset = self.header_size + cell * self.bytes_per_cell;
            let tile = read_u16_le(bytes, offset)?;
            let special = read_u16_le(bytes, offset + 2)?;

            let bad = if tile > self.max_tile {
                Some(("tile", tile, self.max_tile))
            } else if special > self.max_special {
                Some(("special", special, self.max_special))
            } else {
                None
            };

            if let Some((field, value, max)) = bad {
                let w = usize::from(width);
                debug!(field, value, cell, "grid cell out of range");
                return Err(MapError::InvalidTile {
                    field,
                    value,
                    max,
                    cell,
                    x: cell % w,
                    y: cell / w,
                });
            }
        }

        Ok(GridDimensions { width, height })
    }

    fn check_dimension(&self, axis: &'static str, value: u16) -> Result<()> {
        if value < self.min_dimension || value > self.max_dimension {
            return Err(MapError::InvalidDimension {
                axis,
                value,
                min: self.min_dimension,
                max: self.max_dimension,
            });
        }
        Ok(())
    }
}

/// Archive member validator for Dune 2000 `.map` grids.
///
/// # Errors
///
/// See [`GridLayout::validate`].
pub fn validate_dune2000_grid(bytes: &[u8], _limits: &Limits) -> Result<()> {
    DUNE_2000.validate(bytes).map(|_| ())
}
