//! Tiberian Dawn uploads: an `.ini` rules file paired with a `.bin` terrain grid.

use crate::config::Limits;
use crate::error::{MapError, Result};
use crate::legacy::text_member::validate_text;

/// Exact size of a Tiberian Dawn `.bin` terrain file (64 x 64 cells, 2 bytes each).
pub const TERRAIN_SIZE: usize = 8192;

/// Archive member validator for the `.ini` half.
///
/// # Errors
///
/// - `MapError::FileTooLarge` past [`Limits::max_paired_member_bytes`]
/// - `MapError::NotTextInput` if the member is not plain text
pub fn validate_paired_ini(bytes: &[u8], limits: &Limits) -> Result<()> {
    validate_text(bytes, limits.max_paired_member_bytes)
}

/// Archive member validator for the `.bin` half.
///
/// Only the length is checked; every byte pattern is a legal terrain grid.
///
/// # Arguments
///
/// * `bytes` - The member's decompressed content
/// * `_limits` - Unused; the size is fixed by the format
///
/// # Errors
///
/// Returns `MapError::SizeMismatch` unless the member is exactly
/// [`TERRAIN_SIZE`] bytes.
///
/// # Example
///
/// ```
/// use cnc_map_core::config::Limits;
/// use cnc_map_core::legacy::{validate_terrain, TERRAIN_SIZE};
///
/// let limits = Limits::default();
/// assert!(validate_terrain(&vec![0; TERRAIN_SIZE], &limits).is_ok());
/// assert!(validate_terrain(&vec![0; TERRAIN_SIZE - 1], &limits).is_err());
/// ```
pub fn validate_terrain(bytes: &[u8], _limits: &Limits) -> Result<()> {
    if bytes.len() != TERRAIN_SIZE {
        return Err(MapError::SizeMismatch {
            what: "terrain file",
            expected: TERRAIN_SIZE,
            actual: bytes.len(),
        });
    }
    Ok(())
}
