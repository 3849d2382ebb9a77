//! Text members of legacy uploads.
//!
//! Westwood single-file maps and the Dune 2000 `.ini` companion are only
//! checked for size and for being plain text; their content is not parsed
//! until the map name is needed.

use crate::config::Limits;
use crate::error::{MapError, Result};
use crate::ini::classify_as_text;

/// Fails unless `bytes` is plain text of at most `max` bytes.
///
/// The size is checked first, so an oversized binary reports `FileTooLarge`.
///
/// # Arguments
///
/// * `bytes` - The member's decompressed content
/// * `max` - The ceiling in bytes, inclusive
///
/// # Errors
///
/// - `MapError::FileTooLarge` if `bytes` is longer than `max`
/// - `MapError::NotTextInput` if it is not plain text
///
/// # Example
///
/// ```
/// use cnc_map_core::error::MapError;
/// use cnc_map_core::legacy::validate_text;
///
/// assert!(validate_text(b"[Basic]\nName=Arena\n", 64).is_ok());
/// assert!(matches!(
///     validate_text(b"[Basic]\nName=Arena\n", 8),
///     Err(MapError::FileTooLarge { size: 19, max: 8 })
/// ));
/// assert!(matches!(
///     validate_text(&[0x00, 0x01, 0x02], 64),
///     Err(MapError::NotTextInput { .. })
/// ));
/// ```
pub fn validate_text(bytes: &[u8], max: usize) -> Result<()> {
    if bytes.len() > max {
        return Err(MapError::FileTooLarge {
            size: bytes.len(),
            max,
        });
    }
    classify_as_text(bytes)
}

/// Archive member validator for single-file maps and Dune 2000 INI files.
///
/// # Errors
///
/// See [`validate_text`]; the ceiling is [`Limits::max_map_bytes`].
pub fn validate_text_member(bytes: &[u8], limits: &Limits) -> Result<()> {
    validate_text(bytes, limits.max_map_bytes)
}
