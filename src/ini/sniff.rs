//! Plain-text detection for uploads.
//!
//! Map files are text; anything else is rejected before it reaches the
//! INI tokenizer. The classification follows the usual `file(1)` rules for
//! `text/plain`: the sample must be non-empty and contain no control bytes
//! other than BEL, BS, TAB, LF, VT, FF, CR and ESC. Bytes at or above 0x80
//! are accepted so UTF-8 and the legacy Windows code pages both pass.

use crate::error::{MapError, Result};

/// Fails with `MapError::NotTextInput` unless `sample` looks like plain text.
///
/// # Example
///
/// ```
/// use cnc_map_core::ini::classify_as_text;
///
/// assert!(classify_as_text(b"[Basic]\r\nName=Arena\r\n").is_ok());
/// assert!(classify_as_text(b"\x80\x00\x80\x00").is_err());
/// ```
pub fn classify_as_text(sample: &[u8]) -> Result<()> {
    if sample.is_empty() {
        return Err(MapError::NotTextInput {
            reason: "empty input".to_string(),
            offset: None,
        });
    }

    if let Some(offset) = sample.iter().position(|&b| is_binary_byte(b)) {
        return Err(MapError::NotTextInput {
            reason: format!("control byte 0x{:02X}", sample[offset]),
            offset: Some(offset),
        });
    }

    Ok(())
}

/// Returns `true` if the sample passes [`classify_as_text`].
#[must_use]
pub fn is_text(sample: &[u8]) -> bool {
    classify_as_text(sample).is_ok()
}

const fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x06 | 0x0E..=0x1A | 0x1C..=0x1F | 0x7F)
}
