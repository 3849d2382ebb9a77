//! Embedded map preview extraction.
//!
//! Tiberian Sun and Red Alert 2 maps carry a small bitmap of the map in two
//! sections:
//!
//! ```text
//! [Preview]
//! Size=0,0,<width>,<height>
//!
//! [PreviewPack]
//! 1=<base64>
//! 2=<base64>
//! ...
//! ```
//!
//! Joining the `PreviewPack` values and base64-decoding them gives a sequence
//! of blocks, each a 4-byte header followed by an LZO1X payload:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0 | 2 | compressed size (LE) |
//! | 2 | 2 | uncompressed size (LE) |
//! | 4 | n | LZO1X block |
//!
//! The decompressed stream is `width * height` pixels stored as BGR.

pub mod lzo;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use image::RgbImage;
use tracing::debug;

use crate::binary::read_u16_le_padded;
use crate::error::{MapError, Result};
use crate::ini::IniDocument;
use crate::map::sections;

/// Size of a preview block header.
pub const BLOCK_HEADER_SIZE: usize = 4;

/// Standard alphabet, padding optional, trailing bits tolerated.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// A decoded preview bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGB pixels, `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

impl PreviewImage {
    /// `true` if the preview has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// RGB triple at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * 3;
        let rgb = self.pixels.get(index..index + 3)?;
        Some([rgb[0], rgb[1], rgb[2]])
    }

    /// Converts to an [`image::RgbImage`] for encoding.
    ///
    /// Returns `None` only for an empty preview.
    #[must_use]
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.is_empty() {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }
}

/// Extracts the preview from a map's `Preview` and `PreviewPack` sections.
///
/// Returns `Ok(None)` when the map has no preview pack or no usable
/// `Preview.Size`.
///
/// # Errors
///
/// Returns `MapError::CorruptPreview` when the pack cannot be decoded, a
/// block header points past the data or past the image, a block fails to
/// decompress, or the blocks produce fewer bytes than the image needs.
pub fn extract_preview(ini: &IniDocument) -> Result<Option<PreviewImage>> {
    let Some(pack) = ini.section(sections::PREVIEW_PACK) else {
        debug!("no preview pack");
        return Ok(None);
    };

    let Some((width, height)) = ini
        .get(sections::PREVIEW, "Size")
        .and_then(parse_preview_size)
    else {
        debug!("no usable preview size");
        return Ok(None);
    };

    let expected_bytes = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| corrupt("preview size overflows", 0, 0, 0, 0))?;

    let joined: String = pack.values().collect();
    let compressed = decode_base64(&joined)
        .map_err(|e| corrupt(format!("invalid base64: {e}"), expected_bytes, 0, 0, 0))?;

    let bgr = decompress_blocks(&compressed, expected_bytes)?;
    debug!(width, height, blocks_len = compressed.len(), "preview extracted");

    Ok(Some(PreviewImage {
        width,
        height,
        pixels: bgr_to_rgb(bgr),
    }))
}

/// Parses `0,0,width,height`; any other shape yields `None`.
fn parse_preview_size(value: &str) -> Option<(u32, u32)> {
    let parts: Vec<u32> = value
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [_, _, width, height] => Some((*width, *height)),
        _ => None,
    }
}

fn decode_base64(text: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let filtered: Vec<u8> = text
        .bytes()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .collect();
    LENIENT_BASE64.decode(filtered)
}

/// Runs the block loop over the base64-decoded pack.
fn decompress_blocks(compressed: &[u8], expected_bytes: usize) -> Result<Vec<u8>> {
    // Grows with the blocks actually decoded; the declared size is untrusted.
    let mut output = Vec::new();
    let mut read_offset = 0usize;

    // The loop bound compares the read position with the image size, the
    // way the game's own reader does.
    while read_offset < expected_bytes {
        let compressed_size = usize::from(read_u16_le_padded(compressed, read_offset));
        let uncompressed_size = usize::from(read_u16_le_padded(compressed, read_offset + 2));
        read_offset += BLOCK_HEADER_SIZE;

        if compressed_size == 0 || uncompressed_size == 0 {
            break;
        }

        let projected_read = read_offset + compressed_size;
        let projected_write = output.len() + uncompressed_size;
        if projected_read > compressed.len() || projected_write > expected_bytes {
            return Err(corrupt(
                "preview data does not match preview size",
                expected_bytes,
                projected_read,
                projected_write,
                compressed.len(),
            ));
        }

        let block = lzo::decompress_block(&compressed[read_offset..projected_read], uncompressed_size)
            .map_err(|e| {
                corrupt(
                    format!("block at offset {read_offset} failed to decompress: {e}"),
                    expected_bytes,
                    projected_read,
                    projected_write,
                    compressed.len(),
                )
            })?;

        output.extend_from_slice(&block);
        read_offset = projected_read;
    }

    if output.len() < expected_bytes {
        return Err(corrupt(
            "preview data ended before the image was complete",
            expected_bytes,
            read_offset,
            output.len(),
            compressed.len(),
        ));
    }

    Ok(output)
}

fn bgr_to_rgb(mut pixels: Vec<u8>) -> Vec<u8> {
    for px in pixels.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    pixels
}

fn corrupt(
    reason: impl Into<String>,
    expected_bytes: usize,
    projected_read: usize,
    projected_write: usize,
    source_len: usize,
) -> MapError {
    MapError::CorruptPreview {
        reason: reason.into(),
        expected_bytes,
        projected_read,
        projected_write,
        source_len,
    }
}
