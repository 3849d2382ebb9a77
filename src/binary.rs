//! Binary reading utilities for legacy map formats and preview streams.
//!
//! All multi-byte integers in the formats this crate reads are
//! little-endian. The strict readers perform bounds checking and return
//! [`MapError::UnexpectedEof`] for truncated data. The padded reader mirrors
//! how the game tools treat a block header cut short by the end of the
//! stream: missing bytes read as zero.
//!
//! # Example
//!
//! ```
//! use cnc_map_core::binary::{read_u16_le, read_u16_le_padded, unpack_u16_le};
//!
//! let data = [0x80, 0x00, 0x40, 0x00, 0x07];
//!
//! assert_eq!(read_u16_le(&data, 0).unwrap(), 128);
//! assert_eq!(read_u16_le_padded(&data, 4), 7);
//! assert_eq!(unpack_u16_le(&data[..4]), vec![128, 64]);
//! ```

use crate::error::{MapError, Result};

/// Reads a little-endian u16 value from the byte buffer at the given offset.
///
/// # Arguments
///
/// * `bytes` - The byte buffer to read from
/// * `offset` - The byte offset where the u16 starts
///
/// # Errors
///
/// Returns `MapError::UnexpectedEof` if the buffer doesn't contain
/// at least 2 bytes starting from the given offset.
///
/// # Example
///
/// ```
/// use cnc_map_core::binary::read_u16_le;
///
/// // Width and height of a 128x64 Dune 2000 grid
/// let header = [0x80, 0x00, 0x40, 0x00];
/// assert_eq!(read_u16_le(&header, 0).unwrap(), 128);
/// assert_eq!(read_u16_le(&header, 2).unwrap(), 64);
/// assert!(read_u16_le(&header, 3).is_err());
/// ```
pub fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16> {
    let slice = read_bytes(bytes, offset, 2)?;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

/// Reads a little-endian u32 value from the byte buffer at the given offset.
///
/// # Arguments
///
/// * `bytes` - The byte buffer to read from
/// * `offset` - The byte offset where the u32 starts
///
/// # Errors
///
/// Returns `MapError::UnexpectedEof` if the buffer doesn't contain
/// at least 4 bytes starting from the given offset.
///
/// # Example
///
/// ```
/// use cnc_map_core::binary::read_u32_le;
///
/// let cash = 70_000u32.to_le_bytes();
/// assert_eq!(read_u32_le(&cash, 0).unwrap(), 70_000);
/// ```
pub fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32> {
    let slice = read_bytes(bytes, offset, 4)?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Reads a little-endian u16, treating bytes past the end of the buffer as zero.
///
/// An offset at or beyond the end reads as `0`; a single trailing byte reads
/// as that byte's value.
///
/// # Arguments
///
/// * `bytes` - The byte buffer to read from
/// * `offset` - The byte offset where the u16 starts; may be out of range
///
/// # Example
///
/// ```
/// use cnc_map_core::binary::read_u16_le_padded;
///
/// let data = [0x10, 0x02, 0x05];
/// assert_eq!(read_u16_le_padded(&data, 0), 0x0210);
/// assert_eq!(read_u16_le_padded(&data, 2), 5);
/// assert_eq!(read_u16_le_padded(&data, 9), 0);
/// ```
#[must_use]
pub fn read_u16_le_padded(bytes: &[u8], offset: usize) -> u16 {
    let lo = bytes.get(offset).copied().unwrap_or(0);
    let hi = offset
        .checked_add(1)
        .and_then(|i| bytes.get(i))
        .copied()
        .unwrap_or(0);
    u16::from_le_bytes([lo, hi])
}

/// Reads a slice of bytes from the buffer at the given offset.
///
/// # Arguments
///
/// * `bytes` - The byte buffer to read from
/// * `offset` - The byte offset where the slice starts
/// * `len` - The number of bytes to read
///
/// # Errors
///
/// Returns `MapError::UnexpectedEof` if the buffer doesn't contain
/// at least `len` bytes starting from the given offset.
pub fn read_bytes(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| MapError::unexpected_eof(usize::MAX, bytes.len()))?;

    if end > bytes.len() {
        return Err(MapError::unexpected_eof(end, bytes.len()));
    }

    Ok(&bytes[offset..end])
}

/// Unpacks a buffer as a flat sequence of little-endian u16 values.
///
/// A trailing odd byte is ignored; callers that care about exact sizing
/// check the buffer length separately.
///
/// # Example
///
/// ```
/// use cnc_map_core::binary::unpack_u16_le;
///
/// assert_eq!(unpack_u16_le(&[0x1F, 0x03, 0xE7, 0x03, 0xFF]), vec![799, 999]);
/// ```
#[must_use]
pub fn unpack_u16_le(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Unpacks a buffer as a flat sequence of little-endian u32 values.
///
/// Trailing bytes that do not fill a whole value are ignored.
#[must_use]
pub fn unpack_u32_le(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
