//! Content hashes of uploads.
//!
//! Legacy clients identify a map by the SHA-1 of its content and expect
//! lowercase hex. SHA-512 is kept alongside it for duplicate detection.

use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha512};

/// Lowercase hex SHA-1 of `bytes`.
///
/// # Example
///
/// ```
/// use cnc_map_core::digest::sha1_hex;
///
/// assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
/// ```
#[must_use]
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Lowercase hex SHA-512 of `bytes`.
#[must_use]
pub fn sha512_hex(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}

/// Both hashes of one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapHashes {
    /// SHA-1, the legacy cross-reference hash.
    pub sha1: String,
    /// SHA-512.
    pub sha512: String,
}

impl MapHashes {
    /// Hashes `bytes` with both algorithms.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        MapHashes {
            sha1: sha1_hex(bytes),
            sha512: sha512_hex(bytes),
        }
    }
}
