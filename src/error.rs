//! Error types for map parsing, preview extraction and legacy validation.
//!
//! Every failure this crate reports is the deterministic outcome of
//! validating untrusted input, so each variant carries enough context for a
//! caller to show the end user what was wrong: the offending index, the
//! expected and actual sizes, or the sections that are missing.
//!
//! Errors expose three machine-facing views besides their `Display` text:
//! [`MapError::kind`], [`MapError::code`] and [`MapError::context`]. They are
//! combined into a serializable [`ErrorReport`] by [`MapError::report`].

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// The main error type for map parsing and validation operations.
///
/// # Example
///
/// ```
/// use cnc_map_core::error::{MapError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(MapError::SizeMismatch {
///         what: "mission file",
///         expected: 68_066,
///         actual: 68_065,
///     })
/// }
///
/// let err = example_operation().unwrap_err();
/// assert_eq!(err.kind(), "SizeMismatch");
/// assert_eq!(err.code(), "map-failed-to-parse");
/// ```
#[derive(Error, Debug)]
pub enum MapError {
    /// An I/O error occurred while reading or writing an archive.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The data ended before a fixed-width field could be read.
    #[error("Unexpected end of data: expected {expected} bytes, but only {available} available")]
    UnexpectedEof {
        /// The number of bytes that were needed.
        expected: usize,
        /// The number of bytes actually available.
        available: usize,
    },

    /// The text could not be tokenized into section/key/value triples.
    #[error("Could not parse map file: line {line}: {reason}")]
    MalformedDocument {
        /// 1-based line number of the offending line.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// One or more sections every map must carry are absent.
    #[error("Missing necessary INI sections: {}", join_names(missing))]
    MissingRequiredSection {
        /// Exactly the required sections that were not present.
        missing: BTreeSet<String>,
    },

    /// The upload does not look like plain text.
    #[error("Binary files not allowed: {reason}")]
    NotTextInput {
        /// Why the sample was rejected.
        reason: String,
        /// Offset of the first non-text byte, if there was one.
        offset: Option<usize>,
    },

    /// The embedded preview does not match its declared size or fails to decompress.
    #[error("Preview data is corrupted: {reason}")]
    CorruptPreview {
        /// What went wrong.
        reason: String,
        /// `width * height * 3` from `Preview.Size`.
        expected_bytes: usize,
        /// Read offset the failing block would have reached.
        projected_read: usize,
        /// Write offset the failing block would have reached.
        projected_write: usize,
        /// Length of the base64-decoded preview stream.
        source_len: usize,
    },

    /// A grid dimension is outside the game's bounds.
    #[error("Map {axis} is invalid: {value} (allowed {min}..={max})")]
    InvalidDimension {
        /// `"width"` or `"height"`.
        axis: &'static str,
        /// The value found in the file.
        value: u16,
        /// Smallest allowed value.
        min: u16,
        /// Largest allowed value.
        max: u16,
    },

    /// A buffer is not the size its layout requires.
    #[error("Size mismatch in {what}: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        /// The structure being checked.
        what: &'static str,
        /// Required length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// A grid cell references a tile or special index the game does not have.
    #[error("Invalid {field} index {value} at cell {cell} ({x}, {y}); maximum is {max}")]
    InvalidTile {
        /// `"tile"` or `"special"`.
        field: &'static str,
        /// The offending index.
        value: u16,
        /// Largest allowed index.
        max: u16,
        /// Row-major cell number.
        cell: usize,
        /// Cell column.
        x: usize,
        /// Cell row.
        y: usize,
    },

    /// A per-faction setting exceeds what the game allows.
    #[error("Mission file has too high a {field} for house {}: {value} > {max}", .faction + 1)]
    ExcessiveValue {
        /// The setting, e.g. `"starting_cash"`.
        field: &'static str,
        /// 0-based faction (house) index.
        faction: usize,
        /// The value found.
        value: u32,
        /// Largest allowed value.
        max: u32,
    },

    /// A reserved name region has non-zero bytes past the end of its string.
    #[error("Name field {field} has non-zero padding at byte {offset}")]
    InvalidPadding {
        /// The name region being checked.
        field: &'static str,
        /// Absolute offset of the first non-zero padding byte.
        offset: usize,
    },

    /// The bytes could not be opened as a zip archive at all.
    #[error("Your zipfile is invalid: {reason}")]
    InvalidArchive {
        /// The reader's complaint.
        reason: String,
    },

    /// The archive opened but its members are not laid out as the game expects.
    #[error("Bad archive structure: {reason}")]
    BadArchiveStructure {
        /// What was wrong.
        reason: String,
    },

    /// An archive member's extension matches no expected file.
    #[error("Unexpected file type in zip file: '{extension}'")]
    UnexpectedFileType {
        /// The member's extension, including the dot.
        extension: String,
        /// Every extension the game accepts.
        expected: Vec<String>,
    },

    /// A member or upload exceeds its size ceiling.
    #[error("File larger than expected: {size} bytes (max {max})")]
    FileTooLarge {
        /// Actual size in bytes.
        size: usize,
        /// Ceiling in bytes.
        max: usize,
    },

    /// No archive member has one of the wanted extensions.
    #[error("No file matching the expected extensions was found")]
    NoMatchingFile {
        /// The extensions that were searched for.
        expected: Vec<String>,
    },

    /// The archive name does not carry the digest of its contents.
    #[error("Map file checksum differs from Zip name, rejected")]
    ChecksumMismatch {
        /// Digest taken from the archive file name.
        declared: String,
        /// Digest of the archive contents.
        actual: String,
    },

    /// The game identifier is unknown or has no legacy support.
    #[error("Game not supported: '{slug}'")]
    UnsupportedGame {
        /// The slug that was asked for.
        slug: String,
        /// Slugs that are supported for this operation.
        supported: Vec<&'static str>,
    },
}

/// Serializable rendering of a [`MapError`], ready to hand to an end user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Variant name, e.g. `"InvalidTile"`.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Structured data about the failure.
    pub context: Value,
}

impl MapError {
    /// Creates an `UnexpectedEof` error with the given sizes.
    #[must_use]
    pub fn unexpected_eof(expected: usize, available: usize) -> Self {
        MapError::UnexpectedEof {
            expected,
            available,
        }
    }

    /// Creates a `MalformedDocument` error for the given 1-based line.
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        MapError::MalformedDocument {
            line,
            reason: reason.into(),
        }
    }

    /// Creates a `BadArchiveStructure` error.
    pub fn bad_archive(reason: impl Into<String>) -> Self {
        MapError::BadArchiveStructure {
            reason: reason.into(),
        }
    }

    /// Returns the variant name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            MapError::IoError(_) => "IoError",
            MapError::UnexpectedEof { .. } => "UnexpectedEof",
            MapError::MalformedDocument { .. } => "MalformedDocument",
            MapError::MissingRequiredSection { .. } => "MissingRequiredSection",
            MapError::NotTextInput { .. } => "NotTextInput",
            MapError::CorruptPreview { .. } => "CorruptPreview",
            MapError::InvalidDimension { .. } => "InvalidDimension",
            MapError::SizeMismatch { .. } => "SizeMismatch",
            MapError::InvalidTile { .. } => "InvalidTile",
            MapError::ExcessiveValue { .. } => "ExcessiveValue",
            MapError::InvalidPadding { .. } => "InvalidPadding",
            MapError::InvalidArchive { .. } => "InvalidArchive",
            MapError::BadArchiveStructure { .. } => "BadArchiveStructure",
            MapError::UnexpectedFileType { .. } => "UnexpectedFileType",
            MapError::FileTooLarge { .. } => "FileTooLarge",
            MapError::NoMatchingFile { .. } => "NoMatchingFile",
            MapError::ChecksumMismatch { .. } => "ChecksumMismatch",
            MapError::UnsupportedGame { .. } => "UnsupportedGame",
        }
    }

    /// Returns the stable machine-readable code surfaced to API clients.
    ///
    /// The legacy upload codes match the ones old CnCNet clients already
    /// understand; several variants share `map-failed-to-parse` for that
    /// reason.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            MapError::IoError(_) => "io-error",
            MapError::UnexpectedEof { .. } => "unexpected-eof",
            MapError::MalformedDocument { .. } => "corrupt-map",
            MapError::MissingRequiredSection { .. } => "missing-ini",
            MapError::NotTextInput { .. } => "no-binary",
            MapError::CorruptPreview { .. } => "map-preview-corrupted",
            MapError::InvalidDimension { .. }
            | MapError::SizeMismatch { .. }
            | MapError::InvalidTile { .. }
            | MapError::ExcessiveValue { .. }
            | MapError::InvalidPadding { .. } => "map-failed-to-parse",
            MapError::InvalidArchive { .. } => "not-a-valid-zip-file",
            MapError::BadArchiveStructure { .. } => "bad-zip-structure",
            MapError::UnexpectedFileType { .. } => "invalid-file-type",
            MapError::FileTooLarge { .. } => "map-too-large",
            MapError::NoMatchingFile { .. } => "no-valid-map-file",
            MapError::ChecksumMismatch { .. } => "checksum-mismatch",
            MapError::UnsupportedGame { .. } => "game-not-supported",
        }
    }

    /// Returns the structured data describing this failure as a JSON object.
    #[must_use]
    pub fn context(&self) -> Value {
        match self {
            MapError::IoError(e) => json!({ "io_kind": format!("{:?}", e.kind()) }),
            MapError::UnexpectedEof {
                expected,
                available,
            } => json!({ "expected": expected, "available": available }),
            MapError::MalformedDocument { line, reason } => {
                json!({ "line": line, "reason": reason })
            }
            MapError::MissingRequiredSection { missing } => json!({ "missing": missing }),
            MapError::NotTextInput { reason, offset } => {
                json!({ "reason": reason, "offset": offset })
            }
            MapError::CorruptPreview {
                reason,
                expected_bytes,
                projected_read,
                projected_write,
                source_len,
            } => json!({
                "reason": reason,
                "expected_bytes": expected_bytes,
                "projected_read": projected_read,
                "projected_write": projected_write,
                "source_len": source_len,
            }),
            MapError::InvalidDimension {
                axis,
                value,
                min,
                max,
            } => json!({ "axis": axis, "value": value, "min": min, "max": max }),
            MapError::SizeMismatch {
                what,
                expected,
                actual,
            } => json!({ "what": what, "expected": expected, "actual": actual }),
            MapError::InvalidTile {
                field,
                value,
                max,
                cell,
                x,
                y,
            } => json!({
                "field": field,
                "value": value,
                "max": max,
                "cell": cell,
                "x": x,
                "y": y,
            }),
            MapError::ExcessiveValue {
                field,
                faction,
                value,
                max,
            } => json!({ "field": field, "faction": faction, "value": value, "max": max }),
            MapError::InvalidPadding { field, offset } => {
                json!({ "field": field, "offset": offset })
            }
            MapError::InvalidArchive { reason } | MapError::BadArchiveStructure { reason } => {
                json!({ "reason": reason })
            }
            MapError::UnexpectedFileType {
                extension,
                expected,
            } => json!({ "extension": extension, "expected": expected }),
            MapError::FileTooLarge { size, max } => json!({ "size": size, "max": max }),
            MapError::NoMatchingFile { expected } => json!({ "expected": expected }),
            MapError::ChecksumMismatch { declared, actual } => {
                json!({ "declared": declared, "actual": actual })
            }
            MapError::UnsupportedGame { slug, supported } => {
                json!({ "slug": slug, "supported": supported })
            }
        }
    }

    /// Bundles kind, message, code and context into one serializable value.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            code: self.code(),
            context: self.context(),
        }
    }
}

impl From<zip::result::ZipError> for MapError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => MapError::IoError(e),
            other => MapError::InvalidArchive {
                reason: other.to_string(),
            },
        }
    }
}

fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// A specialized Result type for map operations.
pub type Result<T> = std::result::Result<T, MapError>;
