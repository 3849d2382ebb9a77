//! # CnC Map Core
//!
//! Parsing and validation of community-made Command & Conquer maps.
//!
//! This library handles the map files of the Westwood-era games:
//! - **Single-file maps** (Tiberian Sun, Red Alert 2, Yuri's Revenge): INI
//!   text with an embedded LZO-compressed preview image
//! - **Legacy client uploads**: zip archives whose members are checked
//!   against per-game binary layouts and rehashed the way old clients expect
//!
//! ## Quick Start
//!
//! ```no_run
//! use cnc_map_core::error::Result;
//! use cnc_map_core::format::{GameFormat, Registry};
//!
//! fn inspect(filename: &str, data: &[u8]) -> Result<()> {
//!     let registry = Registry::default();
//!     let map = registry.parse_map(GameFormat::YurisRevenge, filename, data)?;
//!
//!     println!("Name: {}", map.map_name());
//!     println!("Modes: {:?}", map.categories());
//!
//!     if let Some(preview) = map.preview()? {
//!         println!("Preview: {}x{}", preview.width, preview.height);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types, machine-readable codes and the result alias
//! - [`binary`] - Little-endian reading utilities
//! - [`ini`] - Order-preserving INI documents and text sniffing
//! - [`map`] - Single-file map documents
//! - [`preview`] - Preview extraction and the LZO1X block decoder
//! - [`legacy`] - Validators for the members of legacy uploads
//! - [`archive`] - Legacy upload reconciliation and repackaging
//! - [`format`] - Game table and the upload [`Registry`]
//! - [`digest`] - SHA-1 / SHA-512 content hashes
//! - [`config`] - Size ceilings
//!
//! ## Compatibility
//!
//! Legacy clients look maps up by the SHA-1 of the archive members
//! concatenated in a fixed per-game order. [`archive::ValidatedArchive`]
//! reproduces that order exactly; the preview decoder likewise keeps the
//! game's little-endian block headers and BGR pixel order.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod binary;
pub mod config;
pub mod digest;
pub mod error;
pub mod format;
pub mod ini;
pub mod legacy;
pub mod map;
pub mod preview;

// Re-export commonly used types at the crate root
pub use archive::{ArchiveReconciliationService, ExpectedFile, ValidatedArchive};
pub use config::Limits;
pub use digest::MapHashes;
pub use error::{ErrorReport, MapError, Result};
pub use format::{GameFormat, ReconciledUpload, Registry};
pub use ini::{classify_as_text, IniDocument};
pub use map::MapDocument;
pub use preview::{extract_preview, PreviewImage};
