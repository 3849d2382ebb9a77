//! Single-file map documents (Tiberian Sun, Red Alert 2, Yuri's Revenge).
//!
//! These games store the whole map, preview included, in one INI file
//! saved with a game-specific extension (`.map`, `.yrm`, `.mpr`, ...).
//! [`MapDocument`] checks that the sections every playable map carries are
//! present and exposes the few facts the map database needs.
//!
//! # Example
//!
//! ```
//! use cnc_map_core::map::MapDocument;
//!
//! let text = b"[Header]\nWidth=80\nHeight=40\n[Basic]\nName=Canyon Fight\nGameMode=Standard,Teamgame\n\
//!              [Map]\n[OverlayPack]\n[OverlayDataPack]\n[SpecialFlags]\n[Digest]\n";
//! let map = MapDocument::parse(text).unwrap();
//!
//! assert_eq!(map.map_name(), "Canyon Fight");
//! assert_eq!(map.categories(), vec!["standard", "teamgame"]);
//! assert_eq!(map.width(), Some(80));
//! ```

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{MapError, Result};
use crate::ini::{classify_as_text, IniDocument};
use crate::preview::{extract_preview, PreviewImage};

/// Section names used by single-file maps.
pub mod sections {
    /// Map header: dimensions and player counts.
    pub const HEADER: &str = "Header";
    /// Name, game modes and other metadata.
    pub const BASIC: &str = "Basic";
    /// Map bounds.
    pub const MAP: &str = "Map";
    /// Packed overlay data.
    pub const OVERLAY_PACK: &str = "OverlayPack";
    /// Packed overlay frame data.
    pub const OVERLAY_DATA_PACK: &str = "OverlayDataPack";
    /// Global rule flags.
    pub const SPECIAL_FLAGS: &str = "SpecialFlags";
    /// Editor checksum.
    pub const DIGEST: &str = "Digest";
    /// Preview dimensions (`Size=0,0,width,height`).
    pub const PREVIEW: &str = "Preview";
    /// Base64 chunks of the compressed preview.
    pub const PREVIEW_PACK: &str = "PreviewPack";
    /// Identifiers injected by the map database.
    pub const CNCNET: &str = "CnCNet";
}

/// Sections a map must define to be accepted.
pub const REQUIRED_SECTIONS: [&str; 7] = [
    sections::HEADER,
    sections::BASIC,
    sections::MAP,
    sections::OVERLAY_PACK,
    sections::OVERLAY_DATA_PACK,
    sections::SPECIAL_FLAGS,
    sections::DIGEST,
];

/// Placeholder used when a map does not declare `Basic.Name`.
pub const NAME_NOT_FOUND: &str = "Map name not found in file";

/// Key under `[CnCNet]` holding the map database id.
pub const CNCNET_ID_KEY: &str = "ID";

/// Key under `[CnCNet]` holding the id of the map this one was derived from.
pub const CNCNET_PARENT_ID_KEY: &str = "Parent_ID";

/// A validated single-file map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapDocument {
    ini: IniDocument,
}

impl MapDocument {
    /// Sniffs, tokenizes and validates a map upload.
    ///
    /// # Errors
    ///
    /// - `MapError::NotTextInput` if the bytes are not plain text
    /// - `MapError::MalformedDocument` if the text is not INI
    /// - `MapError::MissingRequiredSection` if required sections are absent
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        classify_as_text(bytes)?;
        Self::from_document(IniDocument::parse(bytes)?)
    }

    /// Validates an already-tokenized document.
    ///
    /// # Errors
    ///
    /// Returns `MapError::MissingRequiredSection` listing exactly the
    /// required sections the document lacks.
    pub fn from_document(ini: IniDocument) -> Result<Self> {
        let missing: BTreeSet<String> = REQUIRED_SECTIONS
            .iter()
            .filter(|name| !ini.has_section(name))
            .map(|name| (*name).to_string())
            .collect();

        if !missing.is_empty() {
            debug!(?missing, "map rejected for missing sections");
            return Err(MapError::MissingRequiredSection { missing });
        }

        Ok(MapDocument { ini })
    }

    /// The underlying INI document.
    #[must_use]
    pub fn ini(&self) -> &IniDocument {
        &self.ini
    }

    /// The in-game map name, or [`NAME_NOT_FOUND`].
    ///
    /// This is set in the map editor and is unrelated to the file name.
    #[must_use]
    pub fn map_name(&self) -> &str {
        map_name_or(&self.ini, NAME_NOT_FOUND)
    }

    /// Lower-cased game modes from `Basic.GameMode`.
    ///
    /// These are hints from an untrusted file and are not checked against
    /// any list of known categories.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.ini
            .get(sections::BASIC, "GameMode")
            .map(|modes| {
                modes
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Map width in cells from `Header.Width`.
    #[must_use]
    pub fn width(&self) -> Option<u32> {
        self.header_dimension("Width")
    }

    /// Map height in cells from `Header.Height`.
    #[must_use]
    pub fn height(&self) -> Option<u32> {
        self.header_dimension("Height")
    }

    /// The embedded preview, if the map carries one.
    ///
    /// # Errors
    ///
    /// Returns `MapError::CorruptPreview` if the preview pack is damaged.
    pub fn preview(&self) -> Result<Option<PreviewImage>> {
        extract_preview(&self.ini)
    }

    /// The map database id stamped into the file by an earlier upload.
    #[must_use]
    pub fn cncnet_id(&self) -> Option<&str> {
        self.ini
            .get(sections::CNCNET, CNCNET_ID_KEY)
            .filter(|id| !id.is_empty())
    }

    /// Injects the map database ids and returns the re-serialized file.
    ///
    /// Nothing but the `[CnCNet]` keys changes in the output.
    pub fn stamp_identifiers(&mut self, map_id: &str, parent_id: Option<&str>) -> Vec<u8> {
        self.ini.set(sections::CNCNET, CNCNET_ID_KEY, map_id);
        if let Some(parent) = parent_id {
            self.ini.set(sections::CNCNET, CNCNET_PARENT_ID_KEY, parent);
        }
        self.ini.to_bytes()
    }

    /// Consumes the map, returning the underlying document.
    #[must_use]
    pub fn into_document(self) -> IniDocument {
        self.ini
    }

    fn header_dimension(&self, key: &str) -> Option<u32> {
        self.ini
            .get(sections::HEADER, key)
            .and_then(|v| v.parse().ok())
    }
}

/// `Basic.Name` from any INI document, or `fallback`.
#[must_use]
pub fn map_name_or<'a>(ini: &'a IniDocument, fallback: &'a str) -> &'a str {
    ini.get_or(sections::BASIC, "Name", fallback)
}
