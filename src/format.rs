//! Game identification and per-game routing.
//!
//! Every supported game is a [`GameFormat`] variant. Each variant maps to a
//! static [`GameSpec`] table entry describing how its uploads are handled:
//!
//! | slug | game | map parser | legacy archive members |
//! |------|------|------------|------------------------|
//! | `td` | Tiberian Dawn | - | `.ini` + `.bin` |
//! | `d2k` | Dune 2000 | - | `.map` + `.ini` (+ `.mis`) |
//! | `ts` | Tiberian Sun | single-file INI | - |
//! | `ra2` | Red Alert 2 | single-file INI | - |
//! | `yr` | Yuri's Revenge | single-file INI | `.map` / `.yro` / `.yrm` |
//!
//! Adding a game means adding a variant and a table entry. The [`Registry`]
//! combines the table with the deployment's [`Limits`]; build it once and
//! pass it by reference.
//!
//! # Example
//!
//! ```
//! use cnc_map_core::format::{GameFormat, Registry};
//!
//! let registry = Registry::default();
//! let game = registry.lookup("YR").unwrap();
//! assert_eq!(game, GameFormat::YurisRevenge);
//! assert!(registry.check_extension(game, "arena.yrm").is_ok());
//! assert!(registry.lookup("generals").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::archive::{ArchiveReconciliationService, ExpectedFile};
use crate::config::Limits;
use crate::error::{MapError, Result};
use crate::legacy::{
    validate_dune2000_grid, validate_mission_member, validate_paired_ini, validate_terrain,
    validate_text_member,
};
use crate::map::MapDocument;

/// Parses one map file of a game.
pub type MapParser = fn(&[u8]) -> Result<MapDocument>;

/// The games this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameFormat {
    /// Command & Conquer (1995).
    TiberianDawn,
    /// Dune 2000.
    Dune2000,
    /// Command & Conquer: Tiberian Sun.
    TiberianSun,
    /// Command & Conquer: Red Alert 2.
    RedAlert2,
    /// Red Alert 2: Yuri's Revenge.
    YurisRevenge,
}

/// How a game's legacy client uploads are laid out.
#[derive(Debug, Clone, Copy)]
pub struct LegacyLayout {
    /// Members in merge order.
    pub descriptors: &'static [ExpectedFile],
    /// Extensions of the member holding `Basic.Name`.
    pub ini_extensions: &'static [&'static str],
    /// Whether the archive must be named after its content digest.
    pub verify_archive_name: bool,
}

/// Static description of one game.
#[derive(Debug, Clone, Copy)]
pub struct GameSpec {
    /// Short identifier used by clients and URLs.
    pub slug: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Extensions of standalone map uploads, lower-case with the dot.
    pub map_extensions: &'static [&'static str],
    /// Parser for standalone map uploads, if the game has one.
    pub parser: Option<MapParser>,
    /// Legacy client upload layout, if the game has a legacy endpoint.
    pub legacy: Option<LegacyLayout>,
}

const WESTWOOD_MAP_EXTENSIONS: &[&str] = &[".map", ".yro", ".yrm"];

const YURIS_REVENGE_FILES: &[ExpectedFile] = &[ExpectedFile {
    extensions: WESTWOOD_MAP_EXTENSIONS,
    validator: validate_text_member,
    required: true,
}];

const DUNE_2000_FILES: &[ExpectedFile] = &[
    ExpectedFile {
        extensions: &[".map"],
        validator: validate_dune2000_grid,
        required: true,
    },
    ExpectedFile {
        extensions: &[".ini"],
        validator: validate_text_member,
        required: true,
    },
    ExpectedFile {
        extensions: &[".mis"],
        validator: validate_mission_member,
        required: false,
    },
];

const TIBERIAN_DAWN_FILES: &[ExpectedFile] = &[
    ExpectedFile {
        extensions: &[".ini"],
        validator: validate_paired_ini,
        required: true,
    },
    ExpectedFile {
        extensions: &[".bin"],
        validator: validate_terrain,
        required: true,
    },
];

static TIBERIAN_DAWN: GameSpec = GameSpec {
    slug: "td",
    name: "Command & Conquer",
    map_extensions: &[".ini"],
    parser: None,
    legacy: Some(LegacyLayout {
        descriptors: TIBERIAN_DAWN_FILES,
        ini_extensions: &[".ini"],
        verify_archive_name: false,
    }),
};

static DUNE_2000: GameSpec = GameSpec {
    slug: "d2k",
    name: "Dune 2000",
    map_extensions: &[".map"],
    parser: None,
    legacy: Some(LegacyLayout {
        descriptors: DUNE_2000_FILES,
        ini_extensions: &[".ini"],
        verify_archive_name: false,
    }),
};

static TIBERIAN_SUN: GameSpec = GameSpec {
    slug: "ts",
    name: "Tiberian Sun",
    map_extensions: &[".map", ".mpr"],
    parser: Some(MapDocument::parse),
    legacy: None,
};

static RED_ALERT_2: GameSpec = GameSpec {
    slug: "ra2",
    name: "Red Alert 2",
    map_extensions: &[".map", ".mpr", ".mmx"],
    parser: Some(MapDocument::parse),
    legacy: None,
};

static YURIS_REVENGE: GameSpec = GameSpec {
    slug: "yr",
    name: "Yuri's Revenge",
    map_extensions: &[".map", ".mpr", ".yrm", ".yro", ".mmx"],
    parser: Some(MapDocument::parse),
    legacy: Some(LegacyLayout {
        descriptors: YURIS_REVENGE_FILES,
        ini_extensions: WESTWOOD_MAP_EXTENSIONS,
        verify_archive_name: true,
    }),
};

impl GameFormat {
    /// Every game, in release order.
    pub const ALL: [GameFormat; 5] = [
        GameFormat::TiberianDawn,
        GameFormat::Dune2000,
        GameFormat::TiberianSun,
        GameFormat::RedAlert2,
        GameFormat::YurisRevenge,
    ];

    /// The game's table entry.
    #[must_use]
    pub fn spec(self) -> &'static GameSpec {
        match self {
            GameFormat::TiberianDawn => &TIBERIAN_DAWN,
            GameFormat::Dune2000 => &DUNE_2000,
            GameFormat::TiberianSun => &TIBERIAN_SUN,
            GameFormat::RedAlert2 => &RED_ALERT_2,
            GameFormat::YurisRevenge => &YURIS_REVENGE,
        }
    }

    /// Short identifier, e.g. `"yr"`.
    #[must_use]
    pub fn slug(self) -> &'static str {
        self.spec().slug
    }

    /// Display name, e.g. `"Yuri's Revenge"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    fn slugs_where(keep: impl Fn(&GameSpec) -> bool) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .map(|g| g.spec())
            .filter(|s| keep(s))
            .map(|s| s.slug)
            .collect()
    }
}

impl fmt::Display for GameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for GameFormat {
    type Err = MapError;

    fn from_str(slug: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.slug().eq_ignore_ascii_case(slug.trim()))
            .ok_or_else(|| MapError::UnsupportedGame {
                slug: slug.to_string(),
                supported: Self::slugs_where(|_| true),
            })
    }
}

/// The outcome of a successful legacy upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledUpload {
    /// The game the upload was checked against.
    pub game: GameFormat,
    /// Member contents in merge order.
    pub merged: Vec<u8>,
    /// SHA-1 hex of `merged`.
    pub digest: String,
    /// The archive with members renamed after `digest`.
    pub archive: Vec<u8>,
    /// Map name from the INI member, or the digest-based fallback.
    pub map_name: String,
    /// Number of members in the archive.
    pub member_count: usize,
}

/// Routes uploads to the parser and validators of their game.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    limits: Limits,
}

impl Registry {
    /// Builds a registry with the given member size ceilings.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Registry { limits }
    }

    /// The size ceilings in force.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Resolves a game slug, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `MapError::UnsupportedGame` for an unknown slug.
    pub fn lookup(&self, slug: &str) -> Result<GameFormat> {
        slug.parse()
    }

    /// Checks that `filename` has one of the game's map extensions.
    ///
    /// Returns the matched extension, lower-cased.
    ///
    /// # Errors
    ///
    /// Returns `MapError::UnexpectedFileType` otherwise.
    pub fn check_extension(&self, game: GameFormat, filename: &str) -> Result<String> {
        let extension = std::path::Path::new(filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let allowed = game.spec().map_extensions;
        if allowed.contains(&extension.as_str()) {
            Ok(extension)
        } else {
            Err(MapError::UnexpectedFileType {
                extension,
                expected: allowed.iter().map(|e| (*e).to_string()).collect(),
            })
        }
    }

    /// Parses a standalone map upload for `game`.
    ///
    /// # Errors
    ///
    /// - `MapError::UnsupportedGame` if the game has no map parser
    /// - `MapError::UnexpectedFileType` for a wrong extension
    /// - any error from the parser
    pub fn parse_map(&self, game: GameFormat, filename: &str, bytes: &[u8]) -> Result<MapDocument> {
        let parser = game.spec().parser.ok_or_else(|| MapError::UnsupportedGame {
            slug: game.slug().to_string(),
            supported: GameFormat::slugs_where(|s| s.parser.is_some()),
        })?;
        self.check_extension(game, filename)?;
        parser(bytes)
    }

    /// Validates and repackages a legacy client upload.
    ///
    /// `archive_name` is the upload's file name; games that name uploads
    /// after their content digest are checked against it.
    ///
    /// # Errors
    ///
    /// - `MapError::UnsupportedGame` if the game has no legacy endpoint
    /// - any error from [`ArchiveReconciliationService::validate`]
    /// - `MapError::ChecksumMismatch` if the archive name is wrong
    /// - `MapError::NoMatchingFile` if no INI member holds the map name
    pub fn reconcile(
        &self,
        game: GameFormat,
        archive_name: &str,
        bytes: &[u8],
    ) -> Result<ReconciledUpload> {
        let result = self.reconcile_inner(game, archive_name, bytes);
        match &result {
            Ok(upload) => info!(
                game = game.slug(),
                digest = %upload.digest,
                map_name = %upload.map_name,
                members = upload.member_count,
                "legacy upload accepted"
            ),
            Err(e) => warn!(
                game = game.slug(),
                archive = archive_name,
                code = e.code(),
                error = %e,
                "legacy upload rejected"
            ),
        }
        result
    }

    fn reconcile_inner(
        &self,
        game: GameFormat,
        archive_name: &str,
        bytes: &[u8],
    ) -> Result<ReconciledUpload> {
        let layout = game.spec().legacy.ok_or_else(|| MapError::UnsupportedGame {
            slug: game.slug().to_string(),
            supported: GameFormat::slugs_where(|s| s.legacy.is_some()),
        })?;

        let service = ArchiveReconciliationService::new(layout.descriptors, &self.limits);
        let validated = service.validate(bytes)?;
        if layout.verify_archive_name {
            validated.verify_declared_digest(archive_name)?;
        }

        let map_name = validated.extract_map_name(layout.ini_extensions)?;
        let archive = validated.repackage()?;

        Ok(ReconciledUpload {
            game,
            merged: validated.merged_content(),
            digest: validated.content_digest(),
            archive,
            map_name,
            member_count: validated.members().len(),
        })
    }
}
