//! Dune 2000 `.mis` mission files.
//!
//! Missions are fixed-size records. Only the fields the legacy map database
//! ever checked are validated here:
//!
//! | bytes | field |
//! |-------|-------|
//! | 0..=7 | tech level per house (`u8`, max 9) |
//! | 8..=39 | starting cash per house (`u32` LE, max 70 000) |
//! | 66968..=67167 | tileset name (200 bytes reserved, 10 used) |
//! | 67168..=67175 | tile data name |

use std::ops::RangeInclusive;

use tracing::debug;

use crate::binary::{read_bytes, unpack_u32_le};
use crate::config::Limits;
use crate::error::{MapError, Result};

/// Exact size of a mission file.
pub const MISSION_SIZE: usize = 68_066;

/// Houses (factions) a mission configures.
pub const HOUSE_COUNT: usize = 8;

/// Highest tech level a house may start with.
pub const MAX_TECH_LEVEL: u8 = 9;

/// Most cash a house may start with.
pub const MAX_STARTING_CASH: u32 = 70_000;

const TECH_LEVELS: RangeInclusive<usize> = 0..=7;
const STARTING_CASH: RangeInclusive<usize> = 8..=39;

/// A reserved, NUL-padded name region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRegion {
    /// Field name reported in errors.
    pub field: &'static str,
    /// First and last byte reserved for the name.
    pub range: RangeInclusive<usize>,
    /// Longest name the game uses.
    pub max_len: usize,
}

/// Tileset name region.
pub const TILESET_NAME: NameRegion = NameRegion {
    field: "tileset_name",
    range: 66_968..=67_167,
    max_len: 10,
};

/// Tile data name region.
pub const TILE_DATA_NAME: NameRegion = NameRegion {
    field: "tile_data_name",
    range: 67_168..=67_175,
    max_len: 11,
};

impl NameRegion {
    /// Every byte after the name's NUL terminator, or after `max_len`
    /// bytes, must be zero.
    ///
    /// # Errors
    ///
    /// Returns `MapError::InvalidPadding` with the absolute offset of the
    /// first non-zero padding byte.
    pub fn check(&self, mission: &[u8]) -> Result<()> {
        let start = *self.range.start();
        let region = read_bytes(mission, start, self.range.clone().count())?;

        let name_len = region
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(region.len())
            .min(self.max_len);

        match region.iter().skip(name_len).position(|&b| b != 0) {
            Some(i) => Err(MapError::InvalidPadding {
                field: self.field,
                offset: start + name_len + i,
            }),
            None => Ok(()),
        }
    }
}

/// Validates a complete mission file.
///
/// The size is checked before any field is read. Starting cash is checked
/// for every house before any tech level.
///
/// # Arguments
///
/// * `bytes` - The whole `.mis` file
///
/// # Errors
///
/// - `MapError::SizeMismatch` unless the file is exactly [`MISSION_SIZE`] bytes
/// - `MapError::ExcessiveValue` for the first house over the cash or tech limit
/// - `MapError::InvalidPadding` for a name region with stray bytes
///
/// # Example
///
/// ```
/// use cnc_map_core::error::MapError;
/// use cnc_map_core::legacy::{validate_mission, MISSION_SIZE};
///
/// let mut mission = vec![0u8; MISSION_SIZE];
/// assert!(validate_mission(&mission).is_ok());
///
/// // House 2 starts at tech level 10
/// mission[1] = 10;
/// assert!(matches!(
///     validate_mission(&mission),
///     Err(MapError::ExcessiveValue { field: "tech_level", faction: 1, .. })
/// ));
/// ```
pub fn validate_mission(bytes: &[u8]) -> Result<()> {
    if bytes.len() != MISSION_SIZE {
        return Err(MapError::SizeMismatch {
            what: "mission file",
            expected: MISSION_SIZE,
            actual: bytes.len(),
        });
    }

    let cash = read_bytes(bytes, *STARTING_CASH.start(), STARTING_CASH.count())?;
    for (faction, value) in unpack_u32_le(cash).into_iter().enumerate() {
        if value > MAX_STARTING_CASH {
            debug!(faction, value, "starting cash over limit");
            return Err(MapError::ExcessiveValue {
                field: "starting_cash",
                faction,
                value,
                max: MAX_STARTING_CASH,
            });
        }
    }

    let tech = read_bytes(bytes, *TECH_LEVELS.start(), TECH_LEVELS.count())?;
    for (faction, &level) in tech.iter().enumerate() {
        if level > MAX_TECH_LEVEL {
            debug!(faction, level, "tech level over limit");
            return Err(MapError::ExcessiveValue {
                field: "tech_level",
                faction,
                value: u32::from(level),
                max: u32::from(MAX_TECH_LEVEL),
            });
        }
    }

    TILESET_NAME.check(bytes)?;
    TILE_DATA_NAME.check(bytes)
}

/// Archive member validator for `.mis` files.
///
/// # Errors
///
/// See [`validate_mission`].
pub fn validate_mission_member(bytes: &[u8], _limits: &Limits) -> Result<()> {
    validate_mission(bytes)
}
