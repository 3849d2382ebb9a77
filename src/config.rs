//! Size ceilings applied to members of legacy uploads.
//!
//! Defaults match what the legacy CnCNet map database enforced. Deployments
//! can override them with a JSON file:
//!
//! ```
//! use cnc_map_core::config::Limits;
//!
//! let limits: Limits = serde_json::from_str(r#"{ "max_map_bytes": 4000000 }"#).unwrap();
//! assert_eq!(limits.max_map_bytes, 4_000_000);
//! assert_eq!(limits.max_paired_member_bytes, 128_000);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};

/// Default ceiling for a text map or INI member: 2 MB.
pub const DEFAULT_MAX_MAP_BYTES: usize = 2_000_000;

/// Default ceiling for each member of a paired text + binary upload: 128 KB.
pub const DEFAULT_MAX_PAIRED_MEMBER_BYTES: usize = 128_000;

/// Size ceilings for archive members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Largest accepted single-file map or INI member, in bytes.
    pub max_map_bytes: usize,
    /// Largest accepted text member of a paired text + binary upload, in bytes.
    pub max_paired_member_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_map_bytes: DEFAULT_MAX_MAP_BYTES,
            max_paired_member_bytes: DEFAULT_MAX_PAIRED_MEMBER_BYTES,
        }
    }
}

impl Limits {
    /// Loads limits from a JSON file; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// - `MapError::IoError` if the file cannot be read
    /// - `MapError::MalformedDocument` if it is not valid JSON for `Limits`
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| MapError::malformed(e.line(), e.to_string()))
    }
}
