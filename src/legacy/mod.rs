//! Validators for the members of legacy client uploads.
//!
//! Legacy clients upload a zip whose members depend on the game. Each member
//! is checked by a [`MemberValidator`] chosen by its extension:
//!
//! - [`text_member`] - Westwood single-file maps and Dune 2000 `.ini` files
//! - [`grid`] - Dune 2000 `.map` tile grids
//! - [`mission`] - Dune 2000 `.mis` mission files
//! - [`paired`] - Tiberian Dawn `.ini` + `.bin` pairs

pub mod grid;
pub mod mission;
pub mod paired;
pub mod text_member;

use crate::config::Limits;
use crate::error::Result;

pub use grid::{validate_dune2000_grid, GridDimensions, GridLayout, DUNE_2000};
pub use mission::{validate_mission, validate_mission_member, MISSION_SIZE};
pub use paired::{validate_paired_ini, validate_terrain, TERRAIN_SIZE};
pub use text_member::{validate_text, validate_text_member};

/// Checks the bytes of one archive member.
pub type MemberValidator = fn(&[u8], &Limits) -> Result<()>;
