//! Integration tests for the legacy binary validators.

mod common;

use cnc_map_core::config::Limits;
use cnc_map_core::legacy::{
    validate_mission, validate_paired_ini, validate_terrain, validate_text_member, DUNE_2000,
    MISSION_SIZE,
};
use cnc_map_core::MapError;
use rstest::rstest;

use common::{d2k_grid, d2k_mission, set_grid_cell, td_terrain};

// ============================================================================
// Dune 2000 Grid
// ============================================================================

#[rstest]
#[case(1, 1)]
#[case(128, 1)]
#[case(1, 128)]
#[case(128, 128)]
#[case(64, 96)]
fn test_grid_dimensions_in_range(#[case] width: u16, #[case] height: u16) {
    let grid = d2k_grid(width, height, 799, 999);
    let dims = DUNE_2000.validate(&grid).unwrap();
    assert_eq!((dims.width, dims.height), (width, height));
}

#[rstest]
#[case(129, 10, "width")]
#[case(0, 10, "width")]
#[case(10, 129, "height")]
#[case(10, 0, "height")]
fn test_grid_dimensions_out_of_range(
    #[case] width: u16,
    #[case] height: u16,
    #[case] axis: &str,
) {
    let err = DUNE_2000
        .validate(&d2k_grid(width, height, 0, 0))
        .unwrap_err();
    match err {
        MapError::InvalidDimension {
            axis: found,
            min,
            max,
            ..
        } => {
            assert_eq!(found, axis);
            assert_eq!((min, max), (1, 128));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_largest_grid_with_one_bad_tile() {
    let mut grid = d2k_grid(128, 128, 0, 0);
    let cell = 128 * 77 + 31;
    set_grid_cell(&mut grid, cell, 800, 0);

    let err = DUNE_2000.validate(&grid).unwrap_err();
    match &err {
        MapError::InvalidTile {
            field,
            value,
            cell: found,
            x,
            y,
            ..
        } => {
            assert_eq!(*field, "tile");
            assert_eq!(*value, 800);
            assert_eq!(*found, cell);
            assert_eq!((*x, *y), (31, 77));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.report().context["y"], 77);
}

#[rstest]
#[case(799, 999, true)]
#[case(800, 0, false)]
#[case(0, 1000, false)]
#[case(u16::MAX, 0, false)]
fn test_tile_bounds(#[case] tile: u16, #[case] special: u16, #[case] ok: bool) {
    let mut grid = d2k_grid(3, 3, 0, 0);
    set_grid_cell(&mut grid, 4, tile, special);
    assert_eq!(DUNE_2000.validate(&grid).is_ok(), ok);
}

#[test]
fn test_grid_size_mismatch() {
    let mut grid = d2k_grid(10, 10, 0, 0);
    grid.pop();
    assert!(matches!(
        DUNE_2000.validate(&grid),
        Err(MapError::SizeMismatch {
            expected: 404,
            actual: 403,
            ..
        })
    ));
}

// ============================================================================
// Dune 2000 Mission
// ============================================================================

#[test]
fn test_mission_fixture_is_valid() {
    assert!(validate_mission(&d2k_mission()).is_ok());
}

#[rstest]
#[case(MISSION_SIZE - 1)]
#[case(MISSION_SIZE + 1)]
#[case(0)]
fn test_mission_size_checked_first(#[case] len: usize) {
    // Garbage everywhere: only the size check may fire.
    let bytes = vec![0xFF; len];
    assert!(matches!(
        validate_mission(&bytes),
        Err(MapError::SizeMismatch {
            what: "mission file",
            expected: 68_066,
            ..
        })
    ));
}

#[rstest]
#[case(0, 10, "tech_level", 0)]
#[case(5, 200, "tech_level", 5)]
fn test_mission_tech_levels(
    #[case] offset: usize,
    #[case] level: u8,
    #[case] field: &str,
    #[case] faction: usize,
) {
    let mut bytes = d2k_mission();
    bytes[offset] = level;
    match validate_mission(&bytes).unwrap_err() {
        MapError::ExcessiveValue {
            field: found,
            faction: house,
            ..
        } => {
            assert_eq!(found, field);
            assert_eq!(house, faction);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_mission_cash_checked_before_tech() {
    let mut bytes = d2k_mission();
    bytes[0] = 50;
    bytes[8 + 7 * 4..8 + 8 * 4].copy_from_slice(&1_000_000u32.to_le_bytes());
    assert!(matches!(
        validate_mission(&bytes),
        Err(MapError::ExcessiveValue {
            field: "starting_cash",
            faction: 7,
            ..
        })
    ));
}

#[test]
fn test_mission_tileset_padding() {
    let mut bytes = d2k_mission();
    bytes[67_167] = b'!';
    assert!(matches!(
        validate_mission(&bytes),
        Err(MapError::InvalidPadding {
            field: "tileset_name",
            offset: 67_167,
        })
    ));
}

// ============================================================================
// Paired and Text Members
// ============================================================================

#[test]
fn test_terrain_exact_size() {
    let limits = Limits::default();
    assert!(validate_terrain(&td_terrain(), &limits).is_ok());

    let mut long = td_terrain();
    long.push(0);
    assert!(matches!(
        validate_terrain(&long, &limits),
        Err(MapError::SizeMismatch { actual: 8193, .. })
    ));
}

#[test]
fn test_paired_ini_uses_paired_limit() {
    let limits = Limits {
        max_map_bytes: 10,
        max_paired_member_bytes: 20,
    };
    let text = vec![b'x'; 15];
    assert!(validate_paired_ini(&text, &limits).is_ok());
    assert!(matches!(
        validate_text_member(&text, &limits),
        Err(MapError::FileTooLarge { size: 15, max: 10 })
    ));
}
