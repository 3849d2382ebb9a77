//! Integration tests for legacy upload reconciliation through the registry.

mod common;

use std::io::{Cursor, Read};

use cnc_map_core::digest::sha1_hex;
use cnc_map_core::format::{GameFormat, Registry};
use cnc_map_core::MapError;
use zip::ZipArchive;

use common::{d2k_grid, d2k_mission, map_text, td_terrain, zip_archive};

fn member_names(archive: &[u8]) -> Vec<String> {
    let zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn member_bytes(archive: &[u8], name: &str) -> Vec<u8> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut file = zip.by_name(name).unwrap();
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    out
}

// ============================================================================
// Yuri's Revenge
// ============================================================================

#[test]
fn test_yr_upload_named_after_its_digest() {
    let map = map_text("Name=Snow Valley\n");
    let digest = sha1_hex(map.as_bytes());
    let upload = zip_archive(&[("snow valley.yrm", map.as_bytes())]);

    let registry = Registry::default();
    let result = registry
        .reconcile(GameFormat::YurisRevenge, &format!("{digest}.zip"), &upload)
        .unwrap();

    assert_eq!(result.digest, digest);
    assert_eq!(result.map_name, "Snow Valley");
    assert_eq!(result.member_count, 1);
    assert_eq!(result.merged, map.as_bytes());
    assert_eq!(member_names(&result.archive), vec![format!("{digest}.yrm")]);
    assert_eq!(member_bytes(&result.archive, &format!("{digest}.yrm")), map.as_bytes());
}

#[test]
fn test_yr_upload_with_wrong_name() {
    let upload = zip_archive(&[("x.map", map_text("Name=x\n").as_bytes())]);
    let err = Registry::default()
        .reconcile(GameFormat::YurisRevenge, "0000000000000000000000000000000000000000.zip", &upload)
        .unwrap_err();
    assert_eq!(err.code(), "checksum-mismatch");
}

#[test]
fn test_yr_unnamed_map_gets_fallback_name() {
    let map = b"[Basic]\nPlayer=Americans\n";
    let digest = sha1_hex(map);
    let upload = zip_archive(&[("a.map", map)]);
    let result = Registry::default()
        .reconcile(GameFormat::YurisRevenge, &format!("{digest}.zip"), &upload)
        .unwrap();
    assert_eq!(result.map_name, format!("legacy_client_upload_{digest}"));
}

#[test]
fn test_yr_binary_member_rejected() {
    let upload = zip_archive(&[("a.map", &[0x00, 0x01, 0x02, 0x03])]);
    let err = Registry::default()
        .reconcile(GameFormat::YurisRevenge, "a.zip", &upload)
        .unwrap_err();
    assert!(matches!(err, MapError::NotTextInput { .. }));
}

#[test]
fn test_yr_extra_members_are_not_repackaged() {
    let map = map_text("Name=First\n");
    let digest = sha1_hex(map.as_bytes());
    let upload = zip_archive(&[
        ("a.map", map.as_bytes()),
        ("b.map", map_text("Name=Second\n").as_bytes()),
    ]);

    let result = Registry::default()
        .reconcile(GameFormat::YurisRevenge, &format!("{digest}.zip"), &upload)
        .unwrap();
    assert_eq!(result.member_count, 1);
    assert_eq!(result.map_name, "First");
    assert_eq!(member_names(&result.archive), vec![format!("{digest}.map")]);
}

// ============================================================================
// Dune 2000
// ============================================================================

#[test]
fn test_d2k_merge_order_ignores_member_order() {
    let grid = d2k_grid(32, 32, 12, 0);
    let ini = b"[Basic]\nName=Arrakis Dunes\n".to_vec();
    let mission = d2k_mission();

    let forward = zip_archive(&[
        ("dunes.map", &grid),
        ("dunes.ini", &ini),
        ("dunes.mis", &mission),
    ]);
    let reversed = zip_archive(&[
        ("dunes.mis", &mission),
        ("dunes.ini", &ini),
        ("dunes.map", &grid),
    ]);

    let registry = Registry::default();
    let a = registry
        .reconcile(GameFormat::Dune2000, "dunes.zip", &forward)
        .unwrap();
    let b = registry
        .reconcile(GameFormat::Dune2000, "dunes.zip", &reversed)
        .unwrap();

    assert_eq!(a.digest, b.digest);
    assert_eq!(a.merged, b.merged);

    let mut expected = grid.clone();
    expected.extend_from_slice(&ini);
    expected.extend_from_slice(&mission);
    assert_eq!(a.merged, expected);
    assert_eq!(a.digest, sha1_hex(&expected));
    assert_eq!(a.map_name, "Arrakis Dunes");
}

#[test]
fn test_d2k_mission_is_optional() {
    let grid = d2k_grid(16, 16, 0, 0);
    let upload = zip_archive(&[("m.ini", b"[Basic]\nName=Small\n"), ("m.map", &grid)]);
    let result = Registry::default()
        .reconcile(GameFormat::Dune2000, "m.zip", &upload)
        .unwrap();

    assert_eq!(result.member_count, 2);
    let names = member_names(&result.archive);
    assert_eq!(
        names,
        vec![
            format!("{}.ini", result.digest),
            format!("{}.map", result.digest)
        ]
    );
}

#[test]
fn test_d2k_bad_grid_rejected() {
    let mut grid = d2k_grid(16, 16, 0, 0);
    grid[0] = 200;
    let upload = zip_archive(&[("m.map", &grid), ("m.ini", b"[Basic]\n")]);
    let err = Registry::default()
        .reconcile(GameFormat::Dune2000, "m.zip", &upload)
        .unwrap_err();
    assert!(matches!(err, MapError::InvalidDimension { value: 200, .. }));
    assert_eq!(err.code(), "map-failed-to-parse");
}

#[test]
fn test_d2k_stray_member_rejected() {
    let grid = d2k_grid(16, 16, 0, 0);
    let upload = zip_archive(&[
        ("m.map", &grid),
        ("m.ini", b"[Basic]\n"),
        ("readme.txt", b"have fun"),
    ]);
    let err = Registry::default()
        .reconcile(GameFormat::Dune2000, "m.zip", &upload)
        .unwrap_err();
    assert_eq!(err.code(), "invalid-file-type");
}

#[test]
fn test_d2k_too_many_members() {
    let grid = d2k_grid(16, 16, 0, 0);
    let upload = zip_archive(&[
        ("m.map", &grid),
        ("m.ini", b"[Basic]\n"),
        ("m.mis", &d2k_mission()),
        ("n.map", &grid),
    ]);
    let err = Registry::default()
        .reconcile(GameFormat::Dune2000, "m.zip", &upload)
        .unwrap_err();
    assert_eq!(err.code(), "bad-zip-structure");
}

#[test]
fn test_d2k_two_ini_members_rejected() {
    let grid = d2k_grid(16, 16, 0, 0);
    let upload = zip_archive(&[
        ("m.map", &grid),
        ("a.ini", b"[Basic]\nName=A\n"),
        ("b.ini", b"[Basic]\nName=B\n"),
    ]);
    let err = Registry::default()
        .reconcile(GameFormat::Dune2000, "m.zip", &upload)
        .unwrap_err();
    assert!(matches!(err, MapError::BadArchiveStructure { .. }));
    assert_eq!(err.code(), "bad-zip-structure");
}

// ============================================================================
// Tiberian Dawn
// ============================================================================

#[test]
fn test_td_pair_reconciled() {
    let terrain = td_terrain();
    let ini = b"[Basic]\nName=Green Acres\n[MAP]\nTheater=TEMPERATE\n";
    let upload = zip_archive(&[("SCM01EA.BIN", &terrain), ("SCM01EA.INI", ini)]);

    let result = Registry::default()
        .reconcile(GameFormat::TiberianDawn, "scm01ea.zip", &upload)
        .unwrap();

    let mut expected = ini.to_vec();
    expected.extend_from_slice(&terrain);
    assert_eq!(result.merged, expected);
    assert_eq!(result.map_name, "Green Acres");
    assert_eq!(
        member_names(&result.archive),
        vec![
            format!("{}.BIN", result.digest),
            format!("{}.INI", result.digest)
        ]
    );
}

#[test]
fn test_td_missing_terrain() {
    let upload = zip_archive(&[("a.ini", b"[Basic]\n")]);
    let err = Registry::default()
        .reconcile(GameFormat::TiberianDawn, "a.zip", &upload)
        .unwrap_err();
    assert!(matches!(err, MapError::BadArchiveStructure { .. }));
}

#[test]
fn test_failure_report_is_serializable() {
    let err = Registry::default()
        .reconcile(GameFormat::TiberianDawn, "a.zip", b"PK\x03\x04 truncated")
        .unwrap_err();
    let report = serde_json::to_value(err.report()).unwrap();
    assert_eq!(report["code"], "not-a-valid-zip-file");
    assert_eq!(report["kind"], "InvalidArchive");
}
