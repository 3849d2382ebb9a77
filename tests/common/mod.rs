//! Fixture builders shared by the integration tests.
//!
//! Every fixture is synthesized in code so the tests carry no binary files.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use base64::prelude::BASE64_STANDARD;
use base64::Engine as _;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Zips `members` in the given order.
pub fn zip_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip member");
        writer.write_all(data).expect("write zip member");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A single-file map with every required section and the given `[Basic]` body.
pub fn map_text(basic: &str) -> String {
    format!(
        "; written by FinalAlert 2\n\
         [Header]\nWidth=100\nHeight=60\nNumberStartingPoints=4\n\n\
         [Basic]\n{basic}\n\
         [Map]\nSize=0,0,100,60\nLocalSize=2,4,96,54\nTheater=TEMPERATE\n\n\
         [OverlayPack]\n1=BQAAIIH//w==\n\n\
         [OverlayDataPack]\n1=BQAAIIEAAA==\n\n\
         [SpecialFlags]\nDestroyableBridges=yes\nFogOfWar=no\n\n\
         [Digest]\n1=Zm9vYmFy\n"
    )
}

/// Appends `[Preview]` and `[PreviewPack]` sections to a map.
pub fn with_preview(map: &str, size: &str, stream: &[u8]) -> String {
    let encoded = BASE64_STANDARD.encode(stream);
    let mut text = format!("{map}\n[Preview]\nSize={size}\n\n[PreviewPack]\n");
    for (i, chunk) in encoded.as_bytes().chunks(70).enumerate() {
        let chunk = std::str::from_utf8(chunk).expect("base64 is ascii");
        text.push_str(&format!("{}={chunk}\n", i + 1));
    }
    text
}

/// A literal-only LZO1X block holding `data`.
pub fn lzo_literal_block(data: &[u8]) -> Vec<u8> {
    let mut block = Vec::with_capacity(data.len() + 8);
    if data.len() <= 238 {
        block.push(17 + u8::try_from(data.len()).expect("short run"));
    } else {
        block.push(0);
        let mut remaining = data.len() - 18;
        while remaining > 255 {
            block.push(0);
            remaining -= 255;
        }
        block.push(u8::try_from(remaining).expect("remainder fits"));
    }
    block.extend_from_slice(data);
    block.extend_from_slice(&[0x11, 0x00, 0x00]);
    block
}

/// Preview block stream: each chunk becomes one header + LZO block.
pub fn preview_stream(chunks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in chunks {
        let block = lzo_literal_block(chunk);
        out.extend_from_slice(&u16::try_from(block.len()).unwrap().to_le_bytes());
        out.extend_from_slice(&u16::try_from(chunk.len()).unwrap().to_le_bytes());
        out.extend_from_slice(&block);
    }
    out
}

/// A Dune 2000 grid with every cell set to `(tile, special)`.
pub fn d2k_grid(width: u16, height: u16, tile: u16, special: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    for _ in 0..usize::from(width) * usize::from(height) {
        out.extend_from_slice(&tile.to_le_bytes());
        out.extend_from_slice(&special.to_le_bytes());
    }
    out
}

/// Overwrites one grid cell.
pub fn set_grid_cell(grid: &mut [u8], cell: usize, tile: u16, special: u16) {
    let at = 4 + cell * 4;
    grid[at..at + 2].copy_from_slice(&tile.to_le_bytes());
    grid[at + 2..at + 4].copy_from_slice(&special.to_le_bytes());
}

/// A valid Dune 2000 mission file.
pub fn d2k_mission() -> Vec<u8> {
    let mut out = vec![0u8; 68_066];
    out[..8].copy_from_slice(&[5, 5, 3, 3, 1, 1, 0, 0]);
    for house in 0..8 {
        let at = 8 + house * 4;
        out[at..at + 4].copy_from_slice(&7_000u32.to_le_bytes());
    }
    out[66_968..66_968 + 8].copy_from_slice(b"BLOXXMAS");
    out[67_168..67_168 + 8].copy_from_slice(b"BLOXXMAS");
    out
}

/// A Tiberian Dawn terrain file.
pub fn td_terrain() -> Vec<u8> {
    (0..8192u32).map(|i| (i % 7) as u8).collect()
}
