//! Command & Conquer map tool
//!
//! A command-line interface for inspecting maps and checking legacy uploads.
//!
//! ## Commands
//!
//! - `info` - Display map metadata and hashes
//! - `preview` - Write the embedded preview to an image file
//! - `legacy` - Validate and repackage a legacy client upload
//! - `stamp` - Inject CnCNet identifiers into a map

use clap::{Parser, Subcommand, ValueEnum};
use cnc_map_core::{GameFormat, Limits, MapDocument, MapError, MapHashes, Registry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Command & Conquer map tool
#[derive(Parser)]
#[command(name = "cnc-maps")]
#[command(about = "Command & Conquer map parser and legacy upload validator", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON file overriding the member size limits
    #[arg(long, global = true)]
    limits: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display map information
    Info {
        /// Path to the map file
        file: PathBuf,
        /// Game slug: ts, ra2, yr
        #[arg(short, long, default_value = "yr")]
        game: GameFormat,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Extract the map preview
    Preview {
        /// Path to the map file
        file: PathBuf,
        /// Image to write; the extension picks the format (png, bmp)
        out: PathBuf,
        /// Game slug: ts, ra2, yr
        #[arg(short, long, default_value = "yr")]
        game: GameFormat,
    },
    /// Validate a legacy client upload
    Legacy {
        /// Game slug: td, d2k, yr
        game: GameFormat,
        /// Path to the uploaded zip
        archive: PathBuf,
        /// Directory to write the repackaged archive to
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
    /// Inject CnCNet identifiers into a map
    Stamp {
        /// Path to the map file
        file: PathBuf,
        /// Map database id
        #[arg(long)]
        id: String,
        /// Id of the map this one derives from
        #[arg(long)]
        parent: Option<String>,
        /// Where to write the stamped map
        out: PathBuf,
        /// Game slug: ts, ra2, yr
        #[arg(short, long, default_value = "yr")]
        game: GameFormat,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

// ============================================================================
// Serializable Output Structures
// ============================================================================

#[derive(Serialize)]
struct InfoOutput {
    file: String,
    game: &'static str,
    map_name: String,
    categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    file_size: usize,
    hashes: MapHashes,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<PreviewInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cncnet_id: Option<String>,
}

#[derive(Serialize)]
struct PreviewInfo {
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct LegacyOutput {
    game: &'static str,
    map_name: String,
    digest: String,
    members: usize,
    merged_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    repackaged: Option<String>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let limits = match &cli.limits {
        Some(path) => match Limits::from_json_file(path) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error loading limits from {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Limits::default(),
    };
    let registry = Registry::new(limits);

    match cli.command {
        Commands::Info { file, game, output } => cmd_info(&registry, &file, game, output),
        Commands::Preview { file, out, game } => cmd_preview(&registry, &file, &out, game),
        Commands::Legacy {
            game,
            archive,
            out,
            output,
        } => cmd_legacy(&registry, game, &archive, out.as_deref(), output),
        Commands::Stamp {
            file,
            id,
            parent,
            out,
            game,
        } => cmd_stamp(&registry, &file, &id, parent.as_deref(), &out, game),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============================================================================
// Shared Helpers
// ============================================================================

fn read_file(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(d) => Some(d),
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn load_map(registry: &Registry, path: &Path, game: GameFormat) -> Option<(Vec<u8>, MapDocument)> {
    let data = read_file(path)?;
    match registry.parse_map(game, &file_name(path), &data) {
        Ok(map) => Some((data, map)),
        Err(e) => {
            report_error(&e, OutputFormat::Pretty);
            None
        }
    }
}

fn report_error(err: &MapError, output: OutputFormat) {
    match output {
        OutputFormat::Json => print_json(&err.report()),
        OutputFormat::Pretty => eprintln!("Error [{}]: {err}", err.code()),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing to JSON: {e}"),
    }
}

// ============================================================================
// Info Command Implementation
// ============================================================================

fn cmd_info(registry: &Registry, file: &Path, game: GameFormat, output: OutputFormat) -> ExitCode {
    let Some(data) = read_file(file) else {
        return ExitCode::FAILURE;
    };

    let map = match registry.parse_map(game, &file_name(file), &data) {
        Ok(m) => m,
        Err(e) => {
            report_error(&e, output);
            return ExitCode::FAILURE;
        }
    };

    let preview = match map.preview() {
        Ok(p) => p.map(|p| PreviewInfo {
            width: p.width,
            height: p.height,
        }),
        Err(e) => {
            report_error(&e, output);
            return ExitCode::FAILURE;
        }
    };

    let info = InfoOutput {
        file: file_name(file),
        game: game.slug(),
        map_name: map.map_name().to_string(),
        categories: map.categories(),
        width: map.width(),
        height: map.height(),
        file_size: data.len(),
        hashes: MapHashes::of(&data),
        preview,
        cncnet_id: map.cncnet_id().map(str::to_string),
    };

    match output {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Pretty => print_info(&info),
    }

    ExitCode::SUCCESS
}

fn print_info(info: &InfoOutput) {
    println!("=== Map Information ===\n");
    println!("File: {} ({} bytes)", info.file, info.file_size);
    println!("Game: {}", info.game);
    println!("Name: {}", info.map_name);
    if !info.categories.is_empty() {
        println!("Modes: {}", info.categories.join(", "));
    }
    if let (Some(w), Some(h)) = (info.width, info.height) {
        println!("Size: {w}x{h}");
    }
    match &info.preview {
        Some(p) => println!("Preview: {}x{}", p.width, p.height),
        None => println!("Preview: none"),
    }
    if let Some(id) = &info.cncnet_id {
        println!("CnCNet ID: {id}");
    }

    println!();
    println!("Hashes:");
    println!("  SHA-1:   {}", info.hashes.sha1);
    println!("  SHA-512: {}", info.hashes.sha512);
}

// ============================================================================
// Preview Command Implementation
// ============================================================================

fn cmd_preview(registry: &Registry, file: &Path, out: &Path, game: GameFormat) -> ExitCode {
    let Some((_, map)) = load_map(registry, file, game) else {
        return ExitCode::FAILURE;
    };

    let preview = match map.preview() {
        Ok(Some(p)) => p,
        Ok(None) => {
            eprintln!("{} has no preview", file.display());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            report_error(&e, OutputFormat::Pretty);
            return ExitCode::FAILURE;
        }
    };

    let Some(image) = preview.to_rgb_image() else {
        eprintln!("{} has an empty preview", file.display());
        return ExitCode::FAILURE;
    };

    if let Err(e) = image.save(out) {
        eprintln!("Error writing {}: {e}", out.display());
        return ExitCode::FAILURE;
    }

    println!(
        "Wrote {}x{} preview to {}",
        preview.width,
        preview.height,
        out.display()
    );
    ExitCode::SUCCESS
}

// ============================================================================
// Legacy Command Implementation
// ============================================================================

fn cmd_legacy(
    registry: &Registry,
    game: GameFormat,
    archive: &Path,
    out: Option<&Path>,
    output: OutputFormat,
) -> ExitCode {
    let Some(data) = read_file(archive) else {
        return ExitCode::FAILURE;
    };

    let upload = match registry.reconcile(game, &file_name(archive), &data) {
        Ok(u) => u,
        Err(e) => {
            report_error(&e, output);
            return ExitCode::FAILURE;
        }
    };

    let repackaged = match out {
        Some(dir) => {
            let path = dir.join(format!("{}.zip", upload.digest));
            if let Err(e) = std::fs::write(&path, &upload.archive) {
                eprintln!("Error writing {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            Some(path.display().to_string())
        }
        None => None,
    };

    let result = LegacyOutput {
        game: game.slug(),
        map_name: upload.map_name,
        digest: upload.digest,
        members: upload.member_count,
        merged_size: upload.merged.len(),
        repackaged,
    };

    match output {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Pretty => {
            println!("=== Legacy Upload Accepted ===\n");
            println!("Game: {}", result.game);
            println!("Name: {}", result.map_name);
            println!("Digest: {}", result.digest);
            println!("Members: {}", result.members);
            println!("Merged Size: {} bytes", result.merged_size);
            if let Some(path) = &result.repackaged {
                println!("Repackaged: {path}");
            }
        }
    }

    ExitCode::SUCCESS
}

// ============================================================================
// Stamp Command Implementation
// ============================================================================

fn cmd_stamp(
    registry: &Registry,
    file: &Path,
    id: &str,
    parent: Option<&str>,
    out: &Path,
    game: GameFormat,
) -> ExitCode {
    let Some((_, mut map)) = load_map(registry, file, game) else {
        return ExitCode::FAILURE;
    };

    let stamped = map.stamp_identifiers(id, parent);
    if let Err(e) = std::fs::write(out, stamped) {
        eprintln!("Error writing {}: {e}", out.display());
        return ExitCode::FAILURE;
    }

    println!("Stamped {} with ID={id}", out.display());
    ExitCode::SUCCESS
}
