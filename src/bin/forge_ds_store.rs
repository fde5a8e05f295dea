//! forge_ds_store
//!
//! Stamps a Finder folder layout (background, window size, icon positions)
//! into a `.DS_Store` file.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use dsforge::{forge_to_path, Config, FilePlacement, FolderLayout};
use tracing_subscriber::{fmt, EnvFilter};

/// Forge a .DS_Store describing a disk image's folder view
#[derive(Parser, Debug)]
#[command(name = "forge_ds_store")]
#[command(about = "Forge a Finder .DS_Store for a disk image folder")]
#[command(version)]
struct Args {
    /// Output file
    output_file: PathBuf,

    /// Background image, relative to the volume root
    bg_image: String,

    /// Background width in pixels (window content width)
    bg_width: u16,

    /// Background height in pixels (window content height)
    bg_height: u16,

    /// Name of the volume holding the background image
    volume_name: String,

    /// Icon size in pixels
    icon_size: u16,

    /// Label text size in points
    text_size: u16,

    /// Icon placements: FILE_NAME CENTER_X CENTER_Y, repeated
    #[arg(value_name = "FILE_NAME CENTER_X CENTER_Y", allow_hyphen_values = true)]
    placements: Vec<String>,
}

fn main() {
    // Initialize tracing/logging (stderr keeps stdout free)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let placements = match FilePlacement::from_triples(&args.placements) {
        Ok(placements) => placements,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", Args::command().render_usage());
            std::process::exit(1);
        }
    };

    let layout = FolderLayout {
        background_image: args.bg_image,
        background_width: args.bg_width,
        background_height: args.bg_height,
        volume_name: args.volume_name,
        icon_size: args.icon_size,
        text_size: args.text_size,
        placements,
    };

    match forge_to_path(&layout, &Config::default(), &args.output_file) {
        Ok(bytes) => {
            tracing::info!(
                "Wrote {} bytes to {}",
                bytes,
                args.output_file.display()
            );
        }
        Err(e) => {
            tracing::error!("Failed to forge {}: {}", args.output_file.display(), e);
            std::process::exit(1);
        }
    }
}
