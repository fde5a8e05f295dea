//! dump_ds_store
//!
//! Prints the allocator tables and records of a forged `.DS_Store`.

use std::path::{Path, PathBuf};

use clap::Parser;
use dsforge::{AliasRecord, RecordValue, StoreReader};
use tracing_subscriber::{fmt, EnvFilter};

/// Dump a .DS_Store file
#[derive(Parser, Debug)]
#[command(name = "dump_ds_store")]
#[command(about = "Print the blocks and records of a .DS_Store file")]
#[command(version)]
struct Args {
    /// File to inspect
    path: PathBuf,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = dump(&args.path) {
        tracing::error!("Failed to read {}: {}", args.path.display(), e);
        std::process::exit(1);
    }
}

fn dump(path: &Path) -> dsforge::Result<()> {
    let data = std::fs::read(path)?;
    let reader = StoreReader::parse(data)?;

    let metadata = reader.metadata_extent();
    println!(
        "metadata: address 0x{:x}, size {}",
        metadata.address, metadata.size
    );

    println!("blocks:");
    for (index, extent) in reader.table().iter().enumerate() {
        println!(
            "  #{:<3} address 0x{:08x} size {}",
            index, extent.address, extent.size
        );
    }

    println!("directory:");
    for (name, block) in reader.directory() {
        println!("  {} -> #{}", name, block);
    }

    println!("free list:");
    for (bucket, addresses) in reader.free_list().iter().enumerate() {
        if !addresses.is_empty() {
            println!("  2^{:<2} {:x?}", bucket, addresses);
        }
    }

    let master = reader.master()?;
    println!(
        "tree: root #{} depth {} records {} nodes {} page size {}",
        master.root, master.depth, master.record_count, master.node_count, master.page_size
    );

    for entry in reader.records()? {
        let record_type = String::from_utf8_lossy(&entry.record_type);
        match &entry.value {
            RecordValue::Blob(data) if &entry.record_type == b"pict" => {
                let alias = AliasRecord::parse(data)?;
                println!(
                    "  {:<24} {} alias {}",
                    entry.name,
                    record_type,
                    alias.absolute_path.unwrap_or(alias.file_name)
                );
            }
            RecordValue::Blob(data) => {
                println!("  {:<24} {} blob {:02x?}", entry.name, record_type, &data[..]);
            }
            RecordValue::Bool(flag) => {
                println!("  {:<24} {} bool {}", entry.name, record_type, flag);
            }
            RecordValue::Short(value) => {
                println!("  {:<24} {} shor {}", entry.name, record_type, value);
            }
        }
    }

    Ok(())
}
