//! Folder Layout
//!
//! Turns a desired disk-image window layout into Finder records and drives
//! the allocator and leaf index in the required order:
//!
//! 1. Build every record (alias first: `BKGD` needs its length)
//! 2. Allocate the leaf page, add records, `finish()` into the master block
//! 3. Finalize allocator metadata pointing "DSDB" at the master block
//! 4. Serialize

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::alias::build_alias;
use crate::allocator::BuddyAllocator;
use crate::btree::{sort_key, Entry, FourCC, LeafIndex};
use crate::config::Config;
use crate::error::{ForgeError, Result};
use crate::record::Record;

/// Name under which the folder's own records are stored
pub const FOLDER: &str = ".";

// =============================================================================
// Record Types
// =============================================================================

/// Background descriptor (`PctB` + alias length)
pub const BKGD: &FourCC = b"BKGD";
/// Icon view flag
pub const ICVO_FLAG: &FourCC = b"ICVO";
/// Finder window geometry
pub const FWI0: &FourCC = b"fwi0";
/// Icon view options
pub const ICVO: &FourCC = b"icvo";
/// Label text size
pub const ICVT: &FourCC = b"icvt";
/// Background picture alias
pub const PICT: &FourCC = b"pict";
/// Icon location
pub const ILOC: &FourCC = b"Iloc";

/// Icon position for one file in the folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePlacement {
    pub name: String,
    pub center_x: u32,
    pub center_y: u32,
}

impl FilePlacement {
    pub fn new(name: impl Into<String>, center_x: u32, center_y: u32) -> Self {
        Self {
            name: name.into(),
            center_x,
            center_y,
        }
    }

    /// Group a flat `name x y name x y ...` list into placements
    pub fn from_triples<S: AsRef<str>>(args: &[S]) -> Result<Vec<Self>> {
        if args.len() % 3 != 0 {
            return Err(ForgeError::Usage(format!(
                "file placements come in FILE_NAME CENTER_X CENTER_Y triples, got {} values",
                args.len()
            )));
        }

        args.chunks(3)
            .map(|triple| {
                Ok(Self::new(
                    triple[0].as_ref(),
                    parse_coordinate(triple[1].as_ref())?,
                    parse_coordinate(triple[2].as_ref())?,
                ))
            })
            .collect()
    }
}

fn parse_coordinate(value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| ForgeError::Usage(format!("Expected int: {}", value)))
}

/// Everything Finder needs to present the folder
#[derive(Debug, Clone)]
pub struct FolderLayout {
    /// Background image file name, relative to the volume root
    pub background_image: String,
    /// Window content width (matches the background image)
    pub background_width: u16,
    /// Window content height (matches the background image)
    pub background_height: u16,
    /// Volume the image lives on
    pub volume_name: String,
    pub icon_size: u16,
    pub text_size: u16,
    pub placements: Vec<FilePlacement>,
}

impl FolderLayout {
    /// All records for this layout, in leaf order
    ///
    /// Folder records keep their fixed relative order; the sort is stable.
    pub fn entries(&self, config: &Config) -> Result<Vec<Entry>> {
        let alias = build_alias(&self.volume_name, &self.background_image)?;

        let mut entries = vec![
            Entry::blob(FOLDER, *BKGD, background_blob(alias.len())?),
            Entry::boolean(FOLDER, *ICVO_FLAG, true),
            Entry::blob(FOLDER, *FWI0, self.window_blob(config)?),
            Entry::blob(FOLDER, *ICVO, self.icon_view_blob(config)?),
            Entry::short(FOLDER, *ICVT, self.text_size),
            Entry::blob(FOLDER, *PICT, alias),
        ];

        for placement in &self.placements {
            entries.push(Entry::blob(
                placement.name.clone(),
                *ILOC,
                location_blob(placement)?,
            ));
        }

        entries.sort_by_cached_key(|entry| sort_key(&entry.name));
        Ok(entries)
    }

    /// `fwi0`: top, left, bottom, right, view style, padding
    fn window_blob(&self, config: &Config) -> Result<Bytes> {
        let bottom = config
            .window_top
            .checked_add(self.background_height)
            .ok_or_else(|| {
                ForgeError::InvalidLayout(format!(
                    "window bottom overflows: top {} + height {}",
                    config.window_top, self.background_height
                ))
            })?;
        let right = config
            .window_left
            .checked_add(self.background_width)
            .ok_or_else(|| {
                ForgeError::InvalidLayout(format!(
                    "window right edge overflows: left {} + width {}",
                    config.window_left, self.background_width
                ))
            })?;

        let mut record = Record::growable();
        record.write_u16(config.window_top)?;
        record.write_u16(config.window_left)?;
        record.write_u16(bottom)?;
        record.write_u16(right)?;
        record.write_tag(&config.view_style)?;
        record.write_u32(0)?;
        Ok(record.freeze())
    }

    /// `icvo`: "icv4", icon size, arrangement, label position, padding
    fn icon_view_blob(&self, config: &Config) -> Result<Bytes> {
        let mut record = Record::growable();
        record.write_tag(b"icv4")?;
        record.write_u16(self.icon_size)?;
        record.write_tag(&config.arrange_by)?;
        record.write_tag(&config.label_position)?;
        record.write_bytes(&[0u8; 12])?;
        Ok(record.freeze())
    }
}

/// `BKGD`: "PctB", alias length, padding
fn background_blob(alias_len: usize) -> Result<Bytes> {
    let mut record = Record::growable();
    record.write_tag(b"PctB")?;
    record.write_u32(alias_len as u32)?;
    record.write_u32(0)?;
    Ok(record.freeze())
}

/// `Iloc`: center x, center y, three 0xFFFF words, padding
fn location_blob(placement: &FilePlacement) -> Result<Bytes> {
    let mut record = Record::growable();
    record.write_u32(placement.center_x)?;
    record.write_u32(placement.center_y)?;
    for _ in 0..3 {
        record.write_u16(0xFFFF)?;
    }
    record.write_u16(0)?;
    Ok(record.freeze())
}

// =============================================================================
// Forging
// =============================================================================

/// Build and finalize the container for `layout`
pub fn build(layout: &FolderLayout, config: &Config) -> Result<BuddyAllocator> {
    let entries = layout.entries(config)?;

    let mut allocator = BuddyAllocator::new();
    let master = {
        let mut index = LeafIndex::new(&mut allocator)?;
        for entry in &entries {
            index.add(entry)?;
        }
        index.finish()?
    };
    allocator.finalize_metadata(master)?;

    debug!(
        records = entries.len(),
        blocks = allocator.len(),
        "Built folder layout"
    );
    Ok(allocator)
}

/// Forge the `.DS_Store` bytes for `layout`
pub fn forge(layout: &FolderLayout, config: &Config) -> Result<Bytes> {
    build(layout, config)?.to_bytes()
}

/// Forge `layout` and write it to `path`
///
/// The container is fully built before the file is created, so an encoding
/// error never leaves a partial file behind. Returns the bytes written.
pub fn forge_to_path(layout: &FolderLayout, config: &Config, path: &Path) -> Result<u64> {
    let allocator = build(layout, config)?;

    let mut writer = BufWriter::new(File::create(path)?);
    let written = allocator.serialize(&mut writer)?;
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| ForgeError::Io(e.into_error()))?;
    file.sync_all()?;

    Ok(written)
}
