//! Alias records
//!
//! Builds the classic Mac OS alias pointing at the background image by
//! `volume:file` path. No filesystem lookup happens: ids and dates are
//! placeholders and the parent is assumed to be the volume root.
//!
//! ## Record Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (150 bytes)                                           │
//! │   Creator u32 | RecordSize u16 | Version u16 | Kind u16      │
//! │   VolumeName Str27 (28) | VolumeDate u32 | Signature u16     │
//! │   DriveType u16 | ParentId u32 | FileName Str63 (64)         │
//! │   FileId u32 | FileDate u32 | Type u32 | Creator u32         │
//! │   FromLevel u16 | ToLevel u16 | VolumeAttrs u32 | FsId u16   │
//! │   Reserved (10)                                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Extra data                                                   │
//! │   Tag u16 = 2 | Len u16 | "volume:file" | pad to even        │
//! │   Tag u16 = 0xFFFF | Len u16 = 0                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use bytes::{Buf, Bytes};

use crate::error::{ForgeError, Result};
use crate::record::Record;

/// Fixed header size
pub const ALIAS_HEADER_SIZE: usize = 150;

/// Alias format version
pub const ALIAS_VERSION: u16 = 2;

/// Volume signature for HFS+ ("H+")
pub const HFS_PLUS_SIGNATURE: u16 = 0x482B;

/// Longest volume name the 28-byte Pascal field holds
pub const MAX_VOLUME_NAME_LEN: usize = 27;

/// Longest file name the 64-byte Pascal field holds
pub const MAX_FILE_NAME_LEN: usize = 63;

const VOLUME_NAME_FIELD: usize = MAX_VOLUME_NAME_LEN + 1;
const FILE_NAME_FIELD: usize = MAX_FILE_NAME_LEN + 1;

const ALIAS_KIND_FILE: u16 = 0;
const ROOT_DIRECTORY_ID: u32 = 2;
const NO_LEVEL: u16 = 0xFFFF;

/// Extra-data tags
const EXTRA_ABSOLUTE_PATH: u16 = 2;
const EXTRA_END: u16 = 0xFFFF;

// =============================================================================
// Encoding
// =============================================================================

/// Build an alias record for `volume_name:file_name`
pub fn build_alias(volume_name: &str, file_name: &str) -> Result<Bytes> {
    check_len("volume name", volume_name, MAX_VOLUME_NAME_LEN)?;
    check_len("file name", file_name, MAX_FILE_NAME_LEN)?;

    let path = format!("{volume_name}:{file_name}");
    let padded_len = path.len() + (path.len() & 1);
    let record_size = ALIAS_HEADER_SIZE + 4 + padded_len + 4;

    let mut record = Record::with_capacity(record_size);

    record.write_u32(0)?; // creator code
    record.write_u16(record_size as u16)?;
    record.write_u16(ALIAS_VERSION)?;
    record.write_u16(ALIAS_KIND_FILE)?;
    write_pascal(&mut record, volume_name, VOLUME_NAME_FIELD)?;
    record.write_u32(0)?; // volume creation date
    record.write_u16(HFS_PLUS_SIGNATURE)?;
    record.write_u16(0)?; // drive type: fixed disk
    record.write_u32(ROOT_DIRECTORY_ID)?;
    write_pascal(&mut record, file_name, FILE_NAME_FIELD)?;
    record.write_u32(0)?; // file id
    record.write_u32(0)?; // file creation date
    record.write_u32(0)?; // file type
    record.write_u32(0)?; // file creator
    record.write_u16(NO_LEVEL)?;
    record.write_u16(NO_LEVEL)?;
    record.write_u32(0)?; // volume attributes
    record.write_u16(0)?; // volume filesystem id
    record.write_bytes(&[0u8; 10])?;
    debug_assert_eq!(record.position(), ALIAS_HEADER_SIZE);

    record.write_u16(EXTRA_ABSOLUTE_PATH)?;
    record.write_u16(path.len() as u16)?;
    record.write_bytes(path.as_bytes())?;
    if path.len() & 1 == 1 {
        record.write_u8(0)?;
    }
    record.write_u16(EXTRA_END)?;
    record.write_u16(0)?;

    Ok(record.freeze())
}

fn check_len(field: &'static str, name: &str, max: usize) -> Result<()> {
    if name.len() > max {
        return Err(ForgeError::NameTooLong {
            field,
            len: name.len(),
            max,
        });
    }
    Ok(())
}

/// Length-prefixed name in a fixed-width field
fn write_pascal(record: &mut Record, name: &str, field: usize) -> Result<()> {
    let start = record.position();
    record.write_u8(name.len() as u8)?;
    record.write_bytes(name.as_bytes())?;
    record.seek(start + field)
}

// =============================================================================
// Decoding
// =============================================================================

/// Fields of an alias record relevant to a forged background reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRecord {
    pub record_size: u16,
    pub version: u16,
    pub volume_name: String,
    pub volume_signature: u16,
    pub parent_id: u32,
    pub file_name: String,
    /// `volume:file` from the absolute-path extra, if present
    pub absolute_path: Option<String>,
}

impl AliasRecord {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < ALIAS_HEADER_SIZE {
            return Err(ForgeError::Corrupt(format!(
                "alias record too short: {} bytes",
                data.len()
            )));
        }

        let mut buf = data;
        buf.advance(4); // creator code
        let record_size = buf.get_u16();
        if (record_size as usize) < ALIAS_HEADER_SIZE || record_size as usize > data.len() {
            return Err(ForgeError::Corrupt(format!(
                "alias record size {} out of range (have {} bytes)",
                record_size,
                data.len()
            )));
        }
        let version = buf.get_u16();
        buf.advance(2); // kind
        let volume_name = read_pascal(&mut buf, VOLUME_NAME_FIELD)?;
        buf.advance(4); // volume creation date
        let volume_signature = buf.get_u16();
        buf.advance(2); // drive type
        let parent_id = buf.get_u32();
        let file_name = read_pascal(&mut buf, FILE_NAME_FIELD)?;

        let absolute_path = read_absolute_path(&data[ALIAS_HEADER_SIZE..record_size as usize])?;

        Ok(Self {
            record_size,
            version,
            volume_name,
            volume_signature,
            parent_id,
            file_name,
            absolute_path,
        })
    }
}

fn read_pascal(buf: &mut &[u8], field: usize) -> Result<String> {
    let chunk: &[u8] = *buf;
    let len = chunk[0] as usize;
    if len + 1 > field {
        return Err(ForgeError::Corrupt(format!(
            "name length {} exceeds {}-byte field",
            len, field
        )));
    }
    let name = String::from_utf8_lossy(&chunk[1..1 + len]).into_owned();
    buf.advance(field);
    Ok(name)
}

fn read_absolute_path(mut extra: &[u8]) -> Result<Option<String>> {
    let mut path = None;
    loop {
        if extra.remaining() < 4 {
            return Err(ForgeError::Corrupt(
                "alias extra data missing end marker".to_string(),
            ));
        }
        let tag = extra.get_u16();
        let len = extra.get_u16() as usize;
        if tag == EXTRA_END {
            return Ok(path);
        }

        let padded_len = len + (len & 1);
        if extra.remaining() < padded_len {
            return Err(ForgeError::Corrupt(format!(
                "alias extra tag {} truncated: need {} bytes, have {}",
                tag,
                padded_len,
                extra.remaining()
            )));
        }
        if tag == EXTRA_ABSOLUTE_PATH {
            path = Some(String::from_utf8_lossy(&extra[..len]).into_owned());
        }
        extra.advance(padded_len);
    }
}
