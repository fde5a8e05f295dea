//! Store Reader
//!
//! Decodes a forged container back into its allocator tables and records.
//! Only single-leaf trees (depth 0) are understood, matching what the
//! forging side produces.

use bytes::{Buf, Bytes};

use crate::allocator::{
    Extent, ADDRESS_TABLE_SLOTS, FREE_LIST_BUCKETS, HEADER_BLOCK_SIZE, MAGIC, PREAMBLE,
};
use crate::btree::{Entry, FourCC, RecordValue, BLOB, BOOL, SHORT};
use crate::error::{ForgeError, Result};

/// Directory key of the records tree
const RECORDS_TREE: &str = "DSDB";

/// Smallest encoded record: empty name, two tags, one-byte bool
const MIN_RECORD_LEN: usize = 4 + 4 + 4 + 1;

/// Contents of the records tree master block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterInfo {
    /// Table index of the root node
    pub root: u32,
    pub depth: u32,
    pub record_count: u32,
    pub node_count: u32,
    pub page_size: u32,
}

/// Parsed view of a container
pub struct StoreReader {
    data: Bytes,
    metadata: Extent,
    /// Address table, one extent per allocated block (slot 0 = metadata)
    table: Vec<Extent>,
    /// Directory entries: name → table index
    directory: Vec<(String, u32)>,
    /// Free-list addresses per bucket (bucket i = size 2^i)
    free_list: Vec<Vec<u32>>,
}

impl StoreReader {
    /// Parse the preamble, header and allocator metadata
    pub fn parse(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();

        let mut buf = &data[..];
        need(buf.remaining(), 4 + HEADER_BLOCK_SIZE as usize, "header")?;
        let preamble = buf.get_u32();
        if preamble != PREAMBLE {
            return Err(ForgeError::Corrupt(format!(
                "unexpected preamble 0x{:08x}",
                preamble
            )));
        }
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(ForgeError::Corrupt(format!(
                "invalid magic: expected Bud1, got {:?}",
                magic
            )));
        }
        let address = buf.get_u32();
        let size = buf.get_u32();
        let address_copy = buf.get_u32();
        if address != address_copy {
            return Err(ForgeError::Corrupt(format!(
                "metadata address mismatch: 0x{:x} vs 0x{:x}",
                address, address_copy
            )));
        }
        let metadata = Extent { address, size };

        let mut meta = slice_extent(&data, metadata)?;

        // Block count and reserved word
        need(meta.remaining(), 8, "block count")?;
        let block_count = meta.get_u32() as usize;
        meta.advance(4);
        if block_count > ADDRESS_TABLE_SLOTS {
            return Err(ForgeError::Corrupt(format!(
                "block count {} exceeds table size {}",
                block_count, ADDRESS_TABLE_SLOTS
            )));
        }

        need(meta.remaining(), ADDRESS_TABLE_SLOTS * 4, "address table")?;
        let mut table = Vec::with_capacity(block_count);
        for slot in 0..ADDRESS_TABLE_SLOTS {
            let entry = meta.get_u32();
            if slot < block_count {
                table.push(Extent::decode(entry));
            }
        }

        need(meta.remaining(), 4, "directory count")?;
        let directory_count = meta.get_u32();
        let mut directory = Vec::new();
        for _ in 0..directory_count {
            need(meta.remaining(), 1, "directory name length")?;
            let name_len = meta.get_u8() as usize;
            need(meta.remaining(), name_len + 4, "directory entry")?;
            let name = String::from_utf8_lossy(&meta[..name_len]).into_owned();
            meta.advance(name_len);
            directory.push((name, meta.get_u32()));
        }

        let mut free_list: Vec<Vec<u32>> = Vec::with_capacity(FREE_LIST_BUCKETS);
        for _ in 0..FREE_LIST_BUCKETS {
            need(meta.remaining(), 4, "free-list count")?;
            let count = meta.get_u32() as usize;
            need(meta.remaining(), count * 4, "free-list addresses")?;
            free_list.push((0..count).map(|_| meta.get_u32()).collect());
        }

        Ok(Self {
            data,
            metadata,
            table,
            directory,
            free_list,
        })
    }

    pub fn metadata_extent(&self) -> Extent {
        self.metadata
    }

    pub fn table(&self) -> &[Extent] {
        &self.table
    }

    pub fn directory(&self) -> &[(String, u32)] {
        &self.directory
    }

    pub fn free_list(&self) -> &[Vec<u32>] {
        &self.free_list
    }

    /// Contents of a block by table index
    pub fn block(&self, table_index: u32) -> Result<&[u8]> {
        let extent = self.table.get(table_index as usize).ok_or_else(|| {
            ForgeError::Corrupt(format!("block {} not in address table", table_index))
        })?;
        slice_extent(&self.data, *extent)
    }

    /// Decode the records tree master block
    pub fn master(&self) -> Result<MasterInfo> {
        let (_, block) = self
            .directory
            .iter()
            .find(|(name, _)| name == RECORDS_TREE)
            .ok_or_else(|| ForgeError::Corrupt("no DSDB directory entry".to_string()))?;

        let mut buf = self.block(*block)?;
        need(buf.remaining(), 20, "master block")?;
        Ok(MasterInfo {
            root: buf.get_u32(),
            depth: buf.get_u32(),
            record_count: buf.get_u32(),
            node_count: buf.get_u32(),
            page_size: buf.get_u32(),
        })
    }

    /// Decode every record of the (single) leaf page, in stored order
    pub fn records(&self) -> Result<Vec<Entry>> {
        let master = self.master()?;
        if master.depth != 0 {
            return Err(ForgeError::Corrupt(format!(
                "multi-level trees are not supported (depth {})",
                master.depth
            )));
        }

        let mut page = self.block(master.root)?;
        need(page.remaining(), 8, "leaf header")?;
        let child = page.get_u32();
        if child != 0 {
            return Err(ForgeError::Corrupt(format!(
                "root node is not a leaf (child pointer {})",
                child
            )));
        }
        let count = page.get_u32();
        if count as usize > page.remaining() / MIN_RECORD_LEN {
            return Err(ForgeError::Corrupt(format!(
                "leaf claims {} records but only {} bytes follow",
                count,
                page.remaining()
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(decode_entry(&mut page)?);
        }
        Ok(entries)
    }
}

fn need(remaining: usize, wanted: usize, what: &str) -> Result<()> {
    if remaining < wanted {
        return Err(ForgeError::Corrupt(format!(
            "truncated {}: need {} bytes, have {}",
            what, wanted, remaining
        )));
    }
    Ok(())
}

/// Bytes of an extent; file offsets are shifted by the preamble
fn slice_extent(data: &Bytes, extent: Extent) -> Result<&[u8]> {
    let start = extent.address as usize + 4;
    let end = start + extent.size as usize;
    if end > data.len() {
        return Err(ForgeError::Corrupt(format!(
            "block at 0x{:x} (size {}) extends past end of file ({} bytes)",
            extent.address,
            extent.size,
            data.len()
        )));
    }
    Ok(&data[start..end])
}

fn read_tag(buf: &mut &[u8]) -> FourCC {
    let mut tag = [0u8; 4];
    buf.copy_to_slice(&mut tag);
    tag
}

fn decode_entry(buf: &mut &[u8]) -> Result<Entry> {
    need(buf.remaining(), 4, "record name length")?;
    let name_len = buf.get_u32() as usize;
    need(buf.remaining(), name_len * 2 + 8, "record name")?;
    let units: Vec<u16> = (0..name_len).map(|_| buf.get_u16()).collect();
    let name = String::from_utf16(&units)
        .map_err(|e| ForgeError::Corrupt(format!("record name is not UTF-16: {}", e)))?;

    let record_type = read_tag(buf);
    let data_type = read_tag(buf);

    let value = if &data_type == BLOB {
        need(buf.remaining(), 4, "blob length")?;
        let len = buf.get_u32() as usize;
        need(buf.remaining(), len, "blob")?;
        let chunk: &[u8] = *buf;
        let data = Bytes::copy_from_slice(&chunk[..len]);
        buf.advance(len);
        RecordValue::Blob(data)
    } else if &data_type == BOOL {
        need(buf.remaining(), 1, "bool")?;
        RecordValue::Bool(buf.get_u8() != 0)
    } else if &data_type == SHORT {
        need(buf.remaining(), 4, "shor")?;
        let raw = buf.get_u32();
        let value = u16::try_from(raw).map_err(|_| {
            ForgeError::Corrupt(format!("shor value {} exceeds 16 bits", raw))
        })?;
        RecordValue::Short(value)
    } else {
        return Err(ForgeError::Corrupt(format!(
            "unsupported data type {:?} for {}",
            String::from_utf8_lossy(&data_type),
            name
        )));
    };

    Ok(Entry {
        name,
        record_type,
        value,
    })
}
