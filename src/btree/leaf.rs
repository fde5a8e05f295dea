//! Leaf Index
//!
//! Writes sorted entries into a single leaf page and produces the master
//! block describing the tree.

use bytes::Bytes;
use tracing::debug;

use crate::allocator::{BlockId, BuddyAllocator};
use crate::error::{ForgeError, Result};

use super::{
    sort_key, Entry, FourCC, DECLARED_PAGE_SIZE, LEAF_PAGE_SIZE, MASTER_BLOCK_SIZE,
    RECORD_COUNT_OFFSET,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexState {
    /// Accepting entries
    Open,
    /// Master block written; no further mutation
    Finished { master: BlockId },
}

/// Builder for the single-page records tree
///
/// Allocates its leaf page on creation. Call `add*()` in sorted name order,
/// then `finish()` once to patch the record count and write the master block.
pub struct LeafIndex<'a> {
    /// Allocator owning the page and master blocks
    allocator: &'a mut BuddyAllocator,
    /// Leaf page block
    page: BlockId,
    /// Records written so far
    entry_count: u32,
    /// Ordering key and name of the last record
    last: Option<(Vec<u16>, String)>,
    state: IndexState,
}

impl<'a> LeafIndex<'a> {
    /// Allocate the leaf page and write its header
    pub fn new(allocator: &'a mut BuddyAllocator) -> Result<Self> {
        let page = allocator.allocate_block(LEAF_PAGE_SIZE)?;
        let record = allocator.get_block_mut(page)?.record_mut();

        // Child pointer 0 marks a leaf
        record.write_u32(0)?;
        // Record count placeholder, patched in finish()
        record.write_u32(0)?;

        Ok(Self {
            allocator,
            page,
            entry_count: 0,
            last: None,
            state: IndexState::Open,
        })
    }

    /// Append an entry (must not sort before the previous one)
    pub fn add(&mut self, entry: &Entry) -> Result<()> {
        if !self.is_open() {
            return Err(ForgeError::IndexFinished);
        }

        let key = sort_key(&entry.name);
        if let Some((last_key, previous)) = &self.last {
            if key < *last_key {
                return Err(ForgeError::OutOfOrder {
                    previous: previous.clone(),
                    name: entry.name.clone(),
                });
            }
        }

        let record = self.allocator.get_block_mut(self.page)?.record_mut();
        let needed = entry.encoded_len();
        if needed > record.remaining() {
            return Err(ForgeError::LeafOverflow {
                needed,
                available: record.remaining(),
            });
        }
        entry.encode(record)?;

        self.entry_count += 1;
        self.last = Some((key, entry.name.clone()));

        debug!(
            name = %entry.name,
            record_type = %String::from_utf8_lossy(&entry.record_type),
            bytes = needed,
            "Added leaf entry"
        );
        Ok(())
    }

    pub fn add_blob(&mut self, name: &str, record_type: FourCC, data: &[u8]) -> Result<()> {
        self.add(&Entry::blob(name, record_type, Bytes::copy_from_slice(data)))
    }

    pub fn add_bool(&mut self, name: &str, record_type: FourCC, flag: bool) -> Result<()> {
        self.add(&Entry::boolean(name, record_type, flag))
    }

    pub fn add_short(&mut self, name: &str, record_type: FourCC, value: u16) -> Result<()> {
        self.add(&Entry::short(name, record_type, value))
    }

    /// Patch the record count and write the master block
    ///
    /// Returns the master block, which the allocator's "DSDB" directory
    /// entry must point at.
    pub fn finish(&mut self) -> Result<BlockId> {
        if !self.is_open() {
            return Err(ForgeError::IndexFinished);
        }

        let page = self.allocator.get_block_mut(self.page)?.record_mut();
        page.seek(RECORD_COUNT_OFFSET)?;
        page.write_u32(self.entry_count)?;

        let master = self.allocator.allocate_block(MASTER_BLOCK_SIZE)?;
        let record = self.allocator.get_block_mut(master)?.record_mut();
        record.write_u32(self.page.table_index())?;
        // Depth 0: the root is the only leaf
        record.write_u32(0)?;
        record.write_u32(self.entry_count)?;
        // Node count: a single leaf page
        record.write_u32(1)?;
        record.write_u32(DECLARED_PAGE_SIZE)?;

        self.state = IndexState::Finished { master };

        debug!(
            records = self.entry_count,
            root = self.page.table_index(),
            master = master.table_index(),
            "Finished leaf index"
        );
        Ok(master)
    }

    /// Leaf page block
    pub fn page(&self) -> BlockId {
        self.page
    }

    /// Records added so far
    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    pub fn is_open(&self) -> bool {
        self.state == IndexState::Open
    }

    /// Master block, once finished
    pub fn master(&self) -> Option<BlockId> {
        match self.state {
            IndexState::Open => None,
            IndexState::Finished { master } => Some(master),
        }
    }
}
