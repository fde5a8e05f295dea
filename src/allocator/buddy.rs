//! Buddy Allocator
//!
//! Bump-pointer allocator producing buddy-aligned, power-of-two blocks.
//!
//! Blocks are never freed or reused. Alignment padding skipped by the bump
//! pointer is split into aligned power-of-two extents and reported in the
//! free list, together with the unused tail of the 32-bit address space.
//! The free list lives in the fixed-size metadata block, so gaps past its
//! capacity are left unlisted (the bytes stay zero and unused).

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{ForgeError, Result};
use crate::record::Record;

use super::{
    Block, BlockId, Extent, ADDRESS_TABLE_SLOTS, DIRECTORY_KEY, FREE_LIST_BUCKETS,
    FREE_LIST_CAPACITY, HEADER_BLOCK_SIZE, MAGIC, METADATA_BLOCK_SIZE, MIN_BLOCK_SIZE, PREAMBLE,
    SIZE_SHIFT_MASK,
};

/// Allocator owning every block of the container
///
/// ## Lifecycle
/// 1. `new()` places the header and metadata blocks
/// 2. `allocate_block()` any number of times, writing through `get_block_mut()`
/// 3. `finalize_metadata()` exactly once
/// 4. `serialize()` / `to_bytes()`
pub struct BuddyAllocator {
    /// Container header, addressed directly (not in the table)
    header: Block,
    /// Allocator metadata, slot 0 of the address table
    metadata: Block,
    /// User blocks in allocation order (= address order)
    blocks: Vec<Block>,
    /// Alignment padding skipped by the bump pointer
    gaps: Vec<Extent>,
    /// Bump pointer: first address past the last block
    next_address: u32,
    finalized: bool,
}

impl BuddyAllocator {
    /// Create an allocator with the header and metadata blocks in place
    pub fn new() -> Self {
        let header = Block::new(0, HEADER_BLOCK_SIZE);

        let metadata_address = align_up(HEADER_BLOCK_SIZE as u64, METADATA_BLOCK_SIZE as u64);
        let mut gaps = Vec::new();
        split_gap(HEADER_BLOCK_SIZE as u64, metadata_address, &mut gaps);
        let metadata = Block::new(metadata_address as u32, METADATA_BLOCK_SIZE);

        Self {
            header,
            metadata,
            blocks: Vec::new(),
            gaps,
            next_address: metadata_address as u32 + METADATA_BLOCK_SIZE,
            finalized: false,
        }
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate a block of at least `requested` bytes
    ///
    /// The size is rounded up to a power of two (minimum 32) and the address
    /// to the next multiple of that size.
    pub fn allocate_block(&mut self, requested: u32) -> Result<BlockId> {
        if self.finalized {
            return Err(ForgeError::AllocatorFinalized);
        }

        // Metadata block + existing user blocks + this one must fit the table
        if self.blocks.len() + 2 > ADDRESS_TABLE_SLOTS {
            return Err(ForgeError::TooManyBlocks {
                limit: ADDRESS_TABLE_SLOTS,
            });
        }

        let size = requested
            .max(MIN_BLOCK_SIZE)
            .checked_next_power_of_two()
            .ok_or(ForgeError::BlockTooLarge(requested))?;

        let address = align_up(self.next_address as u64, size as u64);
        let end = address + size as u64;
        if end > u32::MAX as u64 {
            return Err(ForgeError::AddressSpaceExhausted);
        }

        split_gap(self.next_address as u64, address, &mut self.gaps);
        self.blocks.push(Block::new(address as u32, size));
        self.next_address = end as u32;

        let id = BlockId::from_index((self.blocks.len() - 1) as u32);
        debug!(
            block = id.table_index(),
            requested,
            size,
            address,
            "Allocated block"
        );
        Ok(id)
    }

    /// Look up a user block
    pub fn get_block(&self, id: BlockId) -> Result<&Block> {
        self.blocks
            .get(id.index() as usize)
            .ok_or(ForgeError::InvalidBlockId(id.index()))
    }

    /// Look up a user block for writing
    pub fn get_block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.blocks
            .get_mut(id.index() as usize)
            .ok_or(ForgeError::InvalidBlockId(id.index()))
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Write the metadata and header blocks
    ///
    /// `root` is the block the "DSDB" directory entry points at (the
    /// records tree master block). Must run after the last allocation.
    ///
    /// Both blocks are encoded into scratch records first, so an error
    /// leaves them untouched and the allocator still open.
    pub fn finalize_metadata(&mut self, root: BlockId) -> Result<()> {
        if self.finalized {
            return Err(ForgeError::AllocatorFinalized);
        }
        self.get_block(root)?;

        let table = self.table();
        if let Some(extent) = table
            .iter()
            .find(|extent| extent.address & SIZE_SHIFT_MASK != 0)
        {
            return Err(ForgeError::Misaligned {
                address: extent.address,
            });
        }
        let free = self.free_extents();
        let metadata_extent = self.metadata.extent();

        let mut metadata = Record::growable();

        // Block count covers the metadata block itself, not the header
        metadata.write_u32(table.len() as u32)?;
        metadata.write_u32(0)?;

        // Address table is always 256 slots, zero past the last block
        for slot in 0..ADDRESS_TABLE_SLOTS {
            let entry = table.get(slot).map_or(0, Extent::encode);
            metadata.write_u32(entry)?;
        }

        // Directory: a single entry naming the records tree
        metadata.write_u32(1)?;
        metadata.write_u8(DIRECTORY_KEY.len() as u8)?;
        metadata.write_tag(DIRECTORY_KEY)?;
        metadata.write_u32(root.table_index())?;

        // Free list: bucket i holds extents of size 2^i
        for bucket in 0..FREE_LIST_BUCKETS {
            let size = 1u64 << bucket;
            let addresses: Vec<u32> = free
                .iter()
                .filter(|extent| extent.size as u64 == size)
                .map(|extent| extent.address)
                .collect();

            trace!(bucket, count = addresses.len(), "Free-list bucket");
            metadata.write_u32(addresses.len() as u32)?;
            for address in addresses {
                metadata.write_u32(address)?;
            }
        }

        if metadata.len() > metadata_extent.size as usize {
            return Err(ForgeError::MetadataOverflow {
                needed: metadata.len(),
                capacity: metadata_extent.size as usize,
            });
        }

        let mut header = Record::with_capacity(HEADER_BLOCK_SIZE as usize);
        header.write_tag(MAGIC)?;
        header.write_u32(metadata_extent.address)?;
        header.write_u32(metadata_extent.size)?;
        header.write_u32(metadata_extent.address)?;

        self.metadata.record_mut().write_bytes(metadata.as_slice())?;
        self.header.record_mut().write_bytes(header.as_slice())?;
        self.finalized = true;

        debug!(
            blocks = table.len(),
            free_extents = free.len(),
            unlisted_gaps = self.unlisted_gaps().len(),
            root = root.table_index(),
            next_address = self.next_address,
            "Finalized allocator metadata"
        );
        Ok(())
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Write the preamble and every block in address order
    ///
    /// Gaps between blocks are written as zeros, so a block's file offset is
    /// its address plus the 4-byte preamble. Returns the bytes written.
    pub fn serialize<W: Write>(&self, sink: &mut W) -> Result<u64> {
        if !self.finalized {
            return Err(ForgeError::NotFinalized);
        }

        sink.write_all(&PREAMBLE.to_be_bytes())?;

        let mut cursor = 0u64;
        for block in self.all_blocks() {
            let address = block.address() as u64;
            if address > cursor {
                io::copy(&mut io::repeat(0).take(address - cursor), sink)?;
            }
            sink.write_all(block.as_slice())?;
            cursor = address + block.size() as u64;
        }

        let written = PREAMBLE.to_be_bytes().len() as u64 + cursor;
        debug!(bytes = written, "Serialized container");
        Ok(written)
    }

    /// Serialize into an in-memory buffer
    pub fn to_bytes(&self) -> Result<Bytes> {
        let capacity = self.next_address as usize + PREAMBLE.to_be_bytes().len();
        let mut writer = BytesMut::with_capacity(capacity).writer();
        self.serialize(&mut writer)?;
        Ok(writer.into_inner().freeze())
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Address table contents: the metadata block, then user blocks
    pub fn table(&self) -> Vec<Extent> {
        std::iter::once(self.metadata.extent())
            .chain(self.blocks.iter().map(Block::extent))
            .collect()
    }

    /// Unallocated extents listed in the metadata free list
    ///
    /// The tail `[next_address, 2^32)`, split by the set bits of the running
    /// address, always fits. Alignment gaps fill the remaining room in
    /// address order; any beyond `FREE_LIST_CAPACITY` stay unlisted.
    pub fn free_extents(&self) -> Vec<Extent> {
        let tail = self.tail_extents();
        let room = FREE_LIST_CAPACITY.saturating_sub(tail.len());

        let mut free: Vec<Extent> = self.gaps.iter().take(room).copied().collect();
        free.extend(tail);
        free
    }

    /// Alignment gaps left out of the free list for lack of metadata room
    pub fn unlisted_gaps(&self) -> &[Extent] {
        let room = FREE_LIST_CAPACITY.saturating_sub(self.tail_extents().len());
        &self.gaps[room.min(self.gaps.len())..]
    }

    fn tail_extents(&self) -> Vec<Extent> {
        let mut tail = Vec::new();

        let mut address = self.next_address as u64;
        for bucket in 0..FREE_LIST_BUCKETS {
            let size = 1u64 << bucket;
            if address & size != 0 {
                tail.push(Extent {
                    address: address as u32,
                    size: size as u32,
                });
                address += size;
            }
        }
        debug_assert_eq!(address, 1u64 << 32, "free list must reach the end of the address space");

        tail
    }

    /// User blocks in allocation order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Number of user blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Current bump pointer
    pub fn next_address(&self) -> u32 {
        self.next_address
    }

    /// Sum of all block sizes, reserved blocks included
    pub fn allocated_bytes(&self) -> u64 {
        self.all_blocks().map(|block| block.size() as u64).sum()
    }

    /// Alignment padding skipped so far
    pub fn gaps(&self) -> &[Extent] {
        &self.gaps
    }

    pub fn header_block(&self) -> &Block {
        &self.header
    }

    pub fn metadata_block(&self) -> &Block {
        &self.metadata
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn all_blocks(&self) -> impl Iterator<Item = &Block> {
        std::iter::once(&self.header)
            .chain(std::iter::once(&self.metadata))
            .chain(self.blocks.iter())
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Round `address` up to a multiple of `size` (a power of two)
fn align_up(address: u64, size: u64) -> u64 {
    (address + size - 1) & !(size - 1)
}

/// Split `[start, end)` into the largest aligned power-of-two extents
fn split_gap(mut start: u64, end: u64, out: &mut Vec<Extent>) {
    while start < end {
        let mut size = if start == 0 {
            1u64 << 32
        } else {
            1u64 << start.trailing_zeros()
        };
        while start + size > end {
            size >>= 1;
        }

        out.push(Extent {
            address: start as u32,
            size: size as u32,
        });
        start += size;
    }
}
