//! Allocator Module
//!
//! Buddy-style block allocator backing the `Bud1` container.
//!
//! ## Responsibilities
//! - Carve the file's address space into power-of-two blocks
//! - Keep every block aligned to its own size
//! - Serialize the allocator metadata (address table, directory, free list)
//! - Emit the final byte stream in address order
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Preamble: 0x00000001 (4, not part of the address space) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Header block @0 (32)                                    │
//! │   "Bud1" | MetaAddr u32 | MetaSize u32 | MetaAddr u32   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Free gap 32..2048                                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Metadata block @2048 (2048)                             │
//! │   BlockCount u32 | 0 u32                                │
//! │   256 × (Address | log2(Size)) u32                      │
//! │   DirCount u32 | NameLen u8 | "DSDB" | BlockNum u32     │
//! │   32 buckets × [Count u32][Address u32 × Count]         │
//! ├─────────────────────────────────────────────────────────┤
//! │ User blocks (leaf page, master block, ...)              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Block numbers in the table start at the metadata block (slot 0); the
//! header block is addressed directly and never appears in the table.

mod block;
mod buddy;

pub use block::{Block, BlockId, Extent};
pub use buddy::BuddyAllocator;

// =============================================================================
// Shared Constants (used by allocator, index, reader)
// =============================================================================

/// Magic tag opening the header block
pub const MAGIC: &[u8; 4] = b"Bud1";

/// Big-endian value preceding the header block in the file
pub const PREAMBLE: u32 = 1;

/// Header block size in bytes
pub const HEADER_BLOCK_SIZE: u32 = 32;

/// Metadata block size in bytes
pub const METADATA_BLOCK_SIZE: u32 = 2048;

/// Number of slots in the address table
pub const ADDRESS_TABLE_SLOTS: usize = 256;

/// Number of free-list buckets (one per power of two)
pub const FREE_LIST_BUCKETS: usize = 32;

/// Smallest block size; `log2(size)` lives in the low 5 address bits
pub const MIN_BLOCK_SIZE: u32 = 32;

/// Mask extracting `log2(size)` from a table entry
pub const SIZE_SHIFT_MASK: u32 = 0x1f;

/// Directory key naming the Finder records tree
pub const DIRECTORY_KEY: &[u8; 4] = b"DSDB";

/// Metadata bytes taken by everything except free-list addresses:
/// count + reserved, table, directory, one count word per bucket
const METADATA_FIXED_LEN: usize = 8
    + ADDRESS_TABLE_SLOTS * 4
    + 4
    + 1
    + DIRECTORY_KEY.len()
    + 4
    + FREE_LIST_BUCKETS * 4;

/// Free-list addresses the metadata block has room for
pub const FREE_LIST_CAPACITY: usize = (METADATA_BLOCK_SIZE as usize - METADATA_FIXED_LEN) / 4;
