//! Error types for dsforge
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ForgeError
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Unified error type for dsforge operations
#[derive(Debug, Error)]
pub enum ForgeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Cursor Errors
    // -------------------------------------------------------------------------
    #[error("write of {width} bytes at offset {offset} exceeds record capacity {capacity}")]
    CapacityExceeded {
        offset: usize,
        width: usize,
        capacity: usize,
    },

    #[error("seek to offset {offset} is past record length {len}")]
    SeekOutOfBounds { offset: usize, len: usize },

    // -------------------------------------------------------------------------
    // Allocator Errors
    // -------------------------------------------------------------------------
    #[error("Invalid block id: {0}")]
    InvalidBlockId(u32),

    #[error("Block size too large: {0} bytes")]
    BlockTooLarge(u32),

    #[error("Too many blocks: the address table holds at most {limit} entries")]
    TooManyBlocks { limit: usize },

    #[error("Address space exhausted")]
    AddressSpaceExhausted,

    #[error("Block address 0x{address:08x} is not 32-byte aligned")]
    Misaligned { address: u32 },

    #[error("Allocator metadata needs {needed} bytes, block holds {capacity}")]
    MetadataOverflow { needed: usize, capacity: usize },

    #[error("Allocator metadata has already been finalized")]
    AllocatorFinalized,

    #[error("Allocator metadata has not been finalized")]
    NotFinalized,

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Entry {name:?} sorts before previous entry {previous:?}")]
    OutOfOrder { previous: String, name: String },

    #[error("Leaf page overflow: entry needs {needed} bytes, {available} available")]
    LeafOverflow { needed: usize, available: usize },

    #[error("Leaf index is already finished")]
    IndexFinished,

    // -------------------------------------------------------------------------
    // Alias Errors
    // -------------------------------------------------------------------------
    #[error("{field} is {len} bytes long (max {max})")]
    NameTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    // -------------------------------------------------------------------------
    // Layout / Usage Errors
    // -------------------------------------------------------------------------
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Usage error: {0}")]
    Usage(String),

    // -------------------------------------------------------------------------
    // Decoding Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt store: {0}")]
    Corrupt(String),
}
