//! B-tree Module
//!
//! Single-page B-tree holding the Finder records ("DSDB" tree).
//!
//! ## Leaf Page Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Child pointer: u32 = 0 (leaf) | Record count: u32        │
//! ├──────────────────────────────────────────────────────────┤
//! │ Record                                                   │
//! │   NameLen u32 | Name UTF-16BE | RecordType (4)           │
//! │   DataType (4) | Payload                                 │
//! │ ... repeated, sorted by filename ...                     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Payload by Data Type
//! - `blob`: length u32 + raw bytes
//! - `bool`: 1 byte
//! - `shor`: u32 holding the 16-bit value
//!
//! ## Master Block Format
//! ```text
//! ┌────────────┬───────────┬─────────────┬────────────┬──────────────┐
//! │ Root (4)   │ Depth (4) │ Records (4) │ Nodes (4)  │ PageSize (4) │
//! └────────────┴───────────┴─────────────┴────────────┴──────────────┘
//! ```

mod entry;
mod leaf;

pub use entry::{sort_key, Entry, RecordValue};
pub use leaf::LeafIndex;

/// Four-character code (record types, data types, view tags)
pub type FourCC = [u8; 4];

// =============================================================================
// Shared Constants (used by index and reader)
// =============================================================================

/// Bytes reserved for the leaf page
pub const LEAF_PAGE_SIZE: u32 = 2048;

/// Leaf page header: child pointer (4) + record count (4)
pub const LEAF_HEADER_SIZE: usize = 8;

/// Offset of the record count inside the leaf page
pub(crate) const RECORD_COUNT_OFFSET: usize = 4;

/// Bytes requested for the master block
pub const MASTER_BLOCK_SIZE: u32 = 20;

/// Page size declared in the master block
pub const DECLARED_PAGE_SIZE: u32 = 4096;

/// Data type tags
pub const BLOB: &FourCC = b"blob";
pub const BOOL: &FourCC = b"bool";
pub const SHORT: &FourCC = b"shor";
