//! # dsforge
//!
//! Offline forging of Finder `.DS_Store` files for disk-image packaging:
//! - Buddy-aligned block allocator reproducing the `Bud1` container
//! - Single-page B-tree holding the Finder records
//! - Alias records referencing the background image
//! - Read-back decoder for verification
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FolderLayout (driver)                    │
//! │        background, window geometry, icon placements          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ entries (sorted)
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Alias    │─────────▶│  LeafIndex  │
//!   │  (pict blob)│          │ (leaf page) │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ writes into blocks
//!                                   ▼
//!                           ┌───────────────┐
//!                           │BuddyAllocator │──▶ byte stream
//!                           │ (Bud1 blocks) │
//!                           └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod allocator;
pub mod btree;
pub mod alias;
pub mod layout;
pub mod reader;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ForgeError, Result};
pub use config::Config;
pub use record::Record;
pub use allocator::{Block, BlockId, BuddyAllocator};
pub use btree::{Entry, LeafIndex, RecordValue};
pub use alias::{build_alias, AliasRecord};
pub use layout::{forge, forge_to_path, FilePlacement, FolderLayout};
pub use reader::{MasterInfo, StoreReader};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of dsforge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
