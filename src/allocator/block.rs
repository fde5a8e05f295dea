//! Block definitions
//!
//! A block is a fixed-size region of the file with its own write cursor.

use crate::record::Record;

/// Handle to a user block returned by `BuddyAllocator::allocate_block`
///
/// The handle counts user blocks only. Its on-disk number is shifted by one
/// because the metadata block owns slot 0 of the address table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    pub(crate) fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// 0-based ordinal among user blocks
    pub fn index(self) -> u32 {
        self.0
    }

    /// Block number as stored in the file (address table slot)
    pub fn table_index(self) -> u32 {
        self.0 + 1
    }
}

/// An address range in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub address: u32,
    pub size: u32,
}

impl Extent {
    /// Address table encoding: `address | log2(size)`
    pub fn encode(&self) -> u32 {
        self.address | self.size.trailing_zeros()
    }

    /// Inverse of `encode`
    pub fn decode(entry: u32) -> Self {
        Self {
            address: entry & !super::SIZE_SHIFT_MASK,
            size: 1u32 << (entry & super::SIZE_SHIFT_MASK),
        }
    }

    pub fn end(&self) -> u64 {
        self.address as u64 + self.size as u64
    }
}

/// A block: fixed address, fixed power-of-two size, mutable contents
#[derive(Debug, Clone)]
pub struct Block {
    address: u32,
    record: Record,
}

impl Block {
    pub(crate) fn new(address: u32, size: u32) -> Self {
        Self {
            address,
            record: Record::with_capacity(size as usize),
        }
    }

    /// Byte offset of the block inside the container
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Block size in bytes (always a power of two)
    pub fn size(&self) -> u32 {
        self.record.len() as u32
    }

    pub fn extent(&self) -> Extent {
        Extent {
            address: self.address,
            size: self.size(),
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    pub fn as_slice(&self) -> &[u8] {
        self.record.as_slice()
    }
}
