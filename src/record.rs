//! Record
//!
//! Big-endian byte buffer with a movable write cursor.
//!
//! Two flavours share the same write API:
//! - **Fixed**: zero-filled to a capacity chosen up front (allocator blocks).
//!   Writes past the end fail with `CapacityExceeded`.
//! - **Growable**: starts empty and zero-extends on demand (small value blobs).
//!
//! `seek` never truncates or clears. It exists to patch a field that was
//! written as a placeholder once its final value is known.

use bytes::{Bytes, BytesMut};

use crate::btree::FourCC;
use crate::error::{ForgeError, Result};

/// Byte buffer with a write cursor
#[derive(Debug, Clone)]
pub struct Record {
    data: BytesMut,
    cursor: usize,
    growable: bool,
}

impl Record {
    /// Create a zero-filled record of exactly `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::zeroed(capacity),
            cursor: 0,
            growable: false,
        }
    }

    /// Create an empty record that grows as it is written
    pub fn growable() -> Self {
        Self {
            data: BytesMut::new(),
            cursor: 0,
            growable: true,
        }
    }

    /// Claim the next `width` bytes at the cursor and advance past them
    fn claim(&mut self, width: usize) -> Result<&mut [u8]> {
        let start = self.cursor;
        let end = start
            .checked_add(width)
            .ok_or(ForgeError::CapacityExceeded {
                offset: start,
                width,
                capacity: self.data.len(),
            })?;

        if end > self.data.len() {
            if !self.growable {
                return Err(ForgeError::CapacityExceeded {
                    offset: start,
                    width,
                    capacity: self.data.len(),
                });
            }
            self.data.resize(end, 0);
        }

        self.cursor = end;
        Ok(&mut self.data[start..end])
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.claim(1)?[0] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.claim(2)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.claim(4)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Write raw bytes verbatim
    pub fn write_bytes(&mut self, raw: &[u8]) -> Result<()> {
        self.claim(raw.len())?.copy_from_slice(raw);
        Ok(())
    }

    /// Write a four-character code (no length, no terminator)
    pub fn write_tag(&mut self, tag: &FourCC) -> Result<()> {
        self.write_bytes(tag)
    }

    /// Move the cursor without touching existing bytes
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if !self.growable && offset > self.data.len() {
            return Err(ForgeError::SeekOutOfBounds {
                offset,
                len: self.data.len(),
            });
        }
        self.cursor = offset;
        Ok(())
    }

    /// Current cursor offset
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left between the cursor and the end of a fixed record
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.cursor)
    }

    /// Length of the buffer (the capacity for a fixed record)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the buffer into immutable bytes
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }
}
