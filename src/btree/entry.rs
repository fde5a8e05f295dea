//! Record entries stored in the leaf page

use bytes::Bytes;

use crate::error::Result;
use crate::record::Record;

use super::{FourCC, BLOB, BOOL, SHORT};

/// Typed record payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    /// Opaque byte string (`blob`)
    Blob(Bytes),

    /// Single-byte flag (`bool`)
    Bool(bool),

    /// 16-bit value stored in a 32-bit slot (`shor`)
    Short(u16),
}

impl RecordValue {
    /// Data type tag written after the record type
    pub fn data_type(&self) -> &'static FourCC {
        match self {
            RecordValue::Blob(_) => BLOB,
            RecordValue::Bool(_) => BOOL,
            RecordValue::Short(_) => SHORT,
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            RecordValue::Blob(data) => 4 + data.len(),
            RecordValue::Bool(_) => 1,
            RecordValue::Short(_) => 4,
        }
    }

    fn encode(&self, record: &mut Record) -> Result<()> {
        match self {
            RecordValue::Blob(data) => {
                record.write_u32(data.len() as u32)?;
                record.write_bytes(data)
            }
            RecordValue::Bool(flag) => record.write_u8(u8::from(*flag)),
            RecordValue::Short(value) => record.write_u32(u32::from(*value)),
        }
    }
}

/// One (filename, record type, value) triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// File the record describes; `"."` is the folder itself
    pub name: String,

    /// Record type code, e.g. `Iloc` or `BKGD`
    pub record_type: FourCC,

    pub value: RecordValue,
}

impl Entry {
    pub fn blob(name: impl Into<String>, record_type: FourCC, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            record_type,
            value: RecordValue::Blob(data.into()),
        }
    }

    pub fn boolean(name: impl Into<String>, record_type: FourCC, flag: bool) -> Self {
        Self {
            name: name.into(),
            record_type,
            value: RecordValue::Bool(flag),
        }
    }

    pub fn short(name: impl Into<String>, record_type: FourCC, value: u16) -> Self {
        Self {
            name: name.into(),
            record_type,
            value: RecordValue::Short(value),
        }
    }

    /// Bytes this entry occupies in the leaf page
    pub fn encoded_len(&self) -> usize {
        4 + 2 * self.name.encode_utf16().count() + 4 + 4 + self.value.encoded_len()
    }

    /// Append the entry at the record's cursor
    ///
    /// Name length counts UTF-16 code units, not bytes.
    pub(crate) fn encode(&self, record: &mut Record) -> Result<()> {
        record.write_u32(self.name.encode_utf16().count() as u32)?;
        for unit in self.name.encode_utf16() {
            record.write_u16(unit)?;
        }
        record.write_tag(&self.record_type)?;
        record.write_tag(self.value.data_type())?;
        self.value.encode(record)
    }
}

/// Ordering key for leaf entries
///
/// Finder orders names case-insensitively; comparing the lowercase UTF-16
/// form matches it for the names a packaging step produces.
pub fn sort_key(name: &str) -> Vec<u16> {
    name.to_lowercase().encode_utf16().collect()
}
