use std::fmt;

use crate::pdu::{PDUError, PDUResult};

macro_rules! impl_field {
    ( $prim:ty, $width:expr ) => {
        impl From<$prim> for UnsignedByteField {
            fn from(val: $prim) -> Self {
                Self {
                    value: val as u64,
                    width: $width,
                }
            }
        }
    };
}

/// A big endian unsigned integer with a fixed byte width.
///
/// The protocol carries entity IDs and transaction sequence numbers with a width
/// negotiated per transaction, so the width is part of the value: `1_u8` and `1_u16`
/// are different fields. A width of 0 is the empty sentinel used when no identifier
/// is present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UnsignedByteField {
    value: u64,
    width: usize,
}
impl_field!(u8, 1);
impl_field!(u16, 2);
impl_field!(u32, 4);
impl_field!(u64, 8);

pub type EntityID = UnsignedByteField;
pub type TransactionSeqNum = UnsignedByteField;

impl UnsignedByteField {
    pub const fn empty() -> Self {
        Self { value: 0, width: 0 }
    }

    /// Construct a field of the given width, failing when `value` does not fit.
    pub fn new(width: usize, value: u64) -> PDUResult<Self> {
        let max = Self::max_value(width)?;
        if value > max {
            return Err(PDUError::ValueTooLarge { value, width });
        }
        Ok(Self { value, width })
    }

    /// Read a field of `width` bytes from the front of `buffer`.
    /// Trailing bytes are left untouched.
    pub fn from_be_bytes(width: usize, buffer: &[u8]) -> PDUResult<Self> {
        Self::max_value(width)?;
        if buffer.len() < width {
            return Err(PDUError::BufferTooShort {
                expected: width,
                found: buffer.len(),
            });
        }
        let value = buffer[..width]
            .iter()
            .fold(0_u64, |acc, byte| (acc << 8) | *byte as u64);
        Ok(Self { value, width })
    }

    fn max_value(width: usize) -> PDUResult<u64> {
        match width {
            0 => Ok(0),
            1 => Ok(u8::MAX as u64),
            2 => Ok(u16::MAX as u64),
            4 => Ok(u32::MAX as u64),
            8 => Ok(u64::MAX),
            other => Err(PDUError::InvalidByteFieldWidth(other)),
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    /// Exactly `width` big endian bytes.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.value.to_be_bytes()[8 - self.width..].to_vec()
    }

    pub fn write_be(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.value.to_be_bytes()[8 - self.width..]);
    }

    /// Zero padded hex representation, `None` for the empty field.
    pub fn hex_str(&self) -> Option<String> {
        match self.width {
            1 => Some(format!("{:#04x}", self.value)),
            2 => Some(format!("{:#06x}", self.value)),
            4 => Some(format!("{:#010x}", self.value)),
            8 => Some(format!("{:#018x}", self.value)),
            _ => None,
        }
    }
}

impl Default for UnsignedByteField {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for UnsignedByteField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.hex_str() {
            Some(hex) => write!(f, "dec={}, hex={}", self.value, hex),
            None => write!(f, "empty"),
        }
    }
}

/// Source entity and sequence number which together identify a transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub source_id: EntityID,
    pub seq_num: TransactionSeqNum,
}

impl TransactionId {
    pub fn new(source_id: EntityID, seq_num: TransactionSeqNum) -> Self {
        Self { source_id, seq_num }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.source_id.value(), self.seq_num.value())
    }
}
