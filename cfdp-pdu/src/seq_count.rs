use crate::{
    pdu::{PDUError, PDUResult},
    util::UnsignedByteField,
};

/// Source of transaction sequence numbers.
pub trait SequenceCountProvider {
    fn max_bit_width(&self) -> u32;

    /// Return the current count, then advance it. The first call yields 0.
    fn get_and_increment(&mut self) -> u64;

    /// As [Self::get_and_increment], wrapped in a field of the provider's width.
    fn get_and_increment_field(&mut self) -> PDUResult<UnsignedByteField> {
        let width = (self.max_bit_width() / 8) as usize;
        UnsignedByteField::new(width, self.get_and_increment())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Counter rolling over to 0 after `2^max_bit_width - 1`.
pub struct InMemorySequenceCounter {
    max_bit_width: u32,
    count: u64,
}
impl InMemorySequenceCounter {
    pub fn new(max_bit_width: u32) -> PDUResult<Self> {
        match max_bit_width {
            8 | 16 | 32 | 64 => Ok(Self {
                max_bit_width,
                count: 0,
            }),
            other => Err(PDUError::InvalidCounterWidth(other)),
        }
    }

    pub fn current(&self) -> u64 {
        self.count
    }

    fn max_value(&self) -> u64 {
        match self.max_bit_width {
            64 => u64::MAX,
            width => (1_u64 << width) - 1,
        }
    }
}
impl SequenceCountProvider for InMemorySequenceCounter {
    fn max_bit_width(&self) -> u32 {
        self.max_bit_width
    }

    fn get_and_increment(&mut self) -> u64 {
        let current = self.count;
        self.count = match current >= self.max_value() {
            true => 0,
            false => current + 1,
        };
        current
    }
}
impl Iterator for InMemorySequenceCounter {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.get_and_increment())
    }
}
