use camino::{Utf8Path, Utf8PathBuf};

use super::error::{PDUError, PDUResult};

pub(crate) const MAX_LV_LEN: usize = u8::MAX as usize;

/// Length-Value field: a one byte length prefix followed by up to 255 bytes.
/// Used for every file name carried in a PDU.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LV {
    value: Vec<u8>,
}
impl LV {
    pub fn new(value: Vec<u8>) -> PDUResult<Self> {
        if value.len() > MAX_LV_LEN {
            return Err(PDUError::ValueTooLong {
                field: "LV value",
                length: value.len(),
                max: MAX_LV_LEN,
            });
        }
        Ok(Self { value })
    }

    pub fn from_path(path: &Utf8Path) -> PDUResult<Self> {
        Self::new(path.as_str().as_bytes().to_vec())
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn packet_len(&self) -> usize {
        1 + self.value.len()
    }

    pub fn value_as_str(&self) -> PDUResult<&str> {
        Ok(std::str::from_utf8(&self.value)?)
    }

    pub fn to_path(&self) -> PDUResult<Utf8PathBuf> {
        Ok(Utf8PathBuf::from(self.value_as_str()?))
    }

    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        // length is bounded on construction
        buffer.push(self.value.len() as u8);
        buffer.extend_from_slice(&self.value);
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.packet_len());
        self.write_to(&mut buffer);
        buffer
    }

    /// Parse the LV at the front of `buffer`. Bytes after the value are ignored.
    pub fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let length = *buffer.first().ok_or(PDUError::BufferTooShort {
            expected: 1,
            found: 0,
        })? as usize;
        if buffer.len() < 1 + length {
            return Err(PDUError::BufferTooShort {
                expected: 1 + length,
                found: buffer.len(),
            });
        }
        Ok(Self {
            value: buffer[1..1 + length].to_vec(),
        })
    }
}

impl std::str::FromStr for LV {
    type Err = PDUError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input.as_bytes().to_vec())
    }
}
