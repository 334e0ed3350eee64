use log::debug;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use super::error::{PDUError, PDUResult};
use crate::util::{EntityID, UnsignedByteField};

pub(crate) const MAX_TLV_VALUE_LEN: usize = u8::MAX as usize;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
/// Type codes of the TLV fields defined for CFDP.
pub enum TLVType {
    FileStoreRequest = 0x00,
    FileStoreResponse = 0x01,
    MessageToUser = 0x02,
    FaultHandlerOverride = 0x04,
    FlowLabel = 0x05,
    EntityID = 0x06,
}

/// Generic Type-Length-Value field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TLV {
    tlv_type: TLVType,
    value: Vec<u8>,
}
impl TLV {
    pub fn new(tlv_type: TLVType, value: Vec<u8>) -> PDUResult<Self> {
        if value.len() > MAX_TLV_VALUE_LEN {
            return Err(PDUError::ValueTooLong {
                field: "TLV value",
                length: value.len(),
                max: MAX_TLV_VALUE_LEN,
            });
        }
        Ok(Self { tlv_type, value })
    }

    pub fn tlv_type(&self) -> TLVType {
        self.tlv_type
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
        2 + self.value.len()
    }

    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.tlv_type as u8);
        buffer.push(self.value.len() as u8);
        buffer.extend_from_slice(&self.value);
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.packet_len());
        self.write_to(&mut buffer);
        buffer
    }

    /// Parse the TLV at the front of `buffer`.
    ///
    /// A declared length running past the end of `buffer` is truncated to the bytes
    /// that are present. Bytes after the declared value are ignored.
    pub fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        if buffer.len() < 2 {
            return Err(PDUError::BufferTooShort {
                expected: 2,
                found: buffer.len(),
            });
        }
        let tlv_type = TLVType::from_u8(buffer[0]).ok_or(PDUError::InvalidTLVType(buffer[0]))?;
        let declared = buffer[1] as usize;
        let available = buffer.len() - 2;
        let length = if declared > available {
            debug!(
                "TLV {tlv_type:?} declares {declared} bytes but only {available} remain, truncating"
            );
            available
        } else {
            declared
        };
        Ok(Self {
            tlv_type,
            value: buffer[2..2 + length].to_vec(),
        })
    }

    pub(crate) fn expect_type(&self, expected: TLVType) -> PDUResult<()> {
        match self.tlv_type == expected {
            true => Ok(()),
            false => Err(PDUError::TLVTypeMismatch {
                expected,
                found: self.tlv_type,
            }),
        }
    }
}

/// Conversion between a structured TLV view and the generic [TLV].
pub trait TLVEncode: Sized {
    const TLV_TYPE: TLVType;

    fn to_tlv(&self) -> PDUResult<TLV>;

    /// Interpret a generic TLV. Fails with [PDUError::TLVTypeMismatch] when the tag
    /// does not match [Self::TLV_TYPE].
    fn from_tlv(tlv: &TLV) -> PDUResult<Self>;

    fn pack(&self) -> PDUResult<Vec<u8>> {
        Ok(self.to_tlv()?.pack())
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        Self::from_tlv(&TLV::unpack(buffer)?)
    }

    fn packet_len(&self) -> PDUResult<usize> {
        Ok(self.to_tlv()?.packet_len())
    }
}

/// Parse a sequence of TLVs filling `buffer` exactly.
///
/// Inside a PDU the enclosing data field length bounds the list, so a TLV running
/// past the end of the field is an error here.
pub(crate) fn unpack_tlv_list(buffer: &[u8]) -> PDUResult<Vec<TLV>> {
    let mut tlvs = vec![];
    let mut index = 0;
    while index < buffer.len() {
        let remaining = &buffer[index..];
        if remaining.len() < 2 || 2 + remaining[1] as usize > remaining.len() {
            return Err(PDUError::length_mismatch(
                buffer.len(),
                index + 2 + remaining.get(1).map_or(0, |len| *len as usize),
            ));
        }
        let tlv = TLV::unpack(remaining)?;
        index += tlv.packet_len();
        tlvs.push(tlv);
    }
    Ok(tlvs)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Entity ID carried as a TLV, used for fault locations.
pub struct EntityIdTLV {
    pub entity_id: EntityID,
}
impl EntityIdTLV {
    pub fn new(entity_id: EntityID) -> Self {
        Self { entity_id }
    }
}
impl TLVEncode for EntityIdTLV {
    const TLV_TYPE: TLVType = TLVType::EntityID;

    fn to_tlv(&self) -> PDUResult<TLV> {
        TLV::new(Self::TLV_TYPE, self.entity_id.to_be_bytes())
    }

    fn from_tlv(tlv: &TLV) -> PDUResult<Self> {
        tlv.expect_type(Self::TLV_TYPE)?;
        let entity_id = UnsignedByteField::from_be_bytes(tlv.len(), tlv.value())?;
        Ok(Self { entity_id })
    }
}
impl From<EntityID> for EntityIdTLV {
    fn from(entity_id: EntityID) -> Self {
        Self { entity_id }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FlowLabelTLV {
    pub value: Vec<u8>,
}
impl TLVEncode for FlowLabelTLV {
    const TLV_TYPE: TLVType = TLVType::FlowLabel;

    fn to_tlv(&self) -> PDUResult<TLV> {
        TLV::new(Self::TLV_TYPE, self.value.clone())
    }

    fn from_tlv(tlv: &TLV) -> PDUResult<Self> {
        tlv.expect_type(Self::TLV_TYPE)?;
        Ok(Self {
            value: tlv.value().to_vec(),
        })
    }
}

macro_rules! impl_try_from_tlv {
    ( $( $typed:ty ),+ ) => {
        $(
            impl TryFrom<TLV> for $typed {
                type Error = PDUError;

                fn try_from(tlv: TLV) -> Result<Self, Self::Error> {
                    <$typed as TLVEncode>::from_tlv(&tlv)
                }
            }
        )+
    };
}
impl_try_from_tlv!(EntityIdTLV, FlowLabelTLV);
pub(crate) use impl_try_from_tlv;
