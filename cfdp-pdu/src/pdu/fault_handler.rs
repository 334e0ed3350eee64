use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::{
    error::{PDUError, PDUResult},
    header::Condition,
    tlv::{impl_try_from_tlv, TLVEncode, TLVType, TLV},
};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
/// Fault Handler Codes defined by CCSDS
/// Values of 0b0000 and 0b0101-0b1111 are reserved as of 2022.
pub enum HandlerCode {
    NoticeOfCancellation = 0b0001,
    NoticeOfSuspension = 0b0010,
    IgnoreError = 0b0011,
    AbandonTransaction = 0b0100,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Overrides the default handler of one fault condition for a transaction.
pub struct FaultHandlerOverrideTLV {
    pub condition: Condition,
    pub handler_code: HandlerCode,
}
impl FaultHandlerOverrideTLV {
    pub fn new(condition: Condition, handler_code: HandlerCode) -> Self {
        Self {
            condition,
            handler_code,
        }
    }
}
impl TLVEncode for FaultHandlerOverrideTLV {
    const TLV_TYPE: TLVType = TLVType::FaultHandlerOverride;

    fn to_tlv(&self) -> PDUResult<TLV> {
        TLV::new(
            Self::TLV_TYPE,
            vec![((self.condition as u8) << 4) | self.handler_code as u8],
        )
    }

    fn from_tlv(tlv: &TLV) -> PDUResult<Self> {
        tlv.expect_type(Self::TLV_TYPE)?;
        let byte = *tlv.value().first().ok_or(PDUError::BufferTooShort {
            expected: 1,
            found: 0,
        })?;
        let condition = Condition::from_high_nibble(byte)?;
        let handler_code = {
            let possible_code = byte & 0x0F;
            HandlerCode::from_u8(possible_code)
                .ok_or(PDUError::InvalidFaultHandlerCode(possible_code))?
        };
        Ok(Self {
            condition,
            handler_code,
        })
    }
}
impl_try_from_tlv!(FaultHandlerOverrideTLV);

#[cfg(test)]
mod test {
    use super::*;
    use crate::assert_err;

    use rstest::rstest;

    #[rstest]
    fn fault_handler_override(
        #[values(
            Condition::PositiveLimitReached,
            Condition::FileChecksumFailure,
            Condition::InactivityDetected,
            Condition::CheckLimitReached
        )]
        condition: Condition,
        #[values(
            HandlerCode::NoticeOfCancellation,
            HandlerCode::NoticeOfSuspension,
            HandlerCode::IgnoreError,
            HandlerCode::AbandonTransaction
        )]
        handler_code: HandlerCode,
    ) -> PDUResult<()> {
        let expected = FaultHandlerOverrideTLV::new(condition, handler_code);
        let buffer = expected.pack()?;
        assert_eq!(3, buffer.len());
        assert_eq!(((condition as u8) << 4) | handler_code as u8, buffer[2]);
        assert_eq!(expected, FaultHandlerOverrideTLV::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn reserved_handler_code(#[values(0x00, 0x05, 0x0F)] code: u8) {
        assert_err!(
            FaultHandlerOverrideTLV::unpack(&[0x04, 0x01, 0x50 | code]),
            Err(PDUError::InvalidFaultHandlerCode(found)) if found == code
        );
    }

    #[test]
    fn empty_value() {
        assert_err!(
            FaultHandlerOverrideTLV::unpack(&[0x04, 0x00]),
            Err(PDUError::BufferTooShort { .. })
        );
    }
}
