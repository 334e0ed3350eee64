use byteorder::{BigEndian, ReadBytesExt};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use super::{
    error::{PDUError, PDUResult},
    factory::PDUKind,
    header::{FileSizeFlag, PDUConfig, PDUHeader, PDUType},
    PDUEncode,
};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
/// The possible directive types of a PDU, used to distinguish the PDUs.
pub enum DirectiveType {
    /// End of File PDU
    EoF = 0x04,
    /// Finished PDU
    Finished = 0x05,
    /// Positive Acknowledgement PDU
    Ack = 0x06,
    /// Metadata PDU
    Metadata = 0x07,
    /// Negative Acknowledgement PDU
    Nak = 0x08,
    /// Prompt PDU
    Prompt = 0x09,
    /// A Keep alive PDU
    KeepAlive = 0x0C,
}

/// Header plus directive code, shared by every directive PDU.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDirectivePDUBase {
    header: PDUHeader,
    directive_type: DirectiveType,
}
impl FileDirectivePDUBase {
    pub fn new(config: PDUConfig, directive_type: DirectiveType) -> Self {
        Self {
            header: PDUHeader::new_for_file_directive(config),
            directive_type,
        }
    }

    pub fn header(&self) -> &PDUHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut PDUHeader {
        &mut self.header
    }

    pub fn directive_type(&self) -> DirectiveType {
        self.directive_type
    }

    pub fn file_flag(&self) -> FileSizeFlag {
        self.header.file_flag()
    }

    /// Assemble the PDU: header, directive code, `params`, then the CRC when enabled.
    pub fn pack_with(&self, params: &[u8]) -> PDUResult<Vec<u8>> {
        let mut data_field = Vec::with_capacity(1 + params.len());
        data_field.push(self.directive_type as u8);
        data_field.extend_from_slice(params);
        self.header
            .pack_with_data_field(PDUType::FileDirective, &data_field)
    }

    /// Parse the header and directive code of a raw PDU.
    ///
    /// Returns the base together with the directive parameter field, which ends where
    /// the declared data field ends.
    pub fn unpack(buffer: &[u8], expected: DirectiveType) -> PDUResult<(Self, &[u8])> {
        let (header, data_field) = PDUHeader::unpack_with_data_field(buffer)?;
        if header.pdu_type() == PDUType::FileData {
            return Err(PDUError::UnexpectedPDU {
                expected: PDUKind::from(expected),
                found: PDUKind::FileData,
            });
        }
        let code = *data_field.first().ok_or(PDUError::BufferTooShort {
            expected: header.header_len() + 1,
            found: header.header_len(),
        })?;
        let directive_type = DirectiveType::from_u8(code).ok_or(PDUError::InvalidDirective(code))?;
        if directive_type != expected {
            return Err(PDUError::UnexpectedDirective {
                expected,
                found: directive_type,
            });
        }
        Ok((
            Self {
                header,
                directive_type,
            },
            &data_field[1..],
        ))
    }
}

/// Common view over the directive PDUs.
pub trait FileDirectivePDU: PDUEncode {
    fn base(&self) -> &FileDirectivePDUBase;

    fn directive_type(&self) -> DirectiveType {
        self.base().directive_type()
    }

    /// Length of the parameters following the directive code.
    fn directive_param_field_len(&self) -> usize {
        self.pdu_data_field_len() - 1
    }
}

/// Write a file size sensitive field with the width selected by `file_flag`.
pub fn write_fss_field(buffer: &mut Vec<u8>, file_flag: FileSizeFlag, value: u64) -> PDUResult<()> {
    match file_flag {
        FileSizeFlag::Small => {
            let small = u32::try_from(value).map_err(|_| PDUError::FileSizeTooLarge(value))?;
            buffer.extend(small.to_be_bytes());
        }
        FileSizeFlag::Large => buffer.extend(value.to_be_bytes()),
    }
    Ok(())
}

/// Read a file size sensitive field from the front of `buffer`, advancing it.
pub fn parse_fss_field(buffer: &mut &[u8], file_flag: FileSizeFlag) -> PDUResult<u64> {
    let width = file_flag.encoded_len();
    if buffer.len() < width {
        return Err(PDUError::BufferTooShort {
            expected: width,
            found: buffer.len(),
        });
    }
    Ok(match file_flag {
        FileSizeFlag::Small => buffer.read_u32::<BigEndian>()? as u64,
        FileSizeFlag::Large => buffer.read_u64::<BigEndian>()?,
    })
}
