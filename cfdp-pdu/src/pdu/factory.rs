use std::fmt;

use log::debug;
use num_traits::FromPrimitive;

use super::{
    error::{PDUError, PDUResult},
    file_data::FileDataPDU,
    file_directive::DirectiveType,
    header::{PDUHeader, PDUType},
    ops::{AckPDU, EofPDU, FinishedPDU, KeepAlivePDU, MetadataPDU, NakPDU, PromptPDU},
    PDUEncode,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The concrete PDU kinds, used to report what was expected and what was found.
pub enum PDUKind {
    EoF,
    Finished,
    Ack,
    Metadata,
    Nak,
    Prompt,
    KeepAlive,
    FileData,
}
impl From<DirectiveType> for PDUKind {
    fn from(directive: DirectiveType) -> Self {
        match directive {
            DirectiveType::EoF => Self::EoF,
            DirectiveType::Finished => Self::Finished,
            DirectiveType::Ack => Self::Ack,
            DirectiveType::Metadata => Self::Metadata,
            DirectiveType::Nak => Self::Nak,
            DirectiveType::Prompt => Self::Prompt,
            DirectiveType::KeepAlive => Self::KeepAlive,
        }
    }
}
impl fmt::Display for PDUKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::EoF => "EOF PDU",
            Self::Finished => "Finished PDU",
            Self::Ack => "ACK PDU",
            Self::Metadata => "Metadata PDU",
            Self::Nak => "NAK PDU",
            Self::Prompt => "Prompt PDU",
            Self::KeepAlive => "Keep Alive PDU",
            Self::FileData => "File Data PDU",
        };
        write!(f, "{name}")
    }
}

/// Classifies raw PDUs and decodes them into a [PDUHolder].
pub struct PDUFactory;
impl PDUFactory {
    pub fn pdu_type(buffer: &[u8]) -> PDUResult<PDUType> {
        let first_byte = *buffer.first().ok_or(PDUError::BufferTooShort {
            expected: 1,
            found: 0,
        })?;
        match (first_byte >> 4) & 0b1 {
            0 => Ok(PDUType::FileDirective),
            _ => Ok(PDUType::FileData),
        }
    }

    pub fn is_file_directive(buffer: &[u8]) -> PDUResult<bool> {
        Ok(Self::pdu_type(buffer)? == PDUType::FileDirective)
    }

    /// The directive code following the header, `None` for file data PDUs.
    pub fn pdu_directive_type(buffer: &[u8]) -> PDUResult<Option<DirectiveType>> {
        if !Self::is_file_directive(buffer)? {
            return Ok(None);
        }
        let header_len = PDUHeader::header_len_from_raw(buffer)?;
        let code = *buffer.get(header_len).ok_or(PDUError::BufferTooShort {
            expected: header_len + 1,
            found: buffer.len(),
        })?;
        DirectiveType::from_u8(code)
            .map(Some)
            .ok_or(PDUError::InvalidDirective(code))
    }

    pub fn from_raw(buffer: &[u8]) -> PDUResult<PDUHolder> {
        let holder = match Self::pdu_directive_type(buffer)? {
            None => PDUHolder::FileData(FileDataPDU::unpack(buffer)?),
            Some(DirectiveType::EoF) => PDUHolder::EoF(EofPDU::unpack(buffer)?),
            Some(DirectiveType::Finished) => PDUHolder::Finished(FinishedPDU::unpack(buffer)?),
            Some(DirectiveType::Ack) => PDUHolder::Ack(AckPDU::unpack(buffer)?),
            Some(DirectiveType::Metadata) => PDUHolder::Metadata(MetadataPDU::unpack(buffer)?),
            Some(DirectiveType::Nak) => PDUHolder::Nak(NakPDU::unpack(buffer)?),
            Some(DirectiveType::Prompt) => PDUHolder::Prompt(PromptPDU::unpack(buffer)?),
            Some(DirectiveType::KeepAlive) => {
                PDUHolder::KeepAlive(KeepAlivePDU::unpack(buffer)?)
            }
        };
        debug!(
            "Decoded {} for transaction {}.{}",
            holder.kind(),
            holder.header().source_entity_id().value(),
            holder.header().transaction_seq_num().value()
        );
        Ok(holder)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Any decoded PDU.
pub enum PDUHolder {
    EoF(EofPDU),
    Finished(FinishedPDU),
    Ack(AckPDU),
    Metadata(MetadataPDU),
    Nak(NakPDU),
    Prompt(PromptPDU),
    KeepAlive(KeepAlivePDU),
    FileData(FileDataPDU),
}

macro_rules! dispatch {
    ($holder:expr, $pdu:ident => $body:expr) => {
        match $holder {
            PDUHolder::EoF($pdu) => $body,
            PDUHolder::Finished($pdu) => $body,
            PDUHolder::Ack($pdu) => $body,
            PDUHolder::Metadata($pdu) => $body,
            PDUHolder::Nak($pdu) => $body,
            PDUHolder::Prompt($pdu) => $body,
            PDUHolder::KeepAlive($pdu) => $body,
            PDUHolder::FileData($pdu) => $body,
        }
    };
}

macro_rules! impl_holder_access {
    ( $( $variant:ident, $pdu:ty, $getter:ident );+ $(;)? ) => {
        impl PDUHolder {
            $(
                pub fn $getter(&self) -> PDUResult<&$pdu> {
                    match self {
                        Self::$variant(pdu) => Ok(pdu),
                        other => Err(PDUError::UnexpectedPDU {
                            expected: PDUKind::$variant,
                            found: other.kind(),
                        }),
                    }
                }
            )+
        }

        $(
            impl From<$pdu> for PDUHolder {
                fn from(pdu: $pdu) -> Self {
                    Self::$variant(pdu)
                }
            }
        )+
    };
}

impl_holder_access!(
    EoF, EofPDU, to_eof_pdu;
    Finished, FinishedPDU, to_finished_pdu;
    Ack, AckPDU, to_ack_pdu;
    Metadata, MetadataPDU, to_metadata_pdu;
    Nak, NakPDU, to_nak_pdu;
    Prompt, PromptPDU, to_prompt_pdu;
    KeepAlive, KeepAlivePDU, to_keep_alive_pdu;
    FileData, FileDataPDU, to_file_data_pdu;
);

impl PDUHolder {
    pub fn kind(&self) -> PDUKind {
        match self {
            Self::EoF(_) => PDUKind::EoF,
            Self::Finished(_) => PDUKind::Finished,
            Self::Ack(_) => PDUKind::Ack,
            Self::Metadata(_) => PDUKind::Metadata,
            Self::Nak(_) => PDUKind::Nak,
            Self::Prompt(_) => PDUKind::Prompt,
            Self::KeepAlive(_) => PDUKind::KeepAlive,
            Self::FileData(_) => PDUKind::FileData,
        }
    }

    pub fn header(&self) -> &PDUHeader {
        dispatch!(self, pdu => pdu.header())
    }

    pub fn pdu_type(&self) -> PDUType {
        self.header().pdu_type()
    }

    pub fn directive_type(&self) -> Option<DirectiveType> {
        match self {
            Self::EoF(_) => Some(DirectiveType::EoF),
            Self::Finished(_) => Some(DirectiveType::Finished),
            Self::Ack(_) => Some(DirectiveType::Ack),
            Self::Metadata(_) => Some(DirectiveType::Metadata),
            Self::Nak(_) => Some(DirectiveType::Nak),
            Self::Prompt(_) => Some(DirectiveType::Prompt),
            Self::KeepAlive(_) => Some(DirectiveType::KeepAlive),
            Self::FileData(_) => None,
        }
    }

    pub fn pack(&self) -> PDUResult<Vec<u8>> {
        dispatch!(self, pdu => pdu.pack())
    }

    pub fn packet_len(&self) -> usize {
        dispatch!(self, pdu => pdu.packet_len())
    }
}
