use byteorder::{BigEndian, ReadBytesExt};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use super::{
    error::{PDUError, PDUResult},
    fault_handler::FaultHandlerOverrideTLV,
    file_directive::{
        parse_fss_field, write_fss_field, DirectiveType, FileDirectivePDU, FileDirectivePDUBase,
    },
    filestore::{FileStoreRequestTLV, FileStoreResponseTLV},
    header::{
        Condition, DeliveryCode, Direction, FileStatusCode, NakOrKeepAlive, PDUConfig, PDUHeader,
        TransactionStatus,
    },
    lv::LV,
    msg_to_user::MessageToUserTLV,
    tlv::{unpack_tlv_list, EntityIdTLV, FlowLabelTLV, TLVEncode, TLVType, TLV},
    PDUEncode,
};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
/// Checksum algorithms announced in the Metadata PDU (SANA checksum identifiers).
pub enum ChecksumType {
    Modular = 0,
    Crc32Proximity1 = 1,
    Crc32C = 2,
    Crc32 = 3,
    Null = 15,
}

fn read_byte(buffer: &mut &[u8]) -> PDUResult<u8> {
    match buffer.is_empty() {
        true => Err(PDUError::BufferTooShort {
            expected: 1,
            found: 0,
        }),
        false => Ok(buffer.read_u8()?),
    }
}

fn check_fixed_len(params: &[u8], expected: usize) -> PDUResult<()> {
    match params.len() == expected {
        true => Ok(()),
        false => Err(PDUError::length_mismatch(1 + params.len(), 1 + expected)),
    }
}

fn fault_location_len(fault_location: &Option<EntityIdTLV>) -> usize {
    fault_location.map_or(0, |fault| 2 + fault.entity_id.width())
}

/// Parse the TLVs remaining in a parameter field which may hold at most one.
fn single_optional_tlv(buffer: &[u8]) -> PDUResult<Option<TLV>> {
    let mut tlvs = unpack_tlv_list(buffer)?;
    match tlvs.len() {
        0 | 1 => Ok(tlvs.pop()),
        _ => Err(PDUError::length_mismatch(buffer.len(), tlvs[0].packet_len())),
    }
}

macro_rules! impl_directive_accessors {
    ( $( $pdu:ty ),+ ) => {
        $(
            impl $pdu {
                pub fn header_mut(&mut self) -> &mut PDUHeader {
                    self.base.header_mut()
                }
            }

            impl FileDirectivePDU for $pdu {
                fn base(&self) -> &FileDirectivePDUBase {
                    &self.base
                }
            }
        )+
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// End of File PDU, sent once all file data of a transaction has been transmitted.
pub struct EofPDU {
    base: FileDirectivePDUBase,
    pub condition: Condition,
    pub file_checksum: u32,
    pub file_size: u64,
    pub fault_location: Option<EntityIdTLV>,
}
impl EofPDU {
    pub fn new(
        mut config: PDUConfig,
        condition: Condition,
        file_checksum: u32,
        file_size: u64,
        fault_location: Option<EntityIdTLV>,
    ) -> Self {
        config.direction = Direction::ToReceiver;
        Self {
            base: FileDirectivePDUBase::new(config, DirectiveType::EoF),
            condition,
            file_checksum,
            file_size,
            fault_location,
        }
    }

    pub fn new_no_error(config: PDUConfig, file_checksum: u32, file_size: u64) -> Self {
        Self::new(config, Condition::NoError, file_checksum, file_size, None)
    }
}
impl PDUEncode for EofPDU {
    fn header(&self) -> &PDUHeader {
        self.base.header()
    }

    fn pdu_data_field_len(&self) -> usize {
        //  directive code (1 byte)
        //  condition + spare (1 byte)
        //  checksum (4 bytes)
        //  file size (FSS)
        //  fault location (0 or TLV)
        1 + 1
            + 4
            + self.base.file_flag().encoded_len()
            + fault_location_len(&self.fault_location)
    }

    fn pack(&self) -> PDUResult<Vec<u8>> {
        let mut params = vec![(self.condition as u8) << 4];
        params.extend(self.file_checksum.to_be_bytes());
        write_fss_field(&mut params, self.base.file_flag(), self.file_size)?;
        if let Some(fault) = &self.fault_location {
            fault.to_tlv()?.write_to(&mut params);
        }
        self.base.pack_with(&params)
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let (base, params) = FileDirectivePDUBase::unpack(buffer, DirectiveType::EoF)?;
        let file_flag = base.file_flag();
        let fixed_len = 1 + 4 + file_flag.encoded_len();
        if params.len() < fixed_len {
            return Err(PDUError::BufferTooShort {
                expected: fixed_len,
                found: params.len(),
            });
        }

        let mut cursor = params;
        let condition = Condition::from_high_nibble(cursor.read_u8()?)?;
        let file_checksum = cursor.read_u32::<BigEndian>()?;
        let file_size = parse_fss_field(&mut cursor, file_flag)?;
        let fault_location = single_optional_tlv(cursor)?
            .map(|tlv| EntityIdTLV::from_tlv(&tlv))
            .transpose()?;

        Ok(Self {
            base,
            condition,
            file_checksum,
            file_size,
            fault_location,
        })
    }
}

/// Whether a Finished PDU with `condition` may carry a fault location.
pub fn might_have_fault_location(condition: Condition) -> bool {
    !matches!(
        condition,
        Condition::NoError | Condition::UnsupportedChecksumType
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Finished PDU, sent by the receiving entity once a transaction is complete.
pub struct FinishedPDU {
    base: FileDirectivePDUBase,
    condition: Condition,
    pub delivery_code: DeliveryCode,
    pub file_status: FileStatusCode,
    pub filestore_responses: Vec<FileStoreResponseTLV>,
    fault_location: Option<EntityIdTLV>,
}
impl FinishedPDU {
    pub fn new(
        mut config: PDUConfig,
        condition: Condition,
        delivery_code: DeliveryCode,
        file_status: FileStatusCode,
        filestore_responses: Vec<FileStoreResponseTLV>,
        fault_location: Option<EntityIdTLV>,
    ) -> PDUResult<Self> {
        config.direction = Direction::ToSender;
        let mut pdu = Self {
            base: FileDirectivePDUBase::new(config, DirectiveType::Finished),
            condition,
            delivery_code,
            file_status,
            filestore_responses,
            fault_location: None,
        };
        pdu.set_fault(condition, fault_location)?;
        Ok(pdu)
    }

    /// Data complete and retained, no error.
    pub fn success(config: PDUConfig) -> Self {
        let mut config = config;
        config.direction = Direction::ToSender;
        Self {
            base: FileDirectivePDUBase::new(config, DirectiveType::Finished),
            condition: Condition::NoError,
            delivery_code: DeliveryCode::Complete,
            file_status: FileStatusCode::Retained,
            filestore_responses: vec![],
            fault_location: None,
        }
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn fault_location(&self) -> Option<EntityIdTLV> {
        self.fault_location
    }

    /// Replace condition and fault location together. Leaves the PDU unchanged on error.
    pub fn set_fault(
        &mut self,
        condition: Condition,
        fault_location: Option<EntityIdTLV>,
    ) -> PDUResult<()> {
        if fault_location.is_some() && !might_have_fault_location(condition) {
            return Err(PDUError::FaultLocationNotAllowed(condition));
        }
        self.condition = condition;
        self.fault_location = fault_location;
        Ok(())
    }
}
impl PDUEncode for FinishedPDU {
    fn header(&self) -> &PDUHeader {
        self.base.header()
    }

    fn pdu_data_field_len(&self) -> usize {
        1 + 1
            + self
                .filestore_responses
                .iter()
                .map(FileStoreResponseTLV::encoded_len)
                .sum::<usize>()
            + fault_location_len(&self.fault_location)
    }

    fn pack(&self) -> PDUResult<Vec<u8>> {
        let mut params = vec![((self.condition as u8) << 4)
            | ((self.delivery_code as u8) << 2)
            | self.file_status as u8];
        for response in &self.filestore_responses {
            response.to_tlv()?.write_to(&mut params);
        }
        if let Some(fault) = &self.fault_location {
            fault.to_tlv()?.write_to(&mut params);
        }
        self.base.pack_with(&params)
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let (base, params) = FileDirectivePDUBase::unpack(buffer, DirectiveType::Finished)?;
        let mut cursor = params;
        let first_byte = read_byte(&mut cursor)?;
        let condition = Condition::from_high_nibble(first_byte)?;
        let delivery_code = {
            let possible = (first_byte >> 2) & 0b1;
            DeliveryCode::from_u8(possible).ok_or(PDUError::InvalidDeliveryCode(possible))?
        };
        let file_status = {
            let possible = first_byte & 0b11;
            FileStatusCode::from_u8(possible).ok_or(PDUError::InvalidFileStatus(possible))?
        };

        let mut filestore_responses = vec![];
        let mut fault_location = None;
        let mut parsed = 1;
        for tlv in unpack_tlv_list(cursor)? {
            // the fault location closes the list
            if fault_location.is_some() {
                return Err(PDUError::length_mismatch(1 + params.len(), 1 + parsed));
            }
            match tlv.tlv_type() {
                TLVType::FileStoreResponse => {
                    filestore_responses.push(FileStoreResponseTLV::from_tlv(&tlv)?)
                }
                TLVType::EntityID => fault_location = Some(EntityIdTLV::from_tlv(&tlv)?),
                found => {
                    return Err(PDUError::TLVTypeMismatch {
                        expected: TLVType::FileStoreResponse,
                        found,
                    })
                }
            }
            parsed += tlv.packet_len();
        }
        if fault_location.is_some() && !might_have_fault_location(condition) {
            return Err(PDUError::FaultLocationNotAllowed(condition));
        }

        Ok(Self {
            base,
            condition,
            delivery_code,
            file_status,
            filestore_responses,
            fault_location,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Positive acknowledgement of an EOF or Finished PDU.
pub struct AckPDU {
    base: FileDirectivePDUBase,
    acked_directive: DirectiveType,
    pub condition: Condition,
    pub transaction_status: TransactionStatus,
}
impl AckPDU {
    /// Acknowledgements of EOF travel toward the sender, of Finished toward the receiver.
    pub fn new(
        mut config: PDUConfig,
        acked_directive: DirectiveType,
        condition: Condition,
        transaction_status: TransactionStatus,
    ) -> PDUResult<Self> {
        config.direction = match acked_directive {
            DirectiveType::EoF => Direction::ToSender,
            DirectiveType::Finished => Direction::ToReceiver,
            other => return Err(PDUError::InvalidAckedDirective(other)),
        };
        Ok(Self {
            base: FileDirectivePDUBase::new(config, DirectiveType::Ack),
            acked_directive,
            condition,
            transaction_status,
        })
    }

    pub fn acked_directive(&self) -> DirectiveType {
        self.acked_directive
    }

    /// 0b0001 when acknowledging Finished, 0b0000 otherwise.
    pub fn directive_subtype_code(&self) -> u8 {
        match self.acked_directive {
            DirectiveType::Finished => 0b0001,
            _ => 0b0000,
        }
    }
}
impl PDUEncode for AckPDU {
    fn header(&self) -> &PDUHeader {
        self.base.header()
    }

    fn pdu_data_field_len(&self) -> usize {
        3
    }

    fn pack(&self) -> PDUResult<Vec<u8>> {
        self.base.pack_with(&[
            ((self.acked_directive as u8) << 4) | self.directive_subtype_code(),
            ((self.condition as u8) << 4) | self.transaction_status as u8,
        ])
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let (base, params) = FileDirectivePDUBase::unpack(buffer, DirectiveType::Ack)?;
        check_fixed_len(params, 2)?;

        let code = params[0] >> 4;
        let acked_directive =
            DirectiveType::from_u8(code).ok_or(PDUError::InvalidDirective(code))?;
        let subtype = params[0] & 0x0F;
        let expected_subtype = match acked_directive {
            DirectiveType::EoF => 0b0000,
            DirectiveType::Finished => 0b0001,
            other => return Err(PDUError::InvalidAckedDirective(other)),
        };
        if subtype != expected_subtype {
            return Err(PDUError::InvalidAckSubType(subtype, acked_directive));
        }

        let condition = Condition::from_high_nibble(params[1])?;
        let transaction_status = {
            let status = params[1] & 0b11;
            TransactionStatus::from_u8(status).ok_or(PDUError::InvalidTransactionStatus(status))?
        };
        Ok(Self {
            base,
            acked_directive,
            condition,
            transaction_status,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Metadata PDU opening a transaction.
pub struct MetadataPDU {
    base: FileDirectivePDUBase,
    pub closure_requested: bool,
    pub checksum_type: ChecksumType,
    pub file_size: u64,
    pub source_filename: LV,
    pub destination_filename: LV,
    /// Any of the TLVs allowed in metadata, kept in wire order.
    pub options: Vec<TLV>,
}
impl MetadataPDU {
    pub fn new(
        mut config: PDUConfig,
        closure_requested: bool,
        checksum_type: ChecksumType,
        file_size: u64,
        source_filename: LV,
        destination_filename: LV,
        options: Vec<TLV>,
    ) -> Self {
        config.direction = Direction::ToReceiver;
        Self {
            base: FileDirectivePDUBase::new(config, DirectiveType::Metadata),
            closure_requested,
            checksum_type,
            file_size,
            source_filename,
            destination_filename,
            options,
        }
    }

    pub fn add_option<T: TLVEncode>(&mut self, option: &T) -> PDUResult<()> {
        self.options.push(option.to_tlv()?);
        Ok(())
    }

    fn typed_options<T: TLVEncode>(&self) -> PDUResult<Vec<T>> {
        self.options
            .iter()
            .filter(|tlv| tlv.tlv_type() == T::TLV_TYPE)
            .map(T::from_tlv)
            .collect()
    }

    pub fn filestore_requests(&self) -> PDUResult<Vec<FileStoreRequestTLV>> {
        self.typed_options()
    }

    pub fn messages_to_user(&self) -> PDUResult<Vec<MessageToUserTLV>> {
        self.typed_options()
    }

    pub fn fault_handler_overrides(&self) -> PDUResult<Vec<FaultHandlerOverrideTLV>> {
        self.typed_options()
    }

    /// The first flow label option, if any.
    pub fn flow_label(&self) -> PDUResult<Option<FlowLabelTLV>> {
        Ok(self.typed_options()?.into_iter().next())
    }
}
impl PDUEncode for MetadataPDU {
    fn header(&self) -> &PDUHeader {
        self.base.header()
    }

    fn pdu_data_field_len(&self) -> usize {
        1 + 1
            + self.base.file_flag().encoded_len()
            + self.source_filename.packet_len()
            + self.destination_filename.packet_len()
            + self.options.iter().map(TLV::packet_len).sum::<usize>()
    }

    fn pack(&self) -> PDUResult<Vec<u8>> {
        let mut params = vec![((self.closure_requested as u8) << 6) | self.checksum_type as u8];
        write_fss_field(&mut params, self.base.file_flag(), self.file_size)?;
        self.source_filename.write_to(&mut params);
        self.destination_filename.write_to(&mut params);
        self.options
            .iter()
            .for_each(|option| option.write_to(&mut params));
        self.base.pack_with(&params)
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let (base, params) = FileDirectivePDUBase::unpack(buffer, DirectiveType::Metadata)?;
        let mut cursor = params;
        let first_byte = read_byte(&mut cursor)?;
        let closure_requested = (first_byte >> 6) & 0b1 == 1;
        let checksum_type = {
            let possible = first_byte & 0x0F;
            ChecksumType::from_u8(possible).ok_or(PDUError::InvalidChecksumType(possible))?
        };
        let file_size = parse_fss_field(&mut cursor, base.file_flag())?;

        let source_filename = LV::unpack(cursor)?;
        cursor = &cursor[source_filename.packet_len()..];
        let destination_filename = LV::unpack(cursor)?;
        cursor = &cursor[destination_filename.packet_len()..];
        let options = unpack_tlv_list(cursor)?;

        Ok(Self {
            base,
            closure_requested,
            checksum_type,
            file_size,
            source_filename,
            destination_filename,
            options,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Negative acknowledgement requesting retransmission of missing file segments.
pub struct NakPDU {
    base: FileDirectivePDUBase,
    pub start_of_scope: u64,
    pub end_of_scope: u64,
    /// Pairs of (start offset, end offset).
    pub segment_requests: Vec<(u64, u64)>,
}
impl NakPDU {
    pub fn new(
        mut config: PDUConfig,
        start_of_scope: u64,
        end_of_scope: u64,
        segment_requests: Vec<(u64, u64)>,
    ) -> Self {
        config.direction = Direction::ToSender;
        Self {
            base: FileDirectivePDUBase::new(config, DirectiveType::Nak),
            start_of_scope,
            end_of_scope,
            segment_requests,
        }
    }

    /// Number of segment requests fitting into a packet of `max_packet_len` bytes.
    pub fn max_segment_requests(&self, max_packet_len: usize) -> PDUResult<usize> {
        max_seg_reqs_for_max_packet_len(&self.base.header().config, max_packet_len)
    }
}

/// Number of segment requests a NAK built with `config` can carry within
/// `max_packet_len` bytes.
pub fn max_seg_reqs_for_max_packet_len(
    config: &PDUConfig,
    max_packet_len: usize,
) -> PDUResult<usize> {
    let fss = config.file_flag.encoded_len();
    let base_len = config.header_len() + 1 + 2 * fss + config.crc_len();
    if max_packet_len < base_len {
        return Err(PDUError::BufferTooShort {
            expected: base_len,
            found: max_packet_len,
        });
    }
    Ok((max_packet_len - base_len) / (2 * fss))
}

impl PDUEncode for NakPDU {
    fn header(&self) -> &PDUHeader {
        self.base.header()
    }

    fn pdu_data_field_len(&self) -> usize {
        let fss = self.base.file_flag().encoded_len();
        1 + 2 * fss + 2 * fss * self.segment_requests.len()
    }

    fn pack(&self) -> PDUResult<Vec<u8>> {
        let file_flag = self.base.file_flag();
        let mut params = vec![];
        write_fss_field(&mut params, file_flag, self.start_of_scope)?;
        write_fss_field(&mut params, file_flag, self.end_of_scope)?;
        for (start, end) in &self.segment_requests {
            write_fss_field(&mut params, file_flag, *start)?;
            write_fss_field(&mut params, file_flag, *end)?;
        }
        self.base.pack_with(&params)
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let (base, params) = FileDirectivePDUBase::unpack(buffer, DirectiveType::Nak)?;
        let file_flag = base.file_flag();
        let mut cursor = params;
        let start_of_scope = parse_fss_field(&mut cursor, file_flag)?;
        let end_of_scope = parse_fss_field(&mut cursor, file_flag)?;

        if cursor.len() % (2 * file_flag.encoded_len()) != 0 {
            return Err(PDUError::InvalidSegmentRequests(cursor.len()));
        }
        let mut segment_requests = vec![];
        while !cursor.is_empty() {
            let start = parse_fss_field(&mut cursor, file_flag)?;
            let end = parse_fss_field(&mut cursor, file_flag)?;
            segment_requests.push((start, end));
        }

        Ok(Self {
            base,
            start_of_scope,
            end_of_scope,
            segment_requests,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Asks the receiver for a NAK or a Keep Alive.
pub struct PromptPDU {
    base: FileDirectivePDUBase,
    pub response_required: NakOrKeepAlive,
}
impl PromptPDU {
    pub fn new(mut config: PDUConfig, response_required: NakOrKeepAlive) -> Self {
        config.direction = Direction::ToReceiver;
        Self {
            base: FileDirectivePDUBase::new(config, DirectiveType::Prompt),
            response_required,
        }
    }
}
impl PDUEncode for PromptPDU {
    fn header(&self) -> &PDUHeader {
        self.base.header()
    }

    fn pdu_data_field_len(&self) -> usize {
        2
    }

    fn pack(&self) -> PDUResult<Vec<u8>> {
        self.base
            .pack_with(&[(self.response_required as u8) << 7])
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let (base, params) = FileDirectivePDUBase::unpack(buffer, DirectiveType::Prompt)?;
        check_fixed_len(params, 1)?;
        let possible = params[0] >> 7;
        let response_required =
            NakOrKeepAlive::from_u8(possible).ok_or(PDUError::InvalidPrompt(possible))?;
        Ok(Self {
            base,
            response_required,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Reports the receiver's progress in acknowledged mode.
pub struct KeepAlivePDU {
    base: FileDirectivePDUBase,
    pub progress: u64,
}
impl KeepAlivePDU {
    pub fn new(mut config: PDUConfig, progress: u64) -> Self {
        config.direction = Direction::ToSender;
        Self {
            base: FileDirectivePDUBase::new(config, DirectiveType::KeepAlive),
            progress,
        }
    }
}
impl PDUEncode for KeepAlivePDU {
    fn header(&self) -> &PDUHeader {
        self.base.header()
    }

    fn pdu_data_field_len(&self) -> usize {
        1 + self.base.file_flag().encoded_len()
    }

    fn pack(&self) -> PDUResult<Vec<u8>> {
        let mut params = vec![];
        write_fss_field(&mut params, self.base.file_flag(), self.progress)?;
        self.base.pack_with(&params)
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let (base, params) = FileDirectivePDUBase::unpack(buffer, DirectiveType::KeepAlive)?;
        let file_flag = base.file_flag();
        check_fixed_len(params, file_flag.encoded_len())?;
        let mut cursor = params;
        let progress = parse_fss_field(&mut cursor, file_flag)?;
        Ok(Self { base, progress })
    }
}

impl_directive_accessors!(
    EofPDU,
    FinishedPDU,
    AckPDU,
    MetadataPDU,
    NakPDU,
    PromptPDU,
    KeepAlivePDU
);

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        assert_err,
        pdu::{
            CRCFlag, FileSizeFlag, FileStoreAction, HandlerCode, PDUFactory, PDUKind, PDUType,
            ReservedCFDPMessage, SegmentedData, TransmissionMode, CRC_LEN,
        },
        util::UnsignedByteField,
    };

    use rstest::{fixture, rstest};

    #[fixture]
    fn config() -> PDUConfig {
        PDUConfig::new(
            UnsignedByteField::from(2_u16),
            UnsignedByteField::from(3_u16),
            UnsignedByteField::from(1_u16),
            TransmissionMode::Acknowledged,
        )
        .unwrap()
    }

    fn assert_length_invariant<T: PDUEncode>(pdu: &T, buffer: &[u8]) {
        let declared = u16::from_be_bytes([buffer[1], buffer[2]]) as usize;
        assert_eq!(pdu.pdu_data_field_len(), declared);
        assert_eq!(pdu.packet_len(), buffer.len());
        assert_eq!(
            buffer.len() - pdu.header().header_len() - pdu.header().config.crc_len(),
            declared
        );
    }

    #[rstest]
    fn ack_of_finished(config: PDUConfig) -> PDUResult<()> {
        let ack = AckPDU::new(
            config,
            DirectiveType::Finished,
            Condition::NoError,
            TransactionStatus::Terminated,
        )?;
        let buffer = ack.pack()?;
        assert_eq!(
            vec![0x20, 0x00, 0x03, 0x22, 0x00, 0x02, 0x00, 0x01, 0x00, 0x03, 0x06, 0x51, 0x02],
            buffer
        );
        assert_eq!(Direction::ToReceiver, ack.header().direction());
        assert_eq!(2, ack.directive_param_field_len());
        assert_eq!(ack, AckPDU::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn ack_of_eof(config: PDUConfig) -> PDUResult<()> {
        let ack = AckPDU::new(
            config,
            DirectiveType::EoF,
            Condition::CancelReceived,
            TransactionStatus::Active,
        )?;
        assert_eq!(Direction::ToSender, ack.header().direction());
        assert_eq!(0, ack.directive_subtype_code());
        let buffer = ack.pack()?;
        assert_eq!(&[0x06, 0x40, 0xf1], &buffer[10..]);
        assert_eq!(ack, AckPDU::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn ack_of_other_directive(
        config: PDUConfig,
        #[values(
            DirectiveType::Ack,
            DirectiveType::Metadata,
            DirectiveType::Nak,
            DirectiveType::Prompt,
            DirectiveType::KeepAlive
        )]
        acked: DirectiveType,
    ) {
        assert_err!(
            AckPDU::new(config, acked, Condition::NoError, TransactionStatus::Active),
            Err(PDUError::InvalidAckedDirective(found)) if found == acked
        );
    }

    #[rstest]
    fn ack_bad_subtype(config: PDUConfig) -> PDUResult<()> {
        let mut buffer = AckPDU::new(
            config,
            DirectiveType::EoF,
            Condition::NoError,
            TransactionStatus::Active,
        )?
        .pack()?;
        buffer[11] = 0x41;
        assert_err!(
            AckPDU::unpack(&buffer),
            Err(PDUError::InvalidAckSubType(0x01, DirectiveType::EoF))
        );
        Ok(())
    }

    #[test]
    fn eof_lengths() -> PDUResult<()> {
        let mut eof = EofPDU::new_no_error(PDUConfig::default(), 0, 0);
        let buffer = eof.pack()?;
        assert_eq!(17, buffer.len());
        assert_length_invariant(&eof, &buffer);

        eof.condition = Condition::FileChecksumFailure;
        eof.fault_location = Some(EntityIdTLV::new(UnsignedByteField::from(5_u16)));
        let with_fault = eof.pack()?;
        assert_eq!(21, with_fault.len());
        assert_eq!(&[0x06, 0x02, 0x00, 0x05], &with_fault[17..]);
        assert_length_invariant(&eof, &with_fault);
        assert_eq!(eof, EofPDU::unpack(&with_fault)?);
        Ok(())
    }

    #[rstest]
    fn eof_round_trip(
        config: PDUConfig,
        #[values(CRCFlag::NotPresent, CRCFlag::Present)] crc_flag: CRCFlag,
        #[values(FileSizeFlag::Small, FileSizeFlag::Large)] file_flag: FileSizeFlag,
    ) -> PDUResult<()> {
        let expected = EofPDU::new(
            config.with_crc_flag(crc_flag).with_file_flag(file_flag),
            Condition::PositiveLimitReached,
            0xdead_beef,
            u32::MAX as u64,
            Some(EntityIdTLV::new(UnsignedByteField::from(2_u16))),
        );
        let buffer = expected.pack()?;
        assert_length_invariant(&expected, &buffer);
        let recovered = EofPDU::unpack(&buffer)?;
        assert_eq!(expected, recovered);
        assert_eq!(buffer, recovered.pack()?);
        Ok(())
    }

    #[rstest]
    fn eof_large_file_without_flag(config: PDUConfig) {
        let eof = EofPDU::new_no_error(config, 0, u32::MAX as u64 + 1);
        assert_err!(eof.pack(), Err(PDUError::FileSizeTooLarge(_)));
    }

    #[rstest]
    fn eof_trailing_tlvs(config: PDUConfig) -> PDUResult<()> {
        let eof = EofPDU::new_no_error(config.clone(), 0, 0);
        let mut params = eof.pack()?[11..].to_vec();
        params.extend([0x06, 0x01, 0x02, 0x06, 0x01, 0x03]);
        let buffer = PDUHeader::new_for_file_directive(config)
            .pack_with_data_field(PDUType::FileDirective, &[vec![0x04], params].concat())?;
        assert_err!(
            EofPDU::unpack(&buffer),
            Err(PDUError::DataFieldLengthMismatch { .. })
        );
        Ok(())
    }

    #[rstest]
    fn unknown_directive_code(config: PDUConfig) -> PDUResult<()> {
        let mut buffer = EofPDU::new_no_error(config, 0, 0).pack()?;
        buffer[10] = 0x00;
        assert_err!(EofPDU::unpack(&buffer), Err(PDUError::InvalidDirective(0x00)));
        Ok(())
    }

    #[rstest]
    fn wrong_pdu(config: PDUConfig) -> PDUResult<()> {
        let buffer = KeepAlivePDU::new(config, 0).pack()?;
        assert_err!(
            EofPDU::unpack(&buffer),
            Err(PDUError::UnexpectedDirective {
                expected: DirectiveType::EoF,
                found: DirectiveType::KeepAlive
            })
        );
        Ok(())
    }

    #[rstest]
    fn finished_round_trip(
        config: PDUConfig,
        #[values(CRCFlag::NotPresent, CRCFlag::Present)] crc_flag: CRCFlag,
    ) -> PDUResult<()> {
        let responses = vec![
            FileStoreResponseTLV::new(
                FileStoreAction::RenameFile,
                0b0000,
                "/old.txt",
                "/new.txt",
                vec![],
            )?,
            FileStoreResponseTLV::new(
                FileStoreAction::DeleteFile,
                0b0001,
                "/gone.txt",
                "",
                b"missing".to_vec(),
            )?,
        ];
        let expected = FinishedPDU::new(
            config.with_crc_flag(crc_flag),
            Condition::FilestoreRejection,
            DeliveryCode::Incomplete,
            FileStatusCode::FilestoreRejection,
            responses,
            Some(EntityIdTLV::new(UnsignedByteField::from(3_u16))),
        )?;
        assert_eq!(Direction::ToSender, expected.header().direction());
        let buffer = expected.pack()?;
        assert_length_invariant(&expected, &buffer);
        assert_eq!(0x45, buffer[11]);
        assert_eq!(expected, FinishedPDU::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn finished_success(config: PDUConfig) -> PDUResult<()> {
        let finished = FinishedPDU::success(config);
        let buffer = finished.pack()?;
        assert_eq!(12, buffer.len());
        assert_eq!(&[0x05, 0x02], &buffer[10..]);
        assert_eq!(finished, FinishedPDU::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn finished_fault_location_not_allowed(
        config: PDUConfig,
        #[values(Condition::NoError, Condition::UnsupportedChecksumType)] condition: Condition,
    ) -> PDUResult<()> {
        let fault = Some(EntityIdTLV::new(UnsignedByteField::from(3_u16)));
        assert_err!(
            FinishedPDU::new(
                config.clone(),
                condition,
                DeliveryCode::Complete,
                FileStatusCode::Retained,
                vec![],
                fault,
            ),
            Err(PDUError::FaultLocationNotAllowed(_))
        );

        let mut finished = FinishedPDU::success(config.clone());
        assert!(finished.set_fault(condition, fault).is_err());
        assert_eq!(Condition::NoError, finished.condition());
        assert!(finished.fault_location().is_none());

        let buffer = PDUHeader::new_for_file_directive(config)
            .pack_with_data_field(
                PDUType::FileDirective,
                &[0x05, (condition as u8) << 4, 0x06, 0x02, 0x00, 0x03],
            )?;
        assert_err!(
            FinishedPDU::unpack(&buffer),
            Err(PDUError::FaultLocationNotAllowed(_))
        );
        Ok(())
    }

    #[rstest]
    fn finished_unexpected_tlv(config: PDUConfig) -> PDUResult<()> {
        let buffer = PDUHeader::new_for_file_directive(config)
            .pack_with_data_field(PDUType::FileDirective, &[0x05, 0x00, 0x05, 0x01, 0xaa])?;
        assert_err!(
            FinishedPDU::unpack(&buffer),
            Err(PDUError::TLVTypeMismatch {
                expected: TLVType::FileStoreResponse,
                found: TLVType::FlowLabel
            })
        );
        Ok(())
    }

    #[rstest]
    fn metadata_round_trip(
        config: PDUConfig,
        #[values(CRCFlag::NotPresent, CRCFlag::Present)] crc_flag: CRCFlag,
        #[values(FileSizeFlag::Small, FileSizeFlag::Large)] file_flag: FileSizeFlag,
        #[values(ChecksumType::Modular, ChecksumType::Crc32C, ChecksumType::Null)]
        checksum_type: ChecksumType,
    ) -> PDUResult<()> {
        let mut expected = MetadataPDU::new(
            config.with_crc_flag(crc_flag).with_file_flag(file_flag),
            true,
            checksum_type,
            1024,
            "/local/source.dat".parse()?,
            "/remote/destination.dat".parse()?,
            vec![],
        );
        expected.add_option(&FileStoreRequestTLV::new(
            FileStoreAction::CreateDirectory,
            "/remote",
            "",
        ))?;
        expected.add_option(&MessageToUserTLV::new(b"hello".to_vec()))?;
        expected.add_option(&FaultHandlerOverrideTLV::new(
            Condition::InactivityDetected,
            HandlerCode::AbandonTransaction,
        ))?;
        expected.add_option(&FlowLabelTLV {
            value: vec![0x01],
        })?;

        let buffer = expected.pack()?;
        assert_length_invariant(&expected, &buffer);
        assert_eq!(0x40 | checksum_type as u8, buffer[11]);
        let recovered = MetadataPDU::unpack(&buffer)?;
        assert_eq!(expected, recovered);

        assert_eq!(1, recovered.filestore_requests()?.len());
        assert_eq!(
            vec![MessageToUserTLV::new(b"hello".to_vec())],
            recovered.messages_to_user()?
        );
        assert_eq!(
            HandlerCode::AbandonTransaction,
            recovered.fault_handler_overrides()?[0].handler_code
        );
        assert_eq!(Some(vec![0x01]), recovered.flow_label()?.map(|label| label.value));
        Ok(())
    }

    #[rstest]
    fn metadata_reserved_message(config: PDUConfig) -> PDUResult<()> {
        let mut metadata = MetadataPDU::new(
            config,
            false,
            ChecksumType::Null,
            0,
            LV::default(),
            LV::default(),
            vec![],
        );
        metadata.add_option(&ReservedCFDPMessage::proxy_closure_request(true))?;
        let recovered = MetadataPDU::unpack(&metadata.pack()?)?;
        let messages = recovered.messages_to_user()?;
        assert!(messages[0].is_reserved_cfdp_message());
        Ok(())
    }

    #[rstest]
    fn metadata_invalid_checksum(config: PDUConfig) -> PDUResult<()> {
        let mut buffer = MetadataPDU::new(
            config,
            false,
            ChecksumType::Null,
            0,
            LV::default(),
            LV::default(),
            vec![],
        )
        .pack()?;
        buffer[11] = 0x07;
        assert_err!(
            MetadataPDU::unpack(&buffer),
            Err(PDUError::InvalidChecksumType(0x07))
        );
        Ok(())
    }

    #[rstest]
    fn nak_round_trip(
        config: PDUConfig,
        #[values(CRCFlag::NotPresent, CRCFlag::Present)] crc_flag: CRCFlag,
        #[values(FileSizeFlag::Small, FileSizeFlag::Large)] file_flag: FileSizeFlag,
    ) -> PDUResult<()> {
        let expected = NakPDU::new(
            config.with_crc_flag(crc_flag).with_file_flag(file_flag),
            0,
            4096,
            vec![(0, 512), (1024, 2048)],
        );
        assert_eq!(Direction::ToSender, expected.header().direction());
        let buffer = expected.pack()?;
        assert_length_invariant(&expected, &buffer);
        assert_eq!(expected, NakPDU::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn nak_partial_segment_request(config: PDUConfig) -> PDUResult<()> {
        let buffer = PDUHeader::new_for_file_directive(config).pack_with_data_field(
            PDUType::FileDirective,
            &[0x08, 0, 0, 0, 0, 0, 0, 0x10, 0, 0, 0, 0, 0],
        )?;
        assert_err!(
            NakPDU::unpack(&buffer),
            Err(PDUError::InvalidSegmentRequests(4))
        );
        Ok(())
    }

    #[rstest]
    #[case(FileSizeFlag::Small, CRCFlag::NotPresent, 100, 10)]
    #[case(FileSizeFlag::Small, CRCFlag::Present, 100, 10)]
    #[case(FileSizeFlag::Large, CRCFlag::NotPresent, 100, 4)]
    #[case(FileSizeFlag::Small, CRCFlag::NotPresent, 16, 0)]
    fn nak_max_segment_requests(
        #[case] file_flag: FileSizeFlag,
        #[case] crc_flag: CRCFlag,
        #[case] max_packet_len: usize,
        #[case] expected: usize,
    ) -> PDUResult<()> {
        let config = PDUConfig::default()
            .with_file_flag(file_flag)
            .with_crc_flag(crc_flag);
        assert_eq!(
            expected,
            max_seg_reqs_for_max_packet_len(&config, max_packet_len)?
        );

        let nak = NakPDU::new(config, 0, 0, vec![(0, 1); expected]);
        assert_eq!(expected, nak.max_segment_requests(max_packet_len)?);
        assert!(nak.packet_len() <= max_packet_len);
        Ok(())
    }

    #[test]
    fn nak_max_packet_too_small() {
        assert_err!(
            max_seg_reqs_for_max_packet_len(&PDUConfig::default(), 15),
            Err(PDUError::BufferTooShort {
                expected: 16,
                found: 15
            })
        );
    }

    #[rstest]
    fn prompt_round_trip(
        config: PDUConfig,
        #[values(NakOrKeepAlive::Nak, NakOrKeepAlive::KeepAlive)] response: NakOrKeepAlive,
    ) -> PDUResult<()> {
        let expected = PromptPDU::new(config, response);
        let buffer = expected.pack()?;
        assert_eq!(12, buffer.len());
        assert_eq!((response as u8) << 7, buffer[11]);
        assert_eq!(expected, PromptPDU::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn prompt_wrong_length(config: PDUConfig) -> PDUResult<()> {
        let buffer = PDUHeader::new_for_file_directive(config)
            .pack_with_data_field(PDUType::FileDirective, &[0x09, 0x80, 0x00])?;
        assert_err!(
            PromptPDU::unpack(&buffer),
            Err(PDUError::DataFieldLengthMismatch {
                declared: 3,
                parsed: 2
            })
        );
        Ok(())
    }

    #[test]
    fn keep_alive_lengths() -> PDUResult<()> {
        let mut keep_alive = KeepAlivePDU::new(PDUConfig::default(), 0);
        let buffer = keep_alive.pack()?;
        assert_eq!(12, buffer.len());
        assert_length_invariant(&keep_alive, &buffer);

        keep_alive.progress = (1_u64 << 32) + 1;
        assert_err!(keep_alive.pack(), Err(PDUError::FileSizeTooLarge(_)));

        keep_alive.header_mut().config.file_flag = FileSizeFlag::Large;
        let buffer = keep_alive.pack()?;
        assert_eq!(16, buffer.len());
        assert_eq!(keep_alive, KeepAlivePDU::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn keep_alive_crc(config: PDUConfig) -> PDUResult<()> {
        let keep_alive = KeepAlivePDU::new(config.with_crc_flag(CRCFlag::Present), 77);
        let mut buffer = keep_alive.pack()?;
        assert_eq!(10 + 1 + 4 + CRC_LEN, buffer.len());
        assert_eq!(keep_alive, KeepAlivePDU::unpack(&buffer)?);

        buffer[12] ^= 0x01;
        assert_err!(
            KeepAlivePDU::unpack(&buffer),
            Err(PDUError::CRCFailure { .. })
        );
        Ok(())
    }

    #[rstest]
    fn keep_alive_wrong_length(config: PDUConfig) -> PDUResult<()> {
        let buffer = PDUHeader::new_for_file_directive(config)
            .pack_with_data_field(PDUType::FileDirective, &[0x0C, 0x00, 0x00, 0x01])?;
        assert_err!(
            KeepAlivePDU::unpack(&buffer),
            Err(PDUError::DataFieldLengthMismatch { .. })
        );
        Ok(())
    }

    #[rstest]
    fn entity_width_change_repacks(config: PDUConfig) -> PDUResult<()> {
        let mut eof = EofPDU::new_no_error(config, 1, 2);
        let before = eof.pack()?.len();
        eof.header_mut()
            .set_entity_ids(UnsignedByteField::from(2_u32), UnsignedByteField::from(3_u32))?;
        let buffer = eof.pack()?;
        assert_eq!(before + 4, buffer.len());
        assert_eq!(eof, EofPDU::unpack(&buffer)?);
        Ok(())
    }

    #[rstest]
    fn replaced_header_keeps_directive_type(config: PDUConfig) -> PDUResult<()> {
        let mut eof = EofPDU::new_no_error(config.clone(), 1, 2);
        *eof.header_mut() = PDUHeader::new_for_file_data(config, SegmentedData::NotPresent);
        let buffer = eof.pack()?;
        assert_eq!(0, buffer[0] & 0x10);

        let recovered = EofPDU::unpack(&buffer)?;
        assert_eq!(PDUType::FileDirective, recovered.header().pdu_type());
        assert_eq!(eof.file_checksum, recovered.file_checksum);
        assert_eq!(PDUKind::EoF, PDUFactory::from_raw(&buffer)?.kind());
        Ok(())
    }
}
