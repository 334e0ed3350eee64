use camino::Utf8PathBuf;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use super::{
    error::{PDUError, PDUResult},
    header::{Condition, DeliveryCode, FileStatusCode, TransmissionMode},
    lv::LV,
    tlv::{impl_try_from_tlv, TLVEncode, TLVType, TLV},
};
use crate::util::{EntityID, TransactionId, UnsignedByteField};

/// Leading bytes identifying the standard proxy and directory operation messages.
pub const RESERVED_MESSAGE_MARKER: &[u8] = b"cfdp";
pub const ORIGINATING_TRANSACTION_ID_MESSAGE: u8 = 0x0A;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum ProxyMessageType {
    PutRequest = 0x00,
    MessageToUser = 0x01,
    FilestoreRequest = 0x02,
    FaultHandlerOverride = 0x03,
    TransmissionMode = 0x04,
    FlowLabel = 0x05,
    SegmentationControl = 0x06,
    PutResponse = 0x07,
    FilestoreResponse = 0x08,
    PutCancel = 0x09,
    ClosureRequest = 0x0B,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum DirectoryOperationMessageType {
    ListingRequest = 0x10,
    ListingResponse = 0x11,
    /// Not part of the standard. Carries the recursive and all listing options.
    CustomListingParameters = 0x15,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageToUserTLV {
    pub value: Vec<u8>,
}
impl MessageToUserTLV {
    pub fn new(value: Vec<u8>) -> Self {
        Self { value }
    }

    pub fn is_reserved_cfdp_message(&self) -> bool {
        self.value.len() > RESERVED_MESSAGE_MARKER.len()
            && self.value.starts_with(RESERVED_MESSAGE_MARKER)
    }

    pub fn to_reserved_msg(&self) -> Option<ReservedCFDPMessage> {
        match self.is_reserved_cfdp_message() {
            true => Some(ReservedCFDPMessage {
                message_type: self.value[4],
                payload: self.value[5..].to_vec(),
            }),
            false => None,
        }
    }
}
impl TLVEncode for MessageToUserTLV {
    const TLV_TYPE: TLVType = TLVType::MessageToUser;

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

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyPutRequestParams {
    pub destination_entity_id: EntityID,
    pub source_filename: Utf8PathBuf,
    pub destination_filename: Utf8PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyPutResponseParams {
    pub condition: Condition,
    pub delivery_code: DeliveryCode,
    pub file_status: FileStatusCode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryParams {
    pub directory: Utf8PathBuf,
    /// File the listing is written to.
    pub listing_filename: Utf8PathBuf,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirListingOptions {
    pub recursive: bool,
    pub all: bool,
}

/// A message to user starting with the `cfdp` marker, followed by the message type
/// and a type specific payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReservedCFDPMessage {
    message_type: u8,
    payload: Vec<u8>,
}
impl ReservedCFDPMessage {
    pub fn new(message_type: u8, payload: Vec<u8>) -> Self {
        Self {
            message_type,
            payload,
        }
    }

    pub fn proxy_put_request(params: &ProxyPutRequestParams) -> PDUResult<Self> {
        let mut payload = vec![];
        LV::new(params.destination_entity_id.to_be_bytes())?.write_to(&mut payload);
        LV::from_path(&params.source_filename)?.write_to(&mut payload);
        LV::from_path(&params.destination_filename)?.write_to(&mut payload);
        Ok(Self::new(ProxyMessageType::PutRequest as u8, payload))
    }

    pub fn proxy_put_response(params: &ProxyPutResponseParams) -> Self {
        let byte = ((params.condition as u8) << 4)
            | ((params.delivery_code as u8) << 2)
            | params.file_status as u8;
        Self::new(ProxyMessageType::PutResponse as u8, vec![byte])
    }

    pub fn proxy_put_cancel() -> Self {
        Self::new(ProxyMessageType::PutCancel as u8, vec![])
    }

    pub fn proxy_closure_request(closure_requested: bool) -> Self {
        Self::new(
            ProxyMessageType::ClosureRequest as u8,
            vec![closure_requested as u8],
        )
    }

    pub fn proxy_transmission_mode(mode: TransmissionMode) -> Self {
        Self::new(ProxyMessageType::TransmissionMode as u8, vec![mode as u8])
    }

    /// Width codes in this message are `width - 1`, unlike the PDU header.
    pub fn originating_transaction_id(id: &TransactionId) -> PDUResult<Self> {
        for field in [id.source_id, id.seq_num] {
            if !matches!(field.width(), 1 | 2 | 4 | 8) {
                return Err(PDUError::InvalidByteFieldWidth(field.width()));
            }
        }
        let mut payload =
            vec![(((id.source_id.width() - 1) << 4) | (id.seq_num.width() - 1)) as u8];
        id.source_id.write_be(&mut payload);
        id.seq_num.write_be(&mut payload);
        Ok(Self::new(ORIGINATING_TRANSACTION_ID_MESSAGE, payload))
    }

    pub fn directory_listing_request(params: &DirectoryParams) -> PDUResult<Self> {
        let mut payload = vec![];
        LV::from_path(&params.directory)?.write_to(&mut payload);
        LV::from_path(&params.listing_filename)?.write_to(&mut payload);
        Ok(Self::new(
            DirectoryOperationMessageType::ListingRequest as u8,
            payload,
        ))
    }

    pub fn directory_listing_response(
        listing_success: bool,
        params: &DirectoryParams,
    ) -> PDUResult<Self> {
        let mut payload = vec![(listing_success as u8) << 7];
        LV::from_path(&params.directory)?.write_to(&mut payload);
        LV::from_path(&params.listing_filename)?.write_to(&mut payload);
        Ok(Self::new(
            DirectoryOperationMessageType::ListingResponse as u8,
            payload,
        ))
    }

    pub fn directory_listing_options(options: DirListingOptions) -> Self {
        Self::new(
            DirectoryOperationMessageType::CustomListingParameters as u8,
            vec![((options.recursive as u8) << 1) | options.all as u8],
        )
    }

    pub fn message_type(&self) -> u8 {
        self.message_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn proxy_message_type(&self) -> Option<ProxyMessageType> {
        ProxyMessageType::from_u8(self.message_type)
    }

    pub fn directory_operation_type(&self) -> Option<DirectoryOperationMessageType> {
        DirectoryOperationMessageType::from_u8(self.message_type)
    }

    pub fn is_cfdp_proxy_operation(&self) -> bool {
        self.proxy_message_type().is_some()
    }

    pub fn is_directory_operation(&self) -> bool {
        self.directory_operation_type().is_some()
    }

    pub fn is_originating_transaction_id(&self) -> bool {
        self.message_type == ORIGINATING_TRANSACTION_ID_MESSAGE
    }

    pub fn to_msg_to_user(&self) -> MessageToUserTLV {
        let mut value = RESERVED_MESSAGE_MARKER.to_vec();
        value.push(self.message_type);
        value.extend_from_slice(&self.payload);
        MessageToUserTLV { value }
    }

    fn first_payload_byte(&self) -> PDUResult<u8> {
        self.payload
            .first()
            .copied()
            .ok_or(PDUError::InvalidReservedMessage(self.message_type))
    }

    pub fn proxy_put_request_params(&self) -> PDUResult<Option<ProxyPutRequestParams>> {
        if self.proxy_message_type() != Some(ProxyMessageType::PutRequest) {
            return Ok(None);
        }
        let destination_lv = LV::unpack(&self.payload)?;
        let mut index = destination_lv.packet_len();
        let source_lv = LV::unpack(&self.payload[index..])?;
        index += source_lv.packet_len();
        let destination_name_lv = LV::unpack(&self.payload[index..])?;
        Ok(Some(ProxyPutRequestParams {
            destination_entity_id: UnsignedByteField::from_be_bytes(
                destination_lv.len(),
                destination_lv.value(),
            )?,
            source_filename: source_lv.to_path()?,
            destination_filename: destination_name_lv.to_path()?,
        }))
    }

    pub fn proxy_put_response_params(&self) -> PDUResult<Option<ProxyPutResponseParams>> {
        if self.proxy_message_type() != Some(ProxyMessageType::PutResponse) {
            return Ok(None);
        }
        let byte = self.first_payload_byte()?;
        let possible = (byte >> 2) & 0b1;
        let delivery_code =
            DeliveryCode::from_u8(possible).ok_or(PDUError::InvalidDeliveryCode(possible))?;
        let file_status = FileStatusCode::from_u8(byte & 0b11)
            .ok_or(PDUError::InvalidReservedMessage(self.message_type))?;
        Ok(Some(ProxyPutResponseParams {
            condition: Condition::from_high_nibble(byte)?,
            delivery_code,
            file_status,
        }))
    }

    pub fn proxy_closure_requested(&self) -> PDUResult<Option<bool>> {
        if self.proxy_message_type() != Some(ProxyMessageType::ClosureRequest) {
            return Ok(None);
        }
        Ok(Some(self.first_payload_byte()? & 0b1 == 1))
    }

    pub fn transmission_mode_param(&self) -> PDUResult<Option<TransmissionMode>> {
        if self.proxy_message_type() != Some(ProxyMessageType::TransmissionMode) {
            return Ok(None);
        }
        let possible = self.first_payload_byte()? & 0b1;
        TransmissionMode::from_u8(possible)
            .map(Some)
            .ok_or(PDUError::InvalidTransmissionMode(possible))
    }

    pub fn originating_id(&self) -> PDUResult<Option<TransactionId>> {
        if !self.is_originating_transaction_id() {
            return Ok(None);
        }
        let byte = self.first_payload_byte()?;
        let source_width = (((byte >> 4) & 0b111) + 1) as usize;
        let seq_width = ((byte & 0b111) + 1) as usize;
        let fields = &self.payload[1..];
        if fields.len() < source_width + seq_width {
            return Err(PDUError::BufferTooShort {
                expected: source_width + seq_width,
                found: fields.len(),
            });
        }
        Ok(Some(TransactionId::new(
            UnsignedByteField::from_be_bytes(source_width, fields)?,
            UnsignedByteField::from_be_bytes(seq_width, &fields[source_width..])?,
        )))
    }

    fn read_directory_params(buffer: &[u8]) -> PDUResult<DirectoryParams> {
        let directory = LV::unpack(buffer)?;
        let listing_filename = LV::unpack(&buffer[directory.packet_len()..])?;
        Ok(DirectoryParams {
            directory: directory.to_path()?,
            listing_filename: listing_filename.to_path()?,
        })
    }

    pub fn directory_listing_request_params(&self) -> PDUResult<Option<DirectoryParams>> {
        if self.directory_operation_type() != Some(DirectoryOperationMessageType::ListingRequest) {
            return Ok(None);
        }
        Self::read_directory_params(&self.payload).map(Some)
    }

    /// The flag reports whether the responding entity produced the listing.
    pub fn directory_listing_response_params(&self) -> PDUResult<Option<(bool, DirectoryParams)>> {
        if self.directory_operation_type() != Some(DirectoryOperationMessageType::ListingResponse)
        {
            return Ok(None);
        }
        let listing_success = (self.first_payload_byte()? >> 7) & 0b1 == 1;
        let params = Self::read_directory_params(&self.payload[1..])?;
        Ok(Some((listing_success, params)))
    }

    pub fn listing_options(&self) -> PDUResult<Option<DirListingOptions>> {
        if self.directory_operation_type()
            != Some(DirectoryOperationMessageType::CustomListingParameters)
        {
            return Ok(None);
        }
        let byte = self.first_payload_byte()?;
        Ok(Some(DirListingOptions {
            recursive: (byte >> 1) & 0b1 == 1,
            all: byte & 0b1 == 1,
        }))
    }
}
impl TLVEncode for ReservedCFDPMessage {
    const TLV_TYPE: TLVType = TLVType::MessageToUser;

    fn to_tlv(&self) -> PDUResult<TLV> {
        self.to_msg_to_user().to_tlv()
    }

    fn from_tlv(tlv: &TLV) -> PDUResult<Self> {
        MessageToUserTLV::from_tlv(tlv)?
            .to_reserved_msg()
            .ok_or(PDUError::NotReservedMessage)
    }
}
impl_try_from_tlv!(MessageToUserTLV, ReservedCFDPMessage);
