use std::str::Utf8Error;

use log::warn;
use thiserror::Error;

use super::{
    factory::PDUKind, file_directive::DirectiveType, filestore::FileStoreAction, header::Condition,
    tlv::TLVType,
};

#[derive(Error, Debug)]
pub enum PDUError {
    #[error("Invalid byte width {0} for an unsigned field. Must be one of 0, 1, 2, 4, 8.")]
    InvalidByteFieldWidth(usize),

    #[error("Value {value} does not fit into {width} byte(s).")]
    ValueTooLarge { value: u64, width: usize },

    #[error("File size {0} does not fit into a 32 bit field without the large file flag.")]
    FileSizeTooLarge(u64),

    #[error("Entity ID widths must match. Source width {source_width}, destination width {destination_width}.")]
    EntityIdWidthMismatch {
        source_width: usize,
        destination_width: usize,
    },

    #[error("Buffer too short. Expected at least {expected} bytes, found {found}.")]
    BufferTooShort { expected: usize, found: usize },

    #[error("{field} too long: {length} bytes exceeds maximum of {max}.")]
    ValueTooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    #[error("PDU data field length {0} exceeds the 16 bit length field.")]
    DataFieldTooLong(usize),

    #[error("Segment metadata length {0} exceeds the maximum of 63 bytes.")]
    SegmentMetadataTooLong(usize),

    #[error("Unexpected TLV type. Expected {expected:?}, found {found:?}.")]
    TLVTypeMismatch { expected: TLVType, found: TLVType },

    #[error("Unexpected PDU. Expected {expected}, found {found}.")]
    UnexpectedPDU { expected: PDUKind, found: PDUKind },

    #[error("Unexpected directive. Expected {expected:?}, found {found:?}.")]
    UnexpectedDirective {
        expected: DirectiveType,
        found: DirectiveType,
    },

    #[error("CRC Failure on PDU. Received 0x{received:04X}, computed 0x{computed:04X}.")]
    CRCFailure { received: u16, computed: u16 },

    #[error("Invalid Directive value: {0:#04x}.")]
    InvalidDirective(u8),

    #[error("Invalid TLV type: {0:#04x}.")]
    InvalidTLVType(u8),

    #[error("Invalid Condition value: {0}.")]
    InvalidCondition(u8),

    #[error("Invalid ChecksumType: {0}.")]
    InvalidChecksumType(u8),

    #[error("Invalid PDU Type {0}.")]
    InvalidPDUType(u8),

    #[error("Invalid Direction value: {0}.")]
    InvalidDirection(u8),

    #[error("Invalid TransmissionMode: {0}.")]
    InvalidTransmissionMode(u8),

    #[error("Invalid CRC Flag {0}.")]
    InvalidCRCFlag(u8),

    #[error("Invalid File Size Flag {0}.")]
    InvalidFileSizeFlag(u8),

    #[error("Invalid Segment Control value: {0}.")]
    InvalidSegmentControl(u8),

    #[error("Invalid Segment Metadata Flag {0}.")]
    InvalidSegmentMetadataFlag(u8),

    #[error("Invalid Delivery Code: {0}.")]
    InvalidDeliveryCode(u8),

    #[error("Invalid File Status: {0}.")]
    InvalidFileStatus(u8),

    #[error("Invalid Transaction Status: {0}.")]
    InvalidTransactionStatus(u8),

    #[error("Invalid Prompt value {0}.")]
    InvalidPrompt(u8),

    #[error("Invalid Record Continuation State {0}.")]
    InvalidRecordContinuationState(u8),

    #[error("Invalid FileStore Action {0}.")]
    InvalidFileStoreAction(u8),

    #[error("Invalid FileStore Status {0} for Action {1:?}.")]
    InvalidFileStoreStatus(u8, FileStoreAction),

    #[error("Invalid Fault Handler Code: {0}.")]
    InvalidFaultHandlerCode(u8),

    #[error("Invalid CCSDS Version Code: {0}.")]
    InvalidVersion(u8),

    #[error("Invalid width code {0:#05b} for a header identifier field.")]
    InvalidWidthCode(u8),

    #[error("Only EoF and Finished PDUs can be acknowledged, not {0:?}.")]
    InvalidAckedDirective(DirectiveType),

    #[error("Invalid ACK directive sub type {0} for {1:?}.")]
    InvalidAckSubType(u8, DirectiveType),

    #[error("Record continuation state requires the segment metadata flag.")]
    MissingSegmentMetadataFlag,

    #[error("Declared data field length {declared} does not match the {parsed} bytes parsed.")]
    DataFieldLengthMismatch { declared: usize, parsed: usize },

    #[error("Segment request field of {0} bytes is not a whole number of segment requests.")]
    InvalidSegmentRequests(usize),

    #[error("A fault location is not allowed with condition {0:?}.")]
    FaultLocationNotAllowed(Condition),

    #[error("Invalid sequence counter width {0}. Must be one of 8, 16, 32, 64.")]
    InvalidCounterWidth(u32),

    #[error("Malformed reserved CFDP message of type {0:#04x}.")]
    InvalidReservedMessage(u8),

    #[error("Message to user does not start with the reserved CFDP marker.")]
    NotReservedMessage,

    #[error("Unable to decode filename. {0}")]
    InvalidFileName(#[from] Utf8Error),

    #[error("Error Reading PDU Buffer. {0}")]
    ReadError(#[from] std::io::Error),
}

impl PDUError {
    /// Logs the mismatch before handing back the error.
    pub(crate) fn length_mismatch(declared: usize, parsed: usize) -> Self {
        warn!("PDU data field length mismatch: declared {declared} bytes, parsed {parsed}");
        Self::DataFieldLengthMismatch { declared, parsed }
    }
}

pub type PDUResult<T> = Result<T, PDUError>;
