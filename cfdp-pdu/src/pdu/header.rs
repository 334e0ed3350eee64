use byteorder::{BigEndian, ReadBytesExt};
use log::warn;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use super::{
    crc16_ibm_3740,
    error::{PDUError, PDUResult},
};
use crate::util::{EntityID, TransactionSeqNum, UnsignedByteField};

/// Version field of every PDU produced by this crate (CFDP version 2).
pub const CFDP_VERSION: u8 = 0b001;
pub const FIXED_HEADER_LEN: usize = 4;
pub const CRC_LEN: usize = 2;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum Condition {
    NoError = 0b0000,
    PositiveLimitReached = 0b0001,
    KeepAliveLimitReached = 0b0010,
    InvalidTransmissionMode = 0b0011,
    FilestoreRejection = 0b0100,
    FileChecksumFailure = 0b0101,
    FilesizeError = 0b0110,
    NakLimitReached = 0b0111,
    InactivityDetected = 0b1000,
    InvalidFileStructure = 0b1001,
    CheckLimitReached = 0b1010,
    UnsupportedChecksumType = 0b1011,
    SuspendReceived = 0b1110,
    CancelReceived = 0b1111,
}
impl Condition {
    pub(crate) fn from_high_nibble(byte: u8) -> PDUResult<Self> {
        let possible_condition = (byte & 0xF0) >> 4;
        Self::from_u8(possible_condition).ok_or(PDUError::InvalidCondition(possible_condition))
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum PDUType {
    FileDirective = 0,
    FileData = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum Direction {
    ToReceiver = 0,
    ToSender = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum TransmissionMode {
    Acknowledged = 0,
    Unacknowledged = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum CRCFlag {
    NotPresent = 0,
    Present = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
/// Selects the width of every file size sensitive field (sizes, offsets, progress).
pub enum FileSizeFlag {
    Small = 0,
    Large = 1,
}
impl FileSizeFlag {
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Small => 4,
            Self::Large => 8,
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum SegmentationControl {
    NotPreserved = 0,
    Preserved = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
/// Segment metadata flag of the header. Only meaningful for file data PDUs.
pub enum SegmentedData {
    NotPresent = 0,
    Present = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum NakOrKeepAlive {
    Nak = 0,
    KeepAlive = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum DeliveryCode {
    Complete = 0,
    Incomplete = 1,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum FileStatusCode {
    Discarded = 0b00,
    FilestoreRejection = 0b01,
    Retained = 0b10,
    Unreported = 0b11,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum TransactionStatus {
    Undefined = 0b00,
    Active = 0b01,
    Terminated = 0b10,
    Unrecognized = 0b11,
}

fn check_header_id_width(field: &UnsignedByteField) -> PDUResult<()> {
    match field.width() {
        1 | 2 | 4 | 8 => Ok(()),
        other => Err(PDUError::InvalidByteFieldWidth(other)),
    }
}

/// Width codes carry the literal byte count. Eight bytes do not fit in three bits
/// and are written as 0b000.
fn width_code(width: usize) -> u8 {
    (width & 0b111) as u8
}

/// Inverse of [width_code]. This is not the CCSDS `len - 1` encoding: a peer using
/// that encoding reads 0b001 as two bytes and 0b000 as one, so headers are only
/// interchangeable with peers using literal width codes.
fn width_from_code(code: u8) -> PDUResult<usize> {
    match code {
        0b001 => Ok(1),
        0b010 => Ok(2),
        0b100 => Ok(4),
        0b000 => Ok(8),
        other => Err(PDUError::InvalidWidthCode(other)),
    }
}

/// Transaction wide parameters shared by every PDU of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PDUConfig {
    source_entity_id: EntityID,
    destination_entity_id: EntityID,
    transaction_seq_num: TransactionSeqNum,
    pub transmission_mode: TransmissionMode,
    pub file_flag: FileSizeFlag,
    pub crc_flag: CRCFlag,
    pub direction: Direction,
    pub segmentation_control: SegmentationControl,
}
impl PDUConfig {
    pub fn new(
        source_entity_id: EntityID,
        destination_entity_id: EntityID,
        transaction_seq_num: TransactionSeqNum,
        transmission_mode: TransmissionMode,
    ) -> PDUResult<Self> {
        let mut config = Self {
            transmission_mode,
            ..Default::default()
        };
        config.set_entity_ids(source_entity_id, destination_entity_id)?;
        config.set_transaction_seq_num(transaction_seq_num)?;
        Ok(config)
    }

    pub fn with_file_flag(mut self, file_flag: FileSizeFlag) -> Self {
        self.file_flag = file_flag;
        self
    }

    pub fn with_crc_flag(mut self, crc_flag: CRCFlag) -> Self {
        self.crc_flag = crc_flag;
        self
    }

    pub fn with_transmission_mode(mut self, transmission_mode: TransmissionMode) -> Self {
        self.transmission_mode = transmission_mode;
        self
    }

    pub fn source_entity_id(&self) -> EntityID {
        self.source_entity_id
    }

    pub fn destination_entity_id(&self) -> EntityID {
        self.destination_entity_id
    }

    pub fn transaction_seq_num(&self) -> TransactionSeqNum {
        self.transaction_seq_num
    }

    /// Both IDs are replaced together. They must share a width of 1, 2, 4 or 8 bytes;
    /// on failure the configuration is unchanged.
    pub fn set_entity_ids(&mut self, source: EntityID, destination: EntityID) -> PDUResult<()> {
        if source.width() != destination.width() {
            return Err(PDUError::EntityIdWidthMismatch {
                source_width: source.width(),
                destination_width: destination.width(),
            });
        }
        check_header_id_width(&source)?;
        self.source_entity_id = source;
        self.destination_entity_id = destination;
        Ok(())
    }

    pub fn set_transaction_seq_num(&mut self, seq_num: TransactionSeqNum) -> PDUResult<()> {
        check_header_id_width(&seq_num)?;
        self.transaction_seq_num = seq_num;
        Ok(())
    }

    /// The width of the sequence number is the length of `bytes`.
    pub fn set_transaction_seq_num_from_bytes(&mut self, bytes: &[u8]) -> PDUResult<()> {
        let seq_num = UnsignedByteField::from_be_bytes(bytes.len(), bytes)?;
        self.set_transaction_seq_num(seq_num)
    }

    pub fn header_len(&self) -> usize {
        FIXED_HEADER_LEN + 2 * self.source_entity_id.width() + self.transaction_seq_num.width()
    }

    pub fn crc_len(&self) -> usize {
        match self.crc_flag {
            CRCFlag::Present => CRC_LEN,
            CRCFlag::NotPresent => 0,
        }
    }
}
impl Default for PDUConfig {
    fn default() -> Self {
        Self {
            source_entity_id: UnsignedByteField::from(0_u8),
            destination_entity_id: UnsignedByteField::from(0_u8),
            transaction_seq_num: UnsignedByteField::from(0_u8),
            transmission_mode: TransmissionMode::Acknowledged,
            file_flag: FileSizeFlag::Small,
            crc_flag: CRCFlag::NotPresent,
            direction: Direction::ToReceiver,
            segmentation_control: SegmentationControl::NotPreserved,
        }
    }
}

/// The header prefixing every PDU.
///
/// The data field length is not stored. It is derived from the body each time the
/// PDU is packed and returned alongside the header when unpacking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PDUHeader {
    pdu_type: PDUType,
    pub config: PDUConfig,
    pub segment_metadata_flag: SegmentedData,
}
impl PDUHeader {
    pub fn new(pdu_type: PDUType, config: PDUConfig, segment_metadata_flag: SegmentedData) -> Self {
        Self {
            pdu_type,
            config,
            segment_metadata_flag,
        }
    }

    pub fn new_for_file_directive(config: PDUConfig) -> Self {
        Self::new(PDUType::FileDirective, config, SegmentedData::NotPresent)
    }

    pub fn new_for_file_data(config: PDUConfig, segment_metadata_flag: SegmentedData) -> Self {
        Self::new(PDUType::FileData, config, segment_metadata_flag)
    }

    /// Fixed by the PDU owning this header. A directive PDU always packs as a file
    /// directive and a file data PDU as file data.
    pub fn pdu_type(&self) -> PDUType {
        self.pdu_type
    }

    pub fn header_len(&self) -> usize {
        self.config.header_len()
    }

    pub fn source_entity_id(&self) -> EntityID {
        self.config.source_entity_id()
    }

    pub fn destination_entity_id(&self) -> EntityID {
        self.config.destination_entity_id()
    }

    pub fn transaction_seq_num(&self) -> TransactionSeqNum {
        self.config.transaction_seq_num()
    }

    pub fn set_entity_ids(&mut self, source: EntityID, destination: EntityID) -> PDUResult<()> {
        self.config.set_entity_ids(source, destination)
    }

    pub fn set_transaction_seq_num(&mut self, seq_num: TransactionSeqNum) -> PDUResult<()> {
        self.config.set_transaction_seq_num(seq_num)
    }

    pub fn set_transaction_seq_num_from_bytes(&mut self, bytes: &[u8]) -> PDUResult<()> {
        self.config.set_transaction_seq_num_from_bytes(bytes)
    }

    pub fn transmission_mode(&self) -> TransmissionMode {
        self.config.transmission_mode
    }

    pub fn direction(&self) -> Direction {
        self.config.direction
    }

    pub fn file_flag(&self) -> FileSizeFlag {
        self.config.file_flag
    }

    pub fn crc_flag(&self) -> CRCFlag {
        self.config.crc_flag
    }

    /// Write the header for a data field of `pdu_data_field_len` bytes.
    pub fn write_to(&self, buffer: &mut Vec<u8>, pdu_data_field_len: usize) -> PDUResult<()> {
        self.write_with_type(buffer, self.pdu_type, pdu_data_field_len)
    }

    fn write_with_type(
        &self,
        buffer: &mut Vec<u8>,
        pdu_type: PDUType,
        pdu_data_field_len: usize,
    ) -> PDUResult<()> {
        let data_field_len = u16::try_from(pdu_data_field_len)
            .map_err(|_| PDUError::DataFieldTooLong(pdu_data_field_len))?;

        let first_byte = (CFDP_VERSION << 5)
            | ((pdu_type as u8) << 4)
            | ((self.config.direction as u8) << 3)
            | ((self.config.transmission_mode as u8) << 2)
            | ((self.config.crc_flag as u8) << 1)
            | self.config.file_flag as u8;
        buffer.push(first_byte);
        buffer.extend(data_field_len.to_be_bytes());

        let fourth_byte = ((self.config.segmentation_control as u8) << 7)
            | (width_code(self.config.source_entity_id.width()) << 4)
            | ((self.segment_metadata_flag as u8) << 3)
            | width_code(self.config.transaction_seq_num.width());
        buffer.push(fourth_byte);

        self.config.source_entity_id.write_be(buffer);
        self.config.transaction_seq_num.write_be(buffer);
        self.config.destination_entity_id.write_be(buffer);
        Ok(())
    }

    /// Assemble a full PDU of `pdu_type` around an encoded data field, appending the
    /// CRC when enabled.
    pub fn pack_with_data_field(
        &self,
        pdu_type: PDUType,
        data_field: &[u8],
    ) -> PDUResult<Vec<u8>> {
        let mut buffer =
            Vec::with_capacity(self.header_len() + data_field.len() + self.config.crc_len());
        self.write_with_type(&mut buffer, pdu_type, data_field.len())?;
        buffer.extend_from_slice(data_field);
        if self.config.crc_flag == CRCFlag::Present {
            let crc = crc16_ibm_3740(&buffer);
            buffer.extend(crc.to_be_bytes());
        }
        Ok(buffer)
    }

    /// Header length read from the width codes of a raw PDU.
    pub fn header_len_from_raw(buffer: &[u8]) -> PDUResult<usize> {
        if buffer.len() < FIXED_HEADER_LEN {
            return Err(PDUError::BufferTooShort {
                expected: FIXED_HEADER_LEN,
                found: buffer.len(),
            });
        }
        let entity_width = width_from_code((buffer[3] >> 4) & 0b111)?;
        let seq_width = width_from_code(buffer[3] & 0b111)?;
        Ok(FIXED_HEADER_LEN + 2 * entity_width + seq_width)
    }

    /// Parse a header, returning it together with the declared data field length.
    pub fn unpack(buffer: &[u8]) -> PDUResult<(Self, usize)> {
        let header_len = Self::header_len_from_raw(buffer)?;
        if buffer.len() < header_len {
            return Err(PDUError::BufferTooShort {
                expected: header_len,
                found: buffer.len(),
            });
        }

        let first_byte = buffer[0];
        let version = (first_byte >> 5) & 0b111;
        if version != CFDP_VERSION {
            return Err(PDUError::InvalidVersion(version));
        }
        let pdu_type = {
            let possible = (first_byte >> 4) & 0b1;
            PDUType::from_u8(possible).ok_or(PDUError::InvalidPDUType(possible))?
        };
        let direction = {
            let possible = (first_byte >> 3) & 0b1;
            Direction::from_u8(possible).ok_or(PDUError::InvalidDirection(possible))?
        };
        let transmission_mode = {
            let possible = (first_byte >> 2) & 0b1;
            TransmissionMode::from_u8(possible)
                .ok_or(PDUError::InvalidTransmissionMode(possible))?
        };
        let crc_flag = {
            let possible = (first_byte >> 1) & 0b1;
            CRCFlag::from_u8(possible).ok_or(PDUError::InvalidCRCFlag(possible))?
        };
        let file_flag = {
            let possible = first_byte & 0b1;
            FileSizeFlag::from_u8(possible).ok_or(PDUError::InvalidFileSizeFlag(possible))?
        };

        let pdu_data_field_len = (&buffer[1..3]).read_u16::<BigEndian>()? as usize;

        let fourth_byte = buffer[3];
        let segmentation_control = {
            let possible = fourth_byte >> 7;
            SegmentationControl::from_u8(possible)
                .ok_or(PDUError::InvalidSegmentControl(possible))?
        };
        let segment_metadata_flag = {
            let possible = (fourth_byte >> 3) & 0b1;
            SegmentedData::from_u8(possible)
                .ok_or(PDUError::InvalidSegmentMetadataFlag(possible))?
        };
        let entity_width = width_from_code((fourth_byte >> 4) & 0b111)?;
        let seq_width = width_from_code(fourth_byte & 0b111)?;

        let mut index = FIXED_HEADER_LEN;
        let source_entity_id = UnsignedByteField::from_be_bytes(entity_width, &buffer[index..])?;
        index += entity_width;
        let transaction_seq_num = UnsignedByteField::from_be_bytes(seq_width, &buffer[index..])?;
        index += seq_width;
        let destination_entity_id =
            UnsignedByteField::from_be_bytes(entity_width, &buffer[index..])?;

        let config = PDUConfig {
            source_entity_id,
            destination_entity_id,
            transaction_seq_num,
            transmission_mode,
            file_flag,
            crc_flag,
            direction,
            segmentation_control,
        };
        Ok((
            Self {
                pdu_type,
                config,
                segment_metadata_flag,
            },
            pdu_data_field_len,
        ))
    }

    /// Parse the header of a complete PDU, check the buffer holds the declared data
    /// field (and CRC), verify the CRC and return the data field.
    pub fn unpack_with_data_field(buffer: &[u8]) -> PDUResult<(Self, &[u8])> {
        let (header, pdu_data_field_len) = Self::unpack(buffer)?;
        let data_end = header.header_len() + pdu_data_field_len;
        let packet_len = data_end + header.config.crc_len();
        if buffer.len() < packet_len {
            return Err(PDUError::BufferTooShort {
                expected: packet_len,
                found: buffer.len(),
            });
        }
        if header.config.crc_flag == CRCFlag::Present {
            let received = (&buffer[data_end..packet_len]).read_u16::<BigEndian>()?;
            let computed = crc16_ibm_3740(&buffer[..data_end]);
            if received != computed {
                warn!(
                    "CRC mismatch on PDU from entity {}: received 0x{received:04X}, computed 0x{computed:04X}",
                    header.source_entity_id().value()
                );
                return Err(PDUError::CRCFailure { received, computed });
            }
        }
        let header_len = header.header_len();
        Ok((header, &buffer[header_len..data_end]))
    }
}
