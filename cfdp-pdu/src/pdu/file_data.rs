use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use super::{
    error::{PDUError, PDUResult},
    factory::PDUKind,
    file_directive::{parse_fss_field, write_fss_field, DirectiveType},
    header::{Direction, PDUConfig, PDUHeader, PDUType, SegmentedData},
    PDUEncode,
};

pub const MAX_SEGMENT_METADATA_LEN: usize = 63;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
/// Continuation state of a record.
pub enum RecordContinuationState {
    Interim = 0b00,
    First = 0b01,
    Last = 0b10,
    Unsegmented = 0b11,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Record boundary information preceding the offset of a file data PDU.
pub struct SegmentMetadata {
    record_continuation_state: RecordContinuationState,
    metadata: Vec<u8>,
}
impl SegmentMetadata {
    pub fn new(
        record_continuation_state: RecordContinuationState,
        metadata: Vec<u8>,
    ) -> PDUResult<Self> {
        if metadata.len() > MAX_SEGMENT_METADATA_LEN {
            return Err(PDUError::SegmentMetadataTooLong(metadata.len()));
        }
        Ok(Self {
            record_continuation_state,
            metadata,
        })
    }

    pub fn record_continuation_state(&self) -> RecordContinuationState {
        self.record_continuation_state
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn packet_len(&self) -> usize {
        1 + self.metadata.len()
    }

    fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.push(((self.record_continuation_state as u8) << 6) | self.metadata.len() as u8);
        buffer.extend_from_slice(&self.metadata);
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let first_byte = *buffer.first().ok_or(PDUError::BufferTooShort {
            expected: 1,
            found: 0,
        })?;
        let possible = first_byte >> 6;
        let record_continuation_state = RecordContinuationState::from_u8(possible)
            .ok_or(PDUError::InvalidRecordContinuationState(possible))?;
        let length = (first_byte & 0x3F) as usize;
        if buffer.len() < 1 + length {
            return Err(PDUError::BufferTooShort {
                expected: 1 + length,
                found: buffer.len(),
            });
        }
        Ok(Self {
            record_continuation_state,
            metadata: buffer[1..1 + length].to_vec(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A segment of file contents starting at `offset`.
pub struct FileDataPDU {
    header: PDUHeader,
    segment_metadata: Option<SegmentMetadata>,
    pub offset: u64,
    pub file_data: Vec<u8>,
}
impl FileDataPDU {
    pub fn new(mut config: PDUConfig, offset: u64, file_data: Vec<u8>) -> Self {
        config.direction = Direction::ToReceiver;
        Self {
            header: PDUHeader::new_for_file_data(config, SegmentedData::NotPresent),
            segment_metadata: None,
            offset,
            file_data,
        }
    }

    pub fn new_with_segment_metadata(
        config: PDUConfig,
        segment_metadata: SegmentMetadata,
        offset: u64,
        file_data: Vec<u8>,
    ) -> Self {
        let mut pdu = Self::new(config, offset, file_data);
        pdu.set_segment_metadata(Some(segment_metadata));
        pdu
    }

    pub fn header_mut(&mut self) -> &mut PDUHeader {
        &mut self.header
    }

    pub fn segment_metadata(&self) -> Option<&SegmentMetadata> {
        self.segment_metadata.as_ref()
    }

    /// Also updates the segment metadata flag of the header.
    pub fn set_segment_metadata(&mut self, segment_metadata: Option<SegmentMetadata>) {
        self.header.segment_metadata_flag = match segment_metadata {
            Some(_) => SegmentedData::Present,
            None => SegmentedData::NotPresent,
        };
        self.segment_metadata = segment_metadata;
    }

    /// Largest file segment that keeps this PDU within `max_packet_len` bytes.
    pub fn max_file_segment_len(&self, max_packet_len: usize) -> PDUResult<usize> {
        max_file_seg_len_for_max_packet_len(
            &self.header.config,
            max_packet_len,
            self.segment_metadata.as_ref(),
        )
    }
}

/// Largest file segment a file data PDU built with `config` and `segment_metadata`
/// can carry within `max_packet_len` bytes.
pub fn max_file_seg_len_for_max_packet_len(
    config: &PDUConfig,
    max_packet_len: usize,
    segment_metadata: Option<&SegmentMetadata>,
) -> PDUResult<usize> {
    let overhead = config.header_len()
        + segment_metadata.map_or(0, SegmentMetadata::packet_len)
        + config.file_flag.encoded_len()
        + config.crc_len();
    if max_packet_len < overhead {
        return Err(PDUError::BufferTooShort {
            expected: overhead,
            found: max_packet_len,
        });
    }
    Ok(max_packet_len - overhead)
}

impl PDUEncode for FileDataPDU {
    fn header(&self) -> &PDUHeader {
        &self.header
    }

    fn pdu_data_field_len(&self) -> usize {
        self.segment_metadata
            .as_ref()
            .map_or(0, SegmentMetadata::packet_len)
            + self.header.file_flag().encoded_len()
            + self.file_data.len()
    }

    fn pack(&self) -> PDUResult<Vec<u8>> {
        let mut data_field = Vec::with_capacity(self.pdu_data_field_len());
        match (&self.segment_metadata, self.header.segment_metadata_flag) {
            (Some(segment_metadata), SegmentedData::Present) => {
                segment_metadata.write_to(&mut data_field)
            }
            (None, SegmentedData::NotPresent) => {}
            _ => return Err(PDUError::MissingSegmentMetadataFlag),
        }
        write_fss_field(&mut data_field, self.header.file_flag(), self.offset)?;
        data_field.extend_from_slice(&self.file_data);
        self.header.pack_with_data_field(PDUType::FileData, &data_field)
    }

    fn unpack(buffer: &[u8]) -> PDUResult<Self> {
        let (header, data_field) = PDUHeader::unpack_with_data_field(buffer)?;
        if header.pdu_type() == PDUType::FileDirective {
            let code = *data_field.first().ok_or(PDUError::BufferTooShort {
                expected: 1,
                found: 0,
            })?;
            let found = DirectiveType::from_u8(code).ok_or(PDUError::InvalidDirective(code))?;
            return Err(PDUError::UnexpectedPDU {
                expected: PDUKind::FileData,
                found: PDUKind::from(found),
            });
        }

        let mut cursor = data_field;
        let segment_metadata = match header.segment_metadata_flag {
            SegmentedData::Present => {
                let segment_metadata = SegmentMetadata::unpack(cursor)?;
                cursor = &cursor[segment_metadata.packet_len()..];
                Some(segment_metadata)
            }
            SegmentedData::NotPresent => None,
        };
        let offset = parse_fss_field(&mut cursor, header.file_flag())?;

        Ok(Self {
            header,
            segment_metadata,
            offset,
            file_data: cursor.to_vec(),
        })
    }
}
