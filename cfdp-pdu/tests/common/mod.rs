#![allow(dead_code)]

use cfdp_pdu::{
    pdu::{
        AckPDU, ChecksumType, Condition, DeliveryCode, DirectiveType, EntityIdTLV, EofPDU,
        FileDataPDU, FileStatusCode, FileStoreAction, FileStoreRequestTLV, FileStoreResponseTLV,
        FinishedPDU, KeepAlivePDU, MetadataPDU, NakOrKeepAlive, NakPDU, PDUConfig, PromptPDU,
        RecordContinuationState, ReservedCFDPMessage, SegmentMetadata, TransactionStatus,
        TransmissionMode,
    },
    PDUHolder, PDUResult, UnsignedByteField,
};
use rstest::fixture;

#[fixture]
pub(crate) fn config() -> PDUConfig {
    PDUConfig::new(
        UnsignedByteField::from(2_u16),
        UnsignedByteField::from(3_u16),
        UnsignedByteField::from(1_u16),
        TransmissionMode::Acknowledged,
    )
    .expect("Unable to build PDU configuration.")
}

/// Declared data field length read back from a packed PDU.
pub(crate) fn declared_data_field_len(buffer: &[u8]) -> usize {
    u16::from_be_bytes([buffer[1], buffer[2]]) as usize
}

/// One PDU of every kind, each built from `config`.
pub(crate) fn every_kind(config: &PDUConfig) -> PDUResult<Vec<PDUHolder>> {
    let fault_location = EntityIdTLV::new(config.destination_entity_id());

    let mut metadata = MetadataPDU::new(
        config.clone(),
        true,
        ChecksumType::Crc32,
        0x0001_0000,
        "/data/source.bin".parse()?,
        "/data/destination.bin".parse()?,
        vec![],
    );
    metadata.add_option(&FileStoreRequestTLV::new(
        FileStoreAction::RenameFile,
        "/data/destination.bin",
        "/data/final.bin",
    ))?;
    metadata.add_option(&ReservedCFDPMessage::proxy_closure_request(true))?;

    let segment_metadata =
        SegmentMetadata::new(RecordContinuationState::First, b"record".to_vec())?;

    Ok(vec![
        EofPDU::new(
            config.clone(),
            Condition::CheckLimitReached,
            0x1234_5678,
            0x0001_0000,
            Some(fault_location),
        )
        .into(),
        FinishedPDU::new(
            config.clone(),
            Condition::NakLimitReached,
            DeliveryCode::Incomplete,
            FileStatusCode::Discarded,
            vec![FileStoreResponseTLV::new(
                FileStoreAction::DeleteFile,
                0b0000,
                "/data/destination.bin",
                "",
                vec![],
            )?],
            Some(fault_location),
        )?
        .into(),
        AckPDU::new(
            config.clone(),
            DirectiveType::Finished,
            Condition::NoError,
            TransactionStatus::Terminated,
        )?
        .into(),
        metadata.into(),
        NakPDU::new(config.clone(), 0, 0x0001_0000, vec![(0, 512), (4096, 8192)]).into(),
        PromptPDU::new(config.clone(), NakOrKeepAlive::Nak).into(),
        KeepAlivePDU::new(config.clone(), 4096).into(),
        FileDataPDU::new(config.clone(), 8192, (0..=255).collect()).into(),
        FileDataPDU::new_with_segment_metadata(
            config.clone(),
            segment_metadata,
            0,
            vec![0xca, 0xfe],
        )
        .into(),
    ])
}

