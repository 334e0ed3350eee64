mod common;

use cfdp_pdu::{
    pdu::{CRCFlag, FileSizeFlag, PDUConfig, TransmissionMode, CRC_LEN},
    EntityID, PDUFactory, PDUResult, TransactionSeqNum, UnsignedByteField,
};
use common::{config, declared_data_field_len, every_kind};
use rstest::rstest;
use rstest_reuse::{self, *};

#[template]
#[rstest]
#[case::one_byte_ids(
    UnsignedByteField::from(1_u8),
    UnsignedByteField::from(2_u8),
    UnsignedByteField::from(3_u8)
)]
#[case::two_byte_ids(
    UnsignedByteField::from(1_u16),
    UnsignedByteField::from(2_u16),
    UnsignedByteField::from(3_u8)
)]
#[case::four_byte_ids(
    UnsignedByteField::from(70000_u32),
    UnsignedByteField::from(2_u32),
    UnsignedByteField::from(300_u16)
)]
#[case::eight_byte_ids(
    UnsignedByteField::from(u64::MAX),
    UnsignedByteField::from(2_u64),
    UnsignedByteField::from(5_u64)
)]
fn pdu_configs(
    #[case] source: EntityID,
    #[case] destination: EntityID,
    #[case] seq_num: TransactionSeqNum,
    #[values(CRCFlag::NotPresent, CRCFlag::Present)] crc_flag: CRCFlag,
    #[values(FileSizeFlag::Small, FileSizeFlag::Large)] file_flag: FileSizeFlag,
) {
}

fn build_config(
    source: EntityID,
    destination: EntityID,
    seq_num: TransactionSeqNum,
    crc_flag: CRCFlag,
    file_flag: FileSizeFlag,
) -> PDUResult<PDUConfig> {
    Ok(
        PDUConfig::new(source, destination, seq_num, TransmissionMode::Unacknowledged)?
            .with_crc_flag(crc_flag)
            .with_file_flag(file_flag),
    )
}

#[apply(pdu_configs)]
fn every_kind_round_trips(
    source: EntityID,
    destination: EntityID,
    seq_num: TransactionSeqNum,
    crc_flag: CRCFlag,
    file_flag: FileSizeFlag,
) -> PDUResult<()> {
    let config = build_config(source, destination, seq_num, crc_flag, file_flag)?;
    for expected in every_kind(&config)? {
        let buffer = expected.pack()?;
        assert_eq!(expected.packet_len(), buffer.len());

        let recovered = PDUFactory::from_raw(&buffer)?;
        assert_eq!(expected, recovered, "{} did not survive", expected.kind());
        assert_eq!(buffer, recovered.pack()?);
    }
    Ok(())
}

#[apply(pdu_configs)]
fn declared_length_matches(
    source: EntityID,
    destination: EntityID,
    seq_num: TransactionSeqNum,
    crc_flag: CRCFlag,
    file_flag: FileSizeFlag,
) -> PDUResult<()> {
    let config = build_config(source, destination, seq_num, crc_flag, file_flag)?;
    let header_len = 4 + 2 * source.width() + seq_num.width();
    let crc_len = match crc_flag {
        CRCFlag::Present => CRC_LEN,
        CRCFlag::NotPresent => 0,
    };
    for pdu in every_kind(&config)? {
        let buffer = pdu.pack()?;
        assert_eq!(header_len, pdu.header().header_len());
        assert_eq!(
            buffer.len() - header_len - crc_len,
            declared_data_field_len(&buffer),
            "{}",
            pdu.kind()
        );
    }
    Ok(())
}

#[apply(pdu_configs)]
fn header_identifiers_survive(
    source: EntityID,
    destination: EntityID,
    seq_num: TransactionSeqNum,
    crc_flag: CRCFlag,
    file_flag: FileSizeFlag,
) -> PDUResult<()> {
    let config = build_config(source, destination, seq_num, crc_flag, file_flag)?;
    for pdu in every_kind(&config)? {
        let recovered = PDUFactory::from_raw(&pdu.pack()?)?;
        let header = recovered.header();
        assert_eq!(source, header.source_entity_id());
        assert_eq!(destination, header.destination_entity_id());
        assert_eq!(seq_num, header.transaction_seq_num());
        assert_eq!(TransmissionMode::Unacknowledged, header.transmission_mode());
        assert_eq!(crc_flag, header.crc_flag());
        assert_eq!(file_flag, header.file_flag());
    }
    Ok(())
}

#[rstest]
fn trailing_buffer_bytes_ignored(config: PDUConfig) -> PDUResult<()> {
    for expected in every_kind(&config)? {
        let mut buffer = expected.pack()?;
        buffer.extend([0xde, 0xad]);
        assert_eq!(expected, PDUFactory::from_raw(&buffer)?);
    }
    Ok(())
}

#[rstest]
fn truncated_pdus_rejected(
    config: PDUConfig,
    #[values(CRCFlag::NotPresent, CRCFlag::Present)] crc_flag: CRCFlag,
) -> PDUResult<()> {
    for pdu in every_kind(&config.with_crc_flag(crc_flag))? {
        let buffer = pdu.pack()?;
        for len in 0..buffer.len() {
            assert!(
                PDUFactory::from_raw(&buffer[..len]).is_err(),
                "{} decoded from {len} of {} bytes",
                pdu.kind(),
                buffer.len()
            );
        }
    }
    Ok(())
}
