mod error;
mod factory;
mod fault_handler;
mod file_data;
mod file_directive;
mod filestore;
mod header;
mod lv;
mod msg_to_user;
mod ops;
mod tlv;

pub use error::{PDUError, PDUResult};
pub use factory::*;
pub use fault_handler::*;
pub use file_data::*;
pub use file_directive::*;
pub use filestore::*;
pub use header::*;
pub use lv::*;
pub use msg_to_user::*;
pub use ops::*;
pub use tlv::*;

/// Behaviour shared by every concrete PDU.
pub trait PDUEncode: Sized {
    fn header(&self) -> &PDUHeader;

    /// Length of everything between the header and the optional CRC.
    fn pdu_data_field_len(&self) -> usize;

    fn pack(&self) -> PDUResult<Vec<u8>>;

    fn unpack(buffer: &[u8]) -> PDUResult<Self>;

    fn packet_len(&self) -> usize {
        self.header().header_len() + self.pdu_data_field_len() + self.header().config.crc_len()
    }
}

pub(crate) fn crc16_ibm_3740(message: &[u8]) -> u16 {
    message
        .iter()
        .fold(0xffff, |acc, digit| crc16(*digit as u16, acc))
}

fn crc16(in_char: u16, crc: u16) -> u16 {
    let poly = 0x1021;
    let shift_char = (in_char & 0x00FF) << 8;
    let mut crc = crc ^ shift_char;
    for _ in 0..8 {
        match crc & 0x8000 > 0 {
            true => crc = (crc << 1) ^ poly,
            false => crc <<= 1,
        };
    }
    crc
}
