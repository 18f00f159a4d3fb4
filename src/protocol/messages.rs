//! Fixed informational frames observed on the link.
//!
//! Their meaning is unknown. They are not part of the command/status family:
//! the fourth byte is their family and the fifth their payload length.
//! Writing one to the unit is used as a status poke.

pub static INFO_MESSAGE_1: [u8; 8] = [0xbb, 0x00, 0x01, 0x04, 0x02, 0x01, 0x00, 0xbd];
pub static INFO_MESSAGE_2: [u8; 9] = [0xbb, 0x00, 0x01, 0x0a, 0x03, 0x05, 0x00, 0x00, 0xb6];
pub static INFO_MESSAGE_3: [u8; 8] = [0xbb, 0x00, 0x01, 0x09, 0x02, 0x05, 0x00, 0xb4];
pub static INFO_MESSAGE_4: [u8; 9] = [0xbb, 0x00, 0x01, 0x0a, 0x03, 0x05, 0x00, 0x08, 0xbe];

/// Informational message `n`, numbered from 1.
pub fn info_message(n: usize) -> Option<&'static [u8]> {
    match n {
        1 => Some(&INFO_MESSAGE_1),
        2 => Some(&INFO_MESSAGE_2),
        3 => Some(&INFO_MESSAGE_3),
        4 => Some(&INFO_MESSAGE_4),
        _ => None
    }
}
