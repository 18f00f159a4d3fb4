pub mod checksum;
pub mod codec;
pub mod commands;
pub mod decoder;
pub mod encoder;
pub mod layout;
pub mod messages;
pub mod temperature;

/// First three bytes of every frame.
pub const SIGNATURE: [u8; 3] = [0xbb, 0x00, 0x01];

/// Signature plus the family byte.
pub const HEADER_LEN: usize = 4;

/// Family byte of command and status frames.
pub const COMMAND_FAMILY: u8 = 0x03;

/// Header, 24 body bytes and the checksum.
pub const COMMAND_FRAME_LEN: usize = HEADER_LEN + layout::COMMAND_BODY_LEN + 1;
