//! Byte layout of the command/status body.
//!
//! ```text
//!  offset  mask  field
//!       3  0x80  eco
//!       3  0x40  display on
//!       3  0x20  buzzer on
//!       3  0x04  power
//!       4  0xc0  fan speed class (0x80 mute, 0x40 speed 6)
//!       4  0x10  health
//!       4  0x0f  mode
//!       6  0x80  8°C heater
//!       6  0x38  vertical sweep (set for any vertical *Flow swing)
//!       6  0x07  fan speed code
//!       7  0x08  horizontal sweep (set for any horizontal *Flow swing)
//!       9  0xff  setpoint whole degrees, counted down from 31°C
//!      11  0xff  setpoint quarter degree fraction
//!      15  0x03  sleep mode
//!      28  0xff  vertical swing code
//!      29  0xff  horizontal swing code
//! ```
//!
//! Command frames carry the first [COMMAND_BODY_LEN] bytes of the layout, so
//! the swing codes at 28 and 29 only appear in longer status bodies.

use packed_struct::prelude::*;

/// Bytes covered by the layout.
pub const LAYOUT_LEN: usize = 30;

/// Body length of the command/status frame family.
pub const COMMAND_BODY_LEN: usize = 24;

pub const FLAGS: usize = 3;
pub const FAN_MODE: usize = 4;
pub const FAN_SWING: usize = 6;
pub const HORIZONTAL_SWEEP: usize = 7;
pub const TEMP_WHOLE: usize = 9;
pub const TEMP_FRACTION: usize = 11;
pub const SLEEP: usize = 15;
pub const SWING_VERTICAL: usize = 28;
pub const SWING_HORIZONTAL: usize = 29;

pub const ECO_BIT: u8 = 0x80;
pub const DISPLAY_BIT: u8 = 0x40;
pub const BUZZER_BIT: u8 = 0x20;
pub const POWER_BIT: u8 = 0x04;

pub const FAN_CLASS_MASK: u8 = 0xc0;
pub const HEALTH_BIT: u8 = 0x10;
pub const MODE_MASK: u8 = 0x0f;

pub const HEATER_BIT: u8 = 0x80;
pub const VERTICAL_SWEEP_BITS: u8 = 0x38;
pub const FAN_CODE_MASK: u8 = 0x07;

pub const HORIZONTAL_SWEEP_BIT: u8 = 0x08;

pub const SLEEP_MASK: u8 = 0x03;

/// Defaults every command starts from. None of these overlap a field's bits.
pub const TEMPLATE: [u8; LAYOUT_LEN] = {
    let mut body = [0x00; LAYOUT_LEN];
    body[7] = 0x80;
    body[22] = 0x80;
    body[23] = 0x99;
    body
};

/// OR `bits` into the byte at `offset`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitSet {
    pub offset: usize,
    pub bits: u8
}

impl BitSet {
    pub const fn new(offset: usize, bits: u8) -> Self {
        Self { offset, bits }
    }
}

/// Apply `ops` in order over [TEMPLATE]. Bits are only ever set, never cleared.
pub fn fold<I>(ops: I) -> [u8; LAYOUT_LEN] where
    I: IntoIterator<Item = BitSet>
{
    ops.into_iter().fold(TEMPLATE, |mut body, op| {
        body[op.offset] |= op.bits;
        body
    })
}


/// Raw field view of a (zero padded) body, read with the same masks the
/// encoder writes with. Coded fields stay as raw numbers so an unknown code
/// only affects its own field.
#[derive(PackedStruct, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering="msb0")]
pub struct RawBody {
    // byte 3

    #[packed_field(bits="24")]
    pub eco: bool,

    #[packed_field(bits="25")]
    pub display_on: bool,

    #[packed_field(bits="26")]
    pub buzzer_on: bool,

    #[packed_field(bits="29")]
    pub power: bool,

    // byte 4

    /// Fan class, shifted down from [FAN_CLASS_MASK]
    #[packed_field(bits="32:33")]
    pub fan_class: u8,

    #[packed_field(bits="35")]
    pub health_on: bool,

    #[packed_field(bits="36:39")]
    pub mode: u8,

    // byte 6

    #[packed_field(bits="48")]
    pub heater_8deg: bool,

    #[packed_field(bits="50:52")]
    pub vertical_sweep: u8,

    #[packed_field(bits="53:55")]
    pub fan_code: u8,

    // byte 7

    #[packed_field(bits="60")]
    pub horizontal_sweep: bool,

    #[packed_field(bytes="9")]
    pub temp_whole: u8,

    #[packed_field(bytes="11")]
    pub temp_fraction: u8,

    // byte 15

    #[packed_field(bits="126:127")]
    pub sleep_mode: u8,

    #[packed_field(bytes="28")]
    pub swing_vertical: u8,

    #[packed_field(bytes="29")]
    pub swing_horizontal: u8,
}

impl RawBody {
    /// Unpack a body of any length; bytes past its end read as zero.
    pub fn read(body: &[u8]) -> Result<Self, PackingError> {
        let mut padded = [0x00; LAYOUT_LEN];
        let len = body.len().min(LAYOUT_LEN);
        padded[..len].copy_from_slice(&body[..len]);

        Self::unpack(&padded)
    }

    pub fn fan_class_bits(&self) -> u8 {
        self.fan_class << 6
    }
}
