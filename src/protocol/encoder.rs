use packed_struct::prelude::*;
use thiserror::Error;

use super::{
    checksum,
    commands::{CommandState, FanSpeed, Mode},
    layout::{self, BitSet, COMMAND_BODY_LEN, LAYOUT_LEN},
    temperature, COMMAND_FAMILY, COMMAND_FRAME_LEN, HEADER_LEN, SIGNATURE,
};


#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum EncodeError {
    #[error("target temperature {0}°C is outside {min}..={max}°C", min = temperature::MIN_CELSIUS, max = temperature::MAX_CELSIUS)]
    OutOfRangeTemperature(f32),
}

/// Bytes 4 and 6 together.
///
/// Byte 4 holds the fan class in `0xc0` and the mode in `0x0f`; byte 6 holds
/// the fan speed code in `0x07`. The masks are disjoint, so the fan speed
/// can never disturb the mode bits whichever order the ops are applied in.
fn fan_and_mode(fan_speed: FanSpeed, mode: Mode) -> [BitSet; 2] {
    let (class, code) = fan_speed.codes();

    [
        BitSet::new(layout::FAN_MODE, (class & layout::FAN_CLASS_MASK) | (mode.to_primitive() & layout::MODE_MASK)),
        BitSet::new(layout::FAN_SWING, code & layout::FAN_CODE_MASK),
    ]
}

/// Every bit operation needed to lower `state` onto the template, in order.
pub fn body_ops(state: &CommandState) -> Vec<BitSet> {
    let mut ops = Vec::with_capacity(16);

    let flags = [
        (state.power, layout::POWER_BIT),
        (state.display_on, layout::DISPLAY_BIT),
        (state.buzzer_on, layout::BUZZER_BIT),
        (state.eco, layout::ECO_BIT),
    ];
    ops.extend(flags.iter()
        .filter(|(set, _)| *set)
        .map(|(_, bit)| BitSet::new(layout::FLAGS, *bit)));

    if state.heater_8deg {
        ops.push(BitSet::new(layout::FAN_SWING, layout::HEATER_BIT));
    }

    if state.health_on {
        ops.push(BitSet::new(layout::FAN_MODE, layout::HEALTH_BIT));
    }

    ops.push(BitSet::new(layout::SLEEP, state.sleep_mode.to_primitive() & layout::SLEEP_MASK));

    ops.extend(fan_and_mode(state.fan_speed, state.mode));

    let (whole, fraction) = temperature::encode(state.target_temp_c);
    ops.push(BitSet::new(layout::TEMP_WHOLE, whole));
    ops.push(BitSet::new(layout::TEMP_FRACTION, fraction));

    if state.swing_vertical.is_flow() {
        ops.push(BitSet::new(layout::FAN_SWING, layout::VERTICAL_SWEEP_BITS));
    }
    ops.push(BitSet::new(layout::SWING_VERTICAL, state.swing_vertical.to_primitive()));

    if state.swing_horizontal.is_flow() {
        ops.push(BitSet::new(layout::HORIZONTAL_SWEEP, layout::HORIZONTAL_SWEEP_BIT));
    }
    ops.push(BitSet::new(layout::SWING_HORIZONTAL, state.swing_horizontal.to_primitive()));

    ops
}

/// The full layout for `state`, including the offsets past a command body.
pub fn body(state: &CommandState) -> Result<[u8; LAYOUT_LEN], EncodeError> {
    if !temperature::in_range(state.target_temp_c) {
        return Err(EncodeError::OutOfRangeTemperature(state.target_temp_c));
    }

    Ok(layout::fold(body_ops(state)))
}

/// Encode `state` as a command frame: `bb 00 01 03`, 24 body bytes, checksum.
pub fn encode(state: &CommandState) -> Result<[u8; COMMAND_FRAME_LEN], EncodeError> {
    let body = body(state)?;

    let mut frame = [0x00; COMMAND_FRAME_LEN];
    frame[..3].copy_from_slice(&SIGNATURE);
    frame[3] = COMMAND_FAMILY;
    frame[HEADER_LEN..HEADER_LEN + COMMAND_BODY_LEN].copy_from_slice(&body[..COMMAND_BODY_LEN]);
    frame[COMMAND_FRAME_LEN - 1] = checksum::compute(&frame[..COMMAND_FRAME_LEN - 1]);

    Ok(frame)
}

/// Encode `state` in the command family with a body of `body_len` bytes.
///
/// Used for status frames from units that report a longer body than the
/// 24 bytes sent to them. Bytes past the layout are zero.
pub fn encode_with_body_len(state: &CommandState, body_len: usize) -> Result<Vec<u8>, EncodeError> {
    let body = body(state)?;

    let mut frame = Vec::with_capacity(HEADER_LEN + body_len + 1);
    frame.extend_from_slice(&SIGNATURE);
    frame.push(COMMAND_FAMILY);
    frame.extend(body.iter().copied().chain(std::iter::repeat(0x00)).take(body_len));
    frame.push(checksum::compute(&frame));

    Ok(frame)
}
