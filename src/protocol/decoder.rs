use std::collections::VecDeque;

use packed_struct::prelude::*;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::{
    checksum,
    commands::{DecodedState, FanSpeed, FieldError, HorizontalSwing, Mode, SleepMode, VerticalSwing},
    layout::{self, RawBody, COMMAND_BODY_LEN},
    temperature, COMMAND_FAMILY, HEADER_LEN, SIGNATURE,
};


#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecoderState {
    /// Looking for `bb 00 01 <family>`
    AwaitingSignature,
    /// Header matched, accumulating the rest of the frame
    AwaitingBody,
    /// A frame is ready; take it and `reset` before pushing more bytes
    Complete
}

#[derive(Error, Debug)]
pub enum FramingError {
    #[error("signature not found, skipped {skipped:#04x}")]
    SignatureMismatch {
        skipped: u8
    },
    #[error("invalid checksum (expected {expected:#04x}, actual: {actual:#04x}) for frame {frame:02x?}")]
    ChecksumMismatch {
        expected: u8,
        actual: u8,
        frame: Vec<u8>
    },
    #[error("a complete frame is waiting to be taken")]
    AwaitingReset,
    #[error("unable to unpack body: {0}")]
    Layout(#[from] PackingError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusFrame {
    /// Whole frame including header and checksum
    pub raw: Vec<u8>,
    pub state: DecodedState
}

/// A received frame
#[derive(Clone, Debug, PartialEq)]
pub enum RxFrame {
    Status(StatusFrame),
    Informational {
        family: u8,
        payload: Vec<u8>
    },
    /// A frame that failed its checksum. Only produced by the stream codec.
    Corrupted(Vec<u8>)
}


/// Decode a command family body. Swing codes are only read if `body` reaches them.
pub fn decode_body(body: &[u8]) -> Result<DecodedState, PackingError> {
    let raw = RawBody::read(body)?;

    let mode = Mode::from_primitive(raw.mode)
        .ok_or(FieldError::UnknownCode { field: "mode", code: raw.mode });

    let fan_speed = FanSpeed::from_codes(raw.fan_class_bits(), raw.fan_code)
        .ok_or(FieldError::UnknownFanCodes { class: raw.fan_class_bits(), code: raw.fan_code });

    let target_temp_c = temperature::decode(raw.temp_whole, raw.temp_fraction)
        .map_err(FieldError::from);

    let swing_vertical = if body.len() > layout::SWING_VERTICAL {
        VerticalSwing::from_primitive(raw.swing_vertical)
            .ok_or(FieldError::UnknownCode { field: "vertical swing", code: raw.swing_vertical })
    } else {
        Err(FieldError::NotPresent { field: "vertical swing", len: body.len() })
    };

    let swing_horizontal = if body.len() > layout::SWING_HORIZONTAL {
        HorizontalSwing::from_primitive(raw.swing_horizontal)
            .ok_or(FieldError::UnknownCode { field: "horizontal swing", code: raw.swing_horizontal })
    } else {
        Err(FieldError::NotPresent { field: "horizontal swing", len: body.len() })
    };

    Ok(DecodedState {
        power: raw.power,
        display_on: raw.display_on,
        buzzer_on: raw.buzzer_on,
        eco: raw.eco,
        heater_8deg: raw.heater_8deg,
        health_on: raw.health_on,
        // two bits, every value is mapped
        sleep_mode: SleepMode::from_primitive(raw.sleep_mode).unwrap_or_default(),
        vertical_sweep: raw.vertical_sweep != 0,
        horizontal_sweep: raw.horizontal_sweep,
        mode,
        target_temp_c,
        fan_speed,
        swing_vertical,
        swing_horizontal,
    })
}


/// Incremental frame decoder, fed one byte at a time.
///
/// Bytes of a frame that fails its checksum are searched again for a frame
/// signature, so a frame that lost bytes on the line doesn't take the frame
/// after it down too. That search can complete a frame on its own: callers
/// should take frames while [FrameDecoder::state] is `Complete`, after any
/// push and after every `reset`.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    buffer: Vec<u8>,
    /// Total length of the frame being accumulated, once the header tells us
    frame_len: Option<usize>,
    status_body_len: usize,
    frame: Option<RxFrame>,
    /// Rejected bytes still to be searched for a signature
    backlog: VecDeque<u8>
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_status_body_len(COMMAND_BODY_LEN)
    }

    /// Decoder for a unit whose status frames carry `status_body_len` body bytes.
    pub fn with_status_body_len(status_body_len: usize) -> Self {
        Self {
            state: DecoderState::AwaitingSignature,
            buffer: Vec::with_capacity(HEADER_LEN + status_body_len + 1),
            frame_len: None,
            status_body_len,
            frame: None,
            backlog: VecDeque::new()
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn frame(&self) -> Option<&RxFrame> {
        self.frame.as_ref()
    }

    /// Take the completed frame. The decoder stays `Complete` until `reset`.
    pub fn take_frame(&mut self) -> Option<RxFrame> {
        self.frame.take()
    }

    /// Start looking for the next frame. Any bytes left over from a rejected
    /// frame are searched first, which may complete a frame straight away.
    pub fn reset(&mut self) {
        self.clear();
        self.drain_backlog();
    }

    fn clear(&mut self) {
        self.state = DecoderState::AwaitingSignature;
        self.buffer.clear();
        self.frame_len = None;
        self.frame = None;
    }

    fn drain_backlog(&mut self) {
        while self.state != DecoderState::Complete {
            let Some(byte) = self.backlog.pop_front() else { break };

            if let Err(err) = self.step(byte) {
                trace!("while rescanning rejected bytes: {err}");
            }
        }
    }

    /// Feed one byte.
    ///
    /// Signature and checksum errors are recoverable: the decoder has already
    /// resynchronised when they are returned and the next byte can be pushed.
    pub fn push(&mut self, byte: u8) -> Result<DecoderState, FramingError> {
        match self.state {
            DecoderState::Complete => Err(FramingError::AwaitingReset),
            _ => self.step(byte),
        }
    }

    fn step(&mut self, byte: u8) -> Result<DecoderState, FramingError> {
        match self.state {
            DecoderState::Complete => Err(FramingError::AwaitingReset),

            DecoderState::AwaitingSignature => {
                self.buffer.push(byte);

                if self.buffer.len() < HEADER_LEN {
                    return Ok(self.state);
                }

                if self.buffer[..SIGNATURE.len()] != SIGNATURE {
                    let skipped = self.buffer.remove(0);
                    trace!("skipped {skipped:#04x} looking for frame signature");
                    return Err(FramingError::SignatureMismatch { skipped });
                }

                self.frame_len = self.resolve_frame_len();
                self.state = DecoderState::AwaitingBody;

                Ok(self.state)
            },

            DecoderState::AwaitingBody => {
                self.buffer.push(byte);

                if self.frame_len.is_none() {
                    self.frame_len = self.resolve_frame_len();
                }

                match self.frame_len {
                    Some(len) if self.buffer.len() >= len => self.complete(),
                    _ => Ok(self.state),
                }
            }
        }
    }

    /// The command family has a fixed body length; other families carry a
    /// payload length in the byte after the header.
    fn resolve_frame_len(&self) -> Option<usize> {
        match self.buffer[HEADER_LEN - 1] {
            COMMAND_FAMILY => Some(HEADER_LEN + self.status_body_len + 1),
            _ => self.buffer.get(HEADER_LEN)
                .map(|payload_len| HEADER_LEN + 1 + *payload_len as usize + 1),
        }
    }

    fn complete(&mut self) -> Result<DecoderState, FramingError> {
        let frame = std::mem::take(&mut self.buffer);
        self.clear();

        let Some((&actual, data)) = frame.split_last() else {
            return Ok(self.state);
        };

        let expected = checksum::compute(data);
        if expected != actual {
            warn!("discarding frame with invalid checksum (expected {expected:#04x}, actual {actual:#04x})");

            // the next frame may start inside the rejected bytes; search them
            // ahead of anything already waiting
            for byte in frame[1..].iter().rev() {
                self.backlog.push_front(*byte);
            }
            self.drain_backlog();

            return Err(FramingError::ChecksumMismatch { expected, actual, frame });
        }

        debug!("RX {:02x?}", &frame[..]);

        let family = frame[HEADER_LEN - 1];
        let rx_frame = if family == COMMAND_FAMILY {
            let state = decode_body(&frame[HEADER_LEN..frame.len() - 1])?;
            RxFrame::Status(StatusFrame { raw: frame, state })
        } else {
            RxFrame::Informational {
                family,
                payload: frame[HEADER_LEN + 1..frame.len() - 1].to_vec()
            }
        };

        self.frame = Some(rx_frame);
        self.state = DecoderState::Complete;

        Ok(self.state)
    }
}
