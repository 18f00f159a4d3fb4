use std::io;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::{
    commands::{CommandState, ControlRequest, FieldError},
    decoder::{DecoderState, FrameDecoder, FramingError, RxFrame},
    encoder::{self, EncodeError},
};
use crate::transport::Transport;


#[derive(Error, Debug)]
pub enum ControlError {
    #[error("request rejected: {0}")]
    Encode(#[from] EncodeError),
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}


/// Owns the link to one unit and the last known state of that unit.
///
/// Control requests and polls both run to completion before returning, so a
/// merge is never interleaved with a decoded status replacing the state.
pub struct ProtocolController<T> {
    transport: T,
    decoder: FrameDecoder,

    /// What was last sent to, or last reported by, the unit
    last_known: CommandState,

    /// Latest state reported by the unit itself
    observed: Option<CommandState>,

    checksum_errors: u64,
}

impl<T: Transport> ProtocolController<T> {
    pub fn new(transport: T, initial: CommandState) -> Self {
        Self::with_decoder(transport, initial, FrameDecoder::new())
    }

    pub fn with_decoder(transport: T, initial: CommandState, decoder: FrameDecoder) -> Self {
        Self {
            transport,
            decoder,
            last_known: initial,
            observed: None,
            checksum_errors: 0,
        }
    }

    pub fn last_known(&self) -> &CommandState {
        &self.last_known
    }

    pub fn observed(&self) -> Option<&CommandState> {
        self.observed.as_ref()
    }

    pub fn checksum_errors(&self) -> u64 {
        self.checksum_errors
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Merge `request` onto the last known state and send the result.
    ///
    /// Nothing is written and the last known state is unchanged if the
    /// merged state can't be encoded or the write fails.
    pub fn control(&mut self, request: &ControlRequest) -> Result<CommandState, ControlError> {
        let next = request.apply(&self.last_known);

        let frame = encoder::encode(&next)
            .map_err(|err| {
                warn!("rejecting control request: {err}");
                err
            })?;

        debug!("TX {:02x?}", &frame[..]);
        self.transport.write(&frame)?;

        info!(?next, "sent command");
        self.last_known = next;

        Ok(next)
    }

    /// Write a pre-built frame, e.g. one of the informational messages.
    pub fn send_raw(&mut self, frame: &[u8]) -> Result<(), ControlError> {
        debug!("TX {:02x?}", frame);
        self.transport.write(frame)?;

        Ok(())
    }

    /// Drain received bytes through the decoder.
    ///
    /// Returns the newest state reported during this poll, if any.
    pub fn poll(&mut self) -> Result<Option<CommandState>, ControlError> {
        let received = self.transport.read_available()?;

        let mut published = None;

        for byte in received {
            match self.decoder.push(byte) {
                Ok(_) => (),

                Err(FramingError::SignatureMismatch { .. }) => (),
                Err(FramingError::ChecksumMismatch { .. }) => {
                    self.checksum_errors += 1;
                },
                Err(err) => {
                    warn!("decoder error: {err}");
                    self.decoder.reset();
                },
            }

            // a rejected frame can hand back more than one frame from its bytes
            while self.decoder.state() == DecoderState::Complete {
                if let Some(frame) = self.decoder.take_frame() {
                    published = self.publish(frame).or(published);
                }
                self.decoder.reset();
            }
        }

        Ok(published)
    }

    fn publish(&mut self, frame: RxFrame) -> Option<CommandState> {
        match frame {
            RxFrame::Status(status) => {
                for err in status.state.errors() {
                    match err {
                        FieldError::NotPresent { .. } => debug!("status field skipped: {err}"),
                        _ => warn!("status field not decoded: {err}"),
                    }
                }

                let state = status.state.merge_onto(&self.last_known);

                self.last_known = state;
                self.observed = Some(state);

                Some(state)
            },
            RxFrame::Informational { family, payload } => {
                debug!("ignoring informational frame {family:#04x}: {payload:02x?}");
                None
            },
            RxFrame::Corrupted(_) => None,
        }
    }
}
