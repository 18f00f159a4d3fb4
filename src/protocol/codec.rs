use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use super::{
    commands::CommandState,
    decoder::{DecoderState, FrameDecoder, FramingError, RxFrame},
    encoder,
};


/// A frame to send to a port
#[derive(Clone, Debug)]
pub enum TxFrame {
    /// Command (or, from an emulated unit, status) frame for a state
    State {
        state: CommandState,
        body_len: usize
    },
    /// Pre-built bytes, sent as they are
    Raw(Bytes)
}

impl From<CommandState> for TxFrame {
    fn from(state: CommandState) -> Self {
        TxFrame::State { state, body_len: super::layout::COMMAND_BODY_LEN }
    }
}

impl From<&'static [u8]> for TxFrame {
    fn from(bytes: &'static [u8]) -> Self {
        TxFrame::Raw(Bytes::from_static(bytes))
    }
}


/// Stream codec for driving a port as `Framed<_, PioneerCodec>`.
///
/// Frames that fail their checksum come out as [RxFrame::Corrupted] rather
/// than as stream errors so a monitor can show them and carry on.
#[derive(Debug, Default)]
pub struct PioneerCodec {
    decoder: FrameDecoder
}

impl PioneerCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_body_len(status_body_len: usize) -> Self {
        Self {
            decoder: FrameDecoder::with_status_body_len(status_body_len)
        }
    }
}

impl Decoder for PioneerCodec {
    type Item = RxFrame;

    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            // frames can also complete while rejected bytes are rescanned
            if self.decoder.state() == DecoderState::Complete {
                let frame = self.decoder.take_frame();
                self.decoder.reset();

                match frame {
                    Some(frame) => return Ok(Some(frame)),
                    None => continue,
                }
            }

            if !src.has_remaining() {
                // need more data
                return Ok(None);
            }

            let byte = src.get_u8();

            match self.decoder.push(byte) {
                Ok(_) => continue,

                Err(FramingError::SignatureMismatch { .. }) => continue,

                Err(FramingError::ChecksumMismatch { frame, .. }) => {
                    return Ok(Some(RxFrame::Corrupted(frame)));
                },

                Err(err @ FramingError::AwaitingReset) | Err(err @ FramingError::Layout(_)) => {
                    trace!("decoder error: {err}");
                    self.decoder.reset();
                }
            }
        }
    }
}

impl Encoder<TxFrame> for PioneerCodec {
    type Error = std::io::Error;

    fn encode(&mut self, frame: TxFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = match frame {
            TxFrame::State { state, body_len } => {
                encoder::encode_with_body_len(&state, body_len)
                    .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?
            },
            TxFrame::Raw(bytes) => bytes.to_vec(),
        };

        debug!("TX {:02x?}", &bytes[..]);

        dst.reserve(bytes.len());
        dst.put_slice(&bytes);

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    use super::*;
    use crate::protocol::{commands::Mode, messages};

    fn heat() -> CommandState {
        CommandState {
            power: true,
            mode: Mode::Heat,
            target_temp_c: 26.5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_codec_decode() {
        let frame = encoder::encode(&heat()).expect("encode");

        let mut buf = BytesMut::new();
        buf.put(&[0x01, 0x02, 0xbb, 0x00][..]); // junk, including a partial signature
        buf.put(&messages::INFO_MESSAGE_3[..]);
        buf.put(&frame[..]);

        let mut corrupted = frame;
        corrupted[10] ^= 0x10;
        buf.put(&corrupted[..]);

        buf.put(&frame[..]);

        let mut fr = FramedRead::new(&buf[..], PioneerCodec::new());

        let first = fr.next().await.expect("frame").expect("decode");
        assert!(matches!(first, RxFrame::Informational { family: 0x09, .. }));

        match fr.next().await.expect("frame").expect("decode") {
            RxFrame::Status(status) => {
                assert_eq!(status.raw, frame.to_vec());
                assert_eq!(status.state.target_temp_c, Ok(26.5));
            },
            other => panic!("unexpected {other:?}"),
        }

        let third = fr.next().await.expect("frame").expect("decode");
        assert_eq!(third, RxFrame::Corrupted(corrupted.to_vec()));

        let fourth = fr.next().await.expect("frame").expect("decode");
        assert!(matches!(fourth, RxFrame::Status(_)));

        assert!(fr.next().await.is_none());
    }

    #[tokio::test]
    async fn test_codec_truncated_then_valid() {
        let frame = encoder::encode(&heat()).expect("encode");

        let mut truncated = frame.to_vec();
        truncated.remove(12);

        let mut buf = BytesMut::new();
        buf.put(&truncated[..]);
        buf.put(&frame[..]);

        let mut fr = FramedRead::new(&buf[..], PioneerCodec::new());

        let first = fr.next().await.expect("frame").expect("decode");
        assert!(matches!(first, RxFrame::Corrupted(_)));

        let second = fr.next().await.expect("frame").expect("decode");
        assert!(matches!(second, RxFrame::Status(_)));

        assert!(fr.next().await.is_none());
    }

    #[test]
    fn test_codec_encode() {
        let mut codec = PioneerCodec::new();

        let mut buf = BytesMut::new();
        codec.encode(heat().into(), &mut buf).expect("encode");
        codec.encode(TxFrame::from(&messages::INFO_MESSAGE_1[..]), &mut buf).expect("encode");

        let mut expected = encoder::encode(&heat()).expect("encode").to_vec();
        expected.extend_from_slice(&messages::INFO_MESSAGE_1);
        assert_eq!(&buf[..], &expected[..]);
    }

    #[test]
    fn test_codec_encode_out_of_range() {
        let mut codec = PioneerCodec::new();

        let mut buf = BytesMut::new();
        let state = CommandState { target_temp_c: 40.0, ..heat() };
        assert!(codec.encode(state.into(), &mut buf).is_err());
        assert!(buf.is_empty());
    }
}
