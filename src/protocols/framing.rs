//! Length-prefixed frames over a byte stream.
//!
//! Each frame is a 4-byte little-endian length followed by exactly that many
//! bytes. Reads may split or merge frames arbitrarily: partial frames stay
//! buffered and extra bytes are kept for the next frame.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::protocols::ProtocolError;

pub const LENGTH_PREFIX_SIZE: usize = 4;

/// 1 MiB. A full `AliceMessages` with its payload is far below this.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1 << 20;

#[derive(Debug)]
pub struct FrameCodec {
    inner: LengthDelimitedCodec,
    // Set once bytes of a frame were seen and cleared when the frame is complete.
    in_progress: bool,
}

impl FrameCodec {
    #[must_use]
    pub fn new(max_frame_length: usize) -> FrameCodec {
        let inner = LengthDelimitedCodec::builder()
            .length_field_length(LENGTH_PREFIX_SIZE)
            .little_endian()
            .max_frame_length(max_frame_length)
            .new_codec();

        FrameCodec {
            inner,
            in_progress: false,
        }
    }

    #[must_use]
    pub fn max_frame_length(&self) -> usize {
        self.inner.max_frame_length()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        FrameCodec::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, ProtocolError> {
        // The inner codec consumes the prefix before the payload is complete,
        // so an empty buffer does not mean that no frame is pending.
        let available = src.len();
        let frame = self.inner.decode(src).map_err(frame_error)?;

        match &frame {
            Some(_) => self.in_progress = false,
            None if available > 0 => self.in_progress = true,
            None => {}
        }

        Ok(frame)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, ProtocolError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if self.in_progress => Err(ProtocolError::PrematureDisconnect),
            None => Ok(None),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        self.inner.encode(frame, dst).map_err(frame_error)
    }
}

// LengthDelimitedCodec reports oversized frames as InvalidData on decode
// and InvalidInput on encode.
fn frame_error(error: io::Error) -> ProtocolError {
    match error.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            ProtocolError::MalformedFrame(error.to_string())
        }
        _ => ProtocolError::Io(error),
    }
}
