//! Incremental frame codec over `BytesMut`.
//!
//! The decoder is driven by [`Session`](crate::session::Session): bytes read
//! from the socket are appended to an accumulation buffer and `decode` is
//! asked for the next complete frame, returning `Ok(None)` until one is
//! available.

use bytes::{Buf, BytesMut};

use crate::error::CoopError;
use crate::frame::{Frame, MAX_PAYLOAD_SIZE};
use crate::header::{FrameHeader, HEADER_LENGTH, HeaderBytes};

/// Stateless encoder/decoder for wire frames.
pub struct WireCodec;

impl WireCodec {
    /// Append the encoded frame to `dst`.
    pub fn encode(frame: &Frame, dst: &mut BytesMut) {
        dst.extend_from_slice(&frame.header().to_bytes());
        dst.extend_from_slice(frame.payload());
    }

    /// Try to decode one complete frame from the front of `src`.
    ///
    /// Returns `Ok(None)` when `src` does not yet hold a full frame; the
    /// consumed prefix is removed from `src` only on success.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Frame>, CoopError> {
        if src.len() < HEADER_LENGTH {
            return Ok(None);
        }

        let header_bytes: HeaderBytes = src[..HEADER_LENGTH]
            .try_into()
            .map_err(|_| CoopError::ProtocolViolation("short header slice"))?;
        let header = FrameHeader::from_bytes(&header_bytes)?;

        if header.payload_length() > MAX_PAYLOAD_SIZE as u64 {
            return Err(CoopError::PayloadTooLarge {
                size: usize::try_from(header.payload_length()).unwrap_or(usize::MAX),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let payload_length = header.payload_length() as usize;
        if src.len() < HEADER_LENGTH + payload_length {
            return Ok(None);
        }

        src.advance(HEADER_LENGTH);
        let payload = src.split_to(payload_length).to_vec();
        Frame::from_wire(header, payload).map(Some)
    }
}
