//! One wire frame: header plus payload.

use crate::error::CoopError;
use crate::flags::FrameFlags;
use crate::header::{FrameHeader, HEADER_LENGTH};
use crate::message::{MessageType, RequestKind};

/// Maximum payload size accepted or produced by this engine.
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Maximum total frame size.
pub const MAX_FRAME_SIZE: usize = HEADER_LENGTH + MAX_PAYLOAD_SIZE;

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    header: FrameHeader,
    payload: Vec<u8>,
}

impl Frame {
    /// Build a client request frame.
    pub fn request(
        correlation_id: u64,
        kind: RequestKind,
        payload: Vec<u8>,
    ) -> Result<Self, CoopError> {
        Self::build(
            MessageType::Request,
            kind,
            FrameFlags::NONE,
            correlation_id,
            payload,
        )
    }

    /// Build a server response frame.
    ///
    /// Only used by test doubles on this side of the wire; a real server
    /// produces these.
    pub fn response(
        correlation_id: u64,
        kind: RequestKind,
        flags: FrameFlags,
        payload: Vec<u8>,
    ) -> Result<Self, CoopError> {
        Self::build(MessageType::Response, kind, flags, correlation_id, payload)
    }

    fn build(
        message_type: MessageType,
        kind: RequestKind,
        flags: FrameFlags,
        correlation_id: u64,
        payload: Vec<u8>,
    ) -> Result<Self, CoopError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(CoopError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let mut header = FrameHeader::new(
            message_type,
            kind,
            flags,
            correlation_id,
            payload.len() as u64,
        );
        header.set_checksum(checksum_of(&payload));
        Ok(Self { header, payload })
    }

    /// Reassemble a frame received off the wire, verifying its checksum.
    pub(crate) fn from_wire(header: FrameHeader, payload: Vec<u8>) -> Result<Self, CoopError> {
        if payload.len() as u64 != header.payload_length() {
            return Err(CoopError::ProtocolViolation(
                "frame payload length does not match header",
            ));
        }
        let frame = Self { header, payload };
        if frame.header.checksum() != checksum_of(&frame.payload) {
            return Err(CoopError::ChecksumMismatch);
        }
        Ok(frame)
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn message_type(&self) -> MessageType {
        self.header.message_type()
    }

    pub fn kind(&self) -> RequestKind {
        self.header.kind()
    }

    pub fn flags(&self) -> FrameFlags {
        self.header.flags()
    }

    pub fn correlation_id(&self) -> u64 {
        self.header.correlation_id()
    }

    /// Whether this is a failure response carrying an `ErrorReport`.
    pub fn is_error(&self) -> bool {
        self.header.flags().contains(FrameFlags::ERROR)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes().to_vec();
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

/// First four bytes of the blake3 hash of the payload, zero when empty.
fn checksum_of(payload: &[u8]) -> u32 {
    if payload.is_empty() {
        return 0;
    }
    let hash = blake3::hash(payload);
    u32::from_le_bytes(hash.as_bytes()[0..4].try_into().unwrap_or([0; 4]))
}
