//! Fixed-layout frame header.
//!
//! ```text
//! magic:           u32  (4)  "CGP0"
//! checksum:        u32  (4)  first 4 bytes of blake3(payload), 0 if empty
//! message_type:    u32  (4)
//! kind:            u32  (4)
//! flags:           u32  (4)
//! correlation_id:  u64  (8)
//! payload_length:  u64  (8)
//! ```
//!
//! All fields little-endian.

use crate::error::CoopError;
use crate::flags::FrameFlags;
use crate::message::{MessageType, RequestKind};

/// Magic bytes opening every frame.
pub const MAGIC: [u8; 4] = *b"CGP0";

/// Encoded header size on the wire.
pub const HEADER_LENGTH: usize = 36;

pub type HeaderBytes = [u8; HEADER_LENGTH];

/// The parsed header of one wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    message_type: MessageType,
    kind: RequestKind,
    flags: FrameFlags,
    correlation_id: u64,
    checksum: u32,
    payload_length: u64,
}

impl FrameHeader {
    pub fn new(
        message_type: MessageType,
        kind: RequestKind,
        flags: FrameFlags,
        correlation_id: u64,
        payload_length: u64,
    ) -> Self {
        Self {
            message_type,
            kind,
            flags,
            correlation_id,
            checksum: 0,
            payload_length,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn flags(&self) -> FrameFlags {
        self.flags
    }

    pub fn correlation_id(&self) -> u64 {
        self.correlation_id
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn set_checksum(&mut self, checksum: u32) {
        self.checksum = checksum;
    }

    pub fn payload_length(&self) -> u64 {
        self.payload_length
    }

    pub fn to_bytes(&self) -> HeaderBytes {
        let mut bytes: HeaderBytes = [0; HEADER_LENGTH];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        bytes[8..12].copy_from_slice(&(self.message_type as u32).to_le_bytes());
        bytes[12..16].copy_from_slice(&(self.kind as u32).to_le_bytes());
        bytes[16..20].copy_from_slice(&self.flags.bits().to_le_bytes());
        bytes[20..28].copy_from_slice(&self.correlation_id.to_le_bytes());
        bytes[28..36].copy_from_slice(&self.payload_length.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &HeaderBytes) -> Result<Self, CoopError> {
        if bytes[0..4] != MAGIC {
            return Err(CoopError::InvalidMagic);
        }
        let le_u32 = |range: std::ops::Range<usize>| {
            u32::from_le_bytes(bytes[range].try_into().unwrap_or([0; 4]))
        };
        let le_u64 = |range: std::ops::Range<usize>| {
            u64::from_le_bytes(bytes[range].try_into().unwrap_or([0; 8]))
        };
        Ok(Self {
            checksum: le_u32(4..8),
            message_type: MessageType::try_from(le_u32(8..12))?,
            kind: RequestKind::try_from(le_u32(12..16))?,
            flags: FrameFlags::from_bits_truncate(le_u32(16..20)),
            correlation_id: le_u64(20..28),
            payload_length: le_u64(28..36),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let mut header = FrameHeader::new(
            MessageType::Response,
            RequestKind::GetGamma,
            FrameFlags::ERROR,
            0xDEAD_BEEF,
            42,
        );
        header.set_checksum(0x1234_5678);

        let bytes = header.to_bytes();
        let decoded = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let header = FrameHeader::new(
            MessageType::Request,
            RequestKind::EnumerateCrtcs,
            FrameFlags::NONE,
            1,
            0,
        );
        let mut bytes = header.to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(CoopError::InvalidMagic)
        ));
    }

    #[test]
    fn rejects_unknown_kind() {
        let header = FrameHeader::new(
            MessageType::Request,
            RequestKind::EnumerateCrtcs,
            FrameFlags::NONE,
            1,
            0,
        );
        let mut bytes = header.to_bytes();
        bytes[12..16].copy_from_slice(&0xFFu32.to_le_bytes());
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(CoopError::UnknownVariant { .. })
        ));
    }
}
