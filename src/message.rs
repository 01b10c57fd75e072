//! Protocol message classification.
//!
//! Uses proper enums with `TryFrom` — no panics on unknown values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoopError;

// ── MessageType ──────────────────────────────────────────────────

/// Distinguishes client requests from server responses.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// A request sent from client to server.
    Request = 0x1,
    /// A reply sent from server to client.
    Response = 0x2,
}

impl TryFrom<u32> for MessageType {
    type Error = CoopError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x1 => Ok(MessageType::Request),
            0x2 => Ok(MessageType::Response),
            _ => Err(CoopError::UnknownVariant {
                type_name: "MessageType",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Request => write!(f, "Request"),
            MessageType::Response => write!(f, "Response"),
        }
    }
}

// ── RequestKind ──────────────────────────────────────────────────

/// The four operations understood by a cooperative gamma server.
///
/// Every request carries its kind in the frame header and the server echoes
/// it back in the response, so a pending request knows which response shape
/// to expect.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// List the output (CRTC) identifiers known to the server.
    EnumerateCrtcs = 0x1,
    /// Fetch the gamma-ramp capability snapshot for one output.
    GetCrtcInfo = 0x2,
    /// Fetch the table of currently applied filters for one output.
    GetGamma = 0x3,
    /// Apply, update, or remove a filter.
    SetGamma = 0x4,
}

impl TryFrom<u32> for RequestKind {
    type Error = CoopError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x1 => Ok(RequestKind::EnumerateCrtcs),
            0x2 => Ok(RequestKind::GetCrtcInfo),
            0x3 => Ok(RequestKind::GetGamma),
            0x4 => Ok(RequestKind::SetGamma),
            _ => Err(CoopError::UnknownVariant {
                type_name: "RequestKind",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::EnumerateCrtcs => write!(f, "enumerate-crtcs"),
            RequestKind::GetCrtcInfo => write!(f, "get-crtc-info"),
            RequestKind::GetGamma => write!(f, "get-gamma"),
            RequestKind::SetGamma => write!(f, "set-gamma"),
        }
    }
}
