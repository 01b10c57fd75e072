//! Domain-specific error types for the coopgamma client engine.
//!
//! All fallible operations return `Result<T, CoopError>`.
//! Would-block is deliberately *not* an error: operations that can
//! would-block report it through [`Progress`] or [`SyncOutcome`] instead,
//! so non-blocking callers never have to fish it out of an error path.
//!
//! [`Progress`]: crate::session::Progress
//! [`SyncOutcome`]: crate::pending::SyncOutcome

use std::fmt;

use thiserror::Error;

use crate::proto::ErrorReport;

/// The canonical error type for the coopgamma client engine.
#[derive(Debug, Error)]
pub enum CoopError {
    // ── Transport Errors ─────────────────────────────────────────
    /// The socket layer reported an error.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A server had to be spawned and its readiness could not be confirmed.
    #[error("server start failure: {0}")]
    ServerStart(String),

    // ── Frame Errors ─────────────────────────────────────────────
    /// Received bytes that do not start with the frame magic sequence.
    #[error("invalid magic bytes: expected CGP0")]
    InvalidMagic,

    /// The frame payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // ── Protocol Errors ──────────────────────────────────────────
    /// A locally detected contract violation.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// A filter class identifier is not of the `package::command::rule` form.
    #[error("invalid filter class {0:?}: expected \"package::command::rule\"")]
    InvalidFilterClass(String),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Peer Errors ──────────────────────────────────────────────
    /// The server reported a failure for a request.
    #[error("server error: {0}")]
    Server(ErrorReport),

    // ── Marshalled State Errors ──────────────────────────────────
    /// Marshalled session or request state is too old or too new to read.
    #[error("incompatible marshalled state: version {version} is {direction} than supported")]
    IncompatibleVersion {
        direction: VersionDirection,
        version: u32,
    },
}

/// Which way a marshalled-state version mismatch points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionDirection {
    /// The blob predates the oldest version this engine understands.
    Older,
    /// The blob was produced by a newer engine.
    Newer,
}

impl fmt::Display for VersionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionDirection::Older => write!(f, "older"),
            VersionDirection::Newer => write!(f, "newer"),
        }
    }
}

impl From<Box<bincode::ErrorKind>> for CoopError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        CoopError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = CoopError::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = CoopError::PayloadTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = CoopError::IncompatibleVersion {
            direction: VersionDirection::Newer,
            version: 9,
        };
        assert!(e.to_string().contains("newer"));
        assert!(e.to_string().contains('9'));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: CoopError = io_err.into();
        assert!(matches!(e, CoopError::Transport(_)));
    }
}
