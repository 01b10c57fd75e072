//! Error reports sent by the server.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

/// A failure (or success) report from the server.
///
/// When `custom` is false, `number` is an OS-defined error code and 0 means
/// success. When `custom` is true the error is server-specific and
/// `description`, if present, is meant to be shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code; see `custom`.
    pub number: i64,
    /// Whether this is a server-specific error rather than an OS code.
    pub custom: bool,
    /// Whether the error occurred on the server side.
    pub server_side: bool,
    /// Human-readable message, usually only set for custom errors.
    pub description: Option<String>,
}

impl ErrorReport {
    /// `number == 0` with `custom == false` denotes success.
    pub fn is_success(&self) -> bool {
        !self.custom && self.number == 0
    }

    /// The OS error this report maps to, for non-custom non-zero codes.
    pub fn os_error(&self) -> Option<io::Error> {
        if self.custom || self.number == 0 {
            return None;
        }
        i32::try_from(self.number)
            .ok()
            .map(io::Error::from_raw_os_error)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(os) = self.os_error() {
            return write!(f, "{os}");
        }
        if self.is_success() {
            return write!(f, "success");
        }
        let origin = if self.server_side { "server" } else { "client" };
        match &self.description {
            Some(description) => write!(f, "{description} ({origin}-side)"),
            None if self.number != 0 => write!(f, "custom error {} ({origin}-side)", self.number),
            None => write!(f, "unspecified custom error ({origin}-side)"),
        }
    }
}
