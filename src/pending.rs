//! In-flight request tokens and response demultiplexing.
//!
//! The engine never owns pending requests: tokens live in whatever
//! collection the caller keeps, and [`Session::synchronise`] only borrows
//! that collection for the duration of one call.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{CoopError, VersionDirection};
use crate::message::RequestKind;
use crate::session::{MARSHAL_VERSION, MIN_MARSHAL_VERSION, Progress, Session};

// ── PendingRequest ───────────────────────────────────────────────

/// A token for one asynchronous request awaiting its response.
///
/// Created at send time, consumed at most once by a successful `_recv`.
/// The token remembers which operation it awaits, since the four operation
/// kinds have structurally different response payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub(crate) correlation_id: u64,
    pub(crate) kind: RequestKind,
}

impl PendingRequest {
    pub(crate) fn new(correlation_id: u64, kind: RequestKind) -> Self {
        Self {
            correlation_id,
            kind,
        }
    }

    /// Which operation this token awaits.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Serialize the token for cross-process-restart persistence.
    ///
    /// Uses the same version envelope as [`Session::marshal`].
    pub fn marshal(&self) -> Result<Vec<u8>, CoopError> {
        let mut bytes = MARSHAL_VERSION.to_le_bytes().to_vec();
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }

    /// Restore a token from [`marshal`](Self::marshal) output.
    pub fn unmarshal(bytes: &[u8]) -> Result<Self, CoopError> {
        let Some(version_bytes) = bytes.get(0..4) else {
            return Err(CoopError::IncompatibleVersion {
                direction: VersionDirection::Older,
                version: 0,
            });
        };
        let version = u32::from_le_bytes(version_bytes.try_into().unwrap_or([0; 4]));
        if version > MARSHAL_VERSION {
            return Err(CoopError::IncompatibleVersion {
                direction: VersionDirection::Newer,
                version,
            });
        }
        if version < MIN_MARSHAL_VERSION {
            return Err(CoopError::IncompatibleVersion {
                direction: VersionDirection::Older,
                version,
            });
        }
        bincode::deserialize(&bytes[4..]).map_err(|_| CoopError::IncompatibleVersion {
            direction: VersionDirection::Older,
            version,
        })
    }
}

// ── SyncOutcome ──────────────────────────────────────────────────

/// Result of one [`Session::synchronise`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The arrived message answers `pending[index]`; pass that token to the
    /// matching `_recv` call next.
    Matched(usize),
    /// A complete message arrived but answers none of the given tokens. It
    /// has been consumed off the wire and dropped. Not an error.
    Unmatched,
    /// Non-blocking mode and no complete message is available yet.
    WouldBlock,
}

impl Session {
    /// Wait for one inbound message and identify which pending request it
    /// answers.
    ///
    /// Exactly one message is consumed per `Matched`/`Unmatched` outcome.
    /// Messages are matched in physical arrival order, which need not equal
    /// send order; correctness relies only on correlation.
    pub fn synchronise(&mut self, pending: &[PendingRequest]) -> Result<SyncOutcome, CoopError> {
        let frame = match self.parked.take() {
            Some(frame) => frame,
            None => match self.receive_frame()? {
                Some(frame) => frame,
                None => return Ok(SyncOutcome::WouldBlock),
            },
        };

        match pending
            .iter()
            .position(|p| p.correlation_id == frame.correlation_id())
        {
            Some(index) => {
                if pending[index].kind != frame.kind() {
                    return Err(CoopError::ProtocolViolation(
                        "response kind does not match its pending request",
                    ));
                }
                self.parked = Some(frame);
                Ok(SyncOutcome::Matched(index))
            }
            None => {
                trace!(
                    correlation_id = frame.correlation_id(),
                    "dropping response that matches no pending request"
                );
                self.settle_if_issued(frame.correlation_id());
                Ok(SyncOutcome::Unmatched)
            }
        }
    }

    /// Discard the next inbound message without decoding it.
    ///
    /// Discards the already-synchronised message first if one is parked,
    /// otherwise consumes one message off the wire.
    pub fn skip_message(&mut self) -> Result<Progress, CoopError> {
        if let Some(frame) = self.parked.take() {
            self.settle_if_issued(frame.correlation_id());
            return Ok(Progress::Complete);
        }
        match self.receive_frame()? {
            Some(frame) => {
                self.settle_if_issued(frame.correlation_id());
                Ok(Progress::Complete)
            }
            None => Ok(Progress::WouldBlock),
        }
    }

    /// Count a dropped message against `in_flight` only when its
    /// correlation id is one this session handed out; a stray frame from a
    /// confused peer must not weaken the outstanding-request accounting.
    fn settle_if_issued(&mut self, correlation_id: u64) {
        if correlation_id >= 1 && correlation_id < self.next_correlation_id {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_marshal_roundtrip() {
        let token = PendingRequest::new(42, RequestKind::GetGamma);
        let bytes = token.marshal().unwrap();
        let restored = PendingRequest::unmarshal(&bytes).unwrap();
        assert_eq!(restored, token);
        assert_eq!(restored.kind(), RequestKind::GetGamma);
    }

    #[test]
    fn token_unmarshal_rejects_future_version() {
        let token = PendingRequest::new(1, RequestKind::SetGamma);
        let mut bytes = token.marshal().unwrap();
        bytes[0..4].copy_from_slice(&(MARSHAL_VERSION + 5).to_le_bytes());
        assert!(matches!(
            PendingRequest::unmarshal(&bytes),
            Err(CoopError::IncompatibleVersion {
                direction: VersionDirection::Newer,
                ..
            })
        ));
    }

    #[test]
    fn token_unmarshal_rejects_truncation() {
        let token = PendingRequest::new(1, RequestKind::SetGamma);
        let bytes = token.marshal().unwrap();
        assert!(matches!(
            PendingRequest::unmarshal(&bytes[..5]),
            Err(CoopError::IncompatibleVersion {
                direction: VersionDirection::Older,
                ..
            })
        ));
    }
}
