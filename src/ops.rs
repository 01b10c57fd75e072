//! The request engine: per-operation send/receive pairs and their
//! synchronous compositions.
//!
//! Every operation comes in three forms with one contract:
//!
//! - `<op>_send` encodes and transmits the request, returning a
//!   [`PendingRequest`] token for later correlation.
//! - `<op>_recv` decodes the response previously matched to that token by
//!   [`Session::synchronise`].
//! - `<op>_sync` composes the two for a single outstanding request, usable
//!   only on a blocking session with nothing else in flight; interrupted
//!   I/O is retried invisibly.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::CoopError;
use crate::frame::Frame;
use crate::message::RequestKind;
use crate::pending::{PendingRequest, SyncOutcome};
use crate::proto::{CrtcInfo, ErrorReport, Filter, FilterQuery, FilterTable};
use crate::session::{Progress, Session};

impl Session {
    // ── Shared plumbing ──────────────────────────────────────────

    fn next_correlation(&mut self) -> u64 {
        let id = self.next_correlation_id;
        self.next_correlation_id = self.next_correlation_id.wrapping_add(1);
        id
    }

    /// Encode, enqueue, and opportunistically flush one request.
    ///
    /// A would-block on the flush is tolerated; the caller retries
    /// [`flush`](Self::flush) before expecting a response.
    fn send_request<T: Serialize>(
        &mut self,
        kind: RequestKind,
        payload: &T,
    ) -> Result<PendingRequest, CoopError> {
        if !self.is_attached() {
            return Err(CoopError::ProtocolViolation("session has no transport"));
        }
        let payload = bincode::serialize(payload)?;
        let correlation_id = self.next_correlation();
        let frame = Frame::request(correlation_id, kind, payload)?;
        self.enqueue(&frame);
        self.in_flight += 1;
        debug!(correlation_id, kind = %kind, "request enqueued");
        self.flush()?;
        Ok(PendingRequest::new(correlation_id, kind))
    }

    /// Claim the parked response for `token`, surfacing server failures.
    fn take_response(&mut self, token: &PendingRequest) -> Result<Frame, CoopError> {
        let Some(frame) = self.parked.take() else {
            return Err(CoopError::ProtocolViolation(
                "no response has been synchronised",
            ));
        };
        if frame.correlation_id() != token.correlation_id || frame.kind() != token.kind {
            // Not ours: put it back so the owning recv can still claim it.
            self.parked = Some(frame);
            return Err(CoopError::ProtocolViolation(
                "synchronised response does not answer this request",
            ));
        }
        self.in_flight = self.in_flight.saturating_sub(1);
        if frame.is_error() {
            let report: ErrorReport = bincode::deserialize(frame.payload())?;
            return Err(CoopError::Server(report));
        }
        Ok(frame)
    }

    fn decode_response<T: DeserializeOwned>(
        &mut self,
        token: &PendingRequest,
    ) -> Result<T, CoopError> {
        let frame = self.take_response(token)?;
        Ok(bincode::deserialize(frame.payload())?)
    }

    /// Guard for the `_sync` wrappers.
    fn sync_guard(&self) -> Result<(), CoopError> {
        if self.is_nonblocking() {
            return Err(CoopError::ProtocolViolation(
                "synchronous call on a non-blocking session",
            ));
        }
        if self.in_flight() != 0 {
            return Err(CoopError::ProtocolViolation(
                "synchronous call while asynchronous requests are in flight",
            ));
        }
        Ok(())
    }

    /// Blocking-mode wait for the response to `token`.
    ///
    /// Stray messages answering no known request are dropped, per the
    /// synchronise contract.
    fn await_response(&mut self, token: &PendingRequest) -> Result<(), CoopError> {
        while self.flush()? != Progress::Complete {}
        loop {
            match self.synchronise(std::slice::from_ref(token))? {
                SyncOutcome::Matched(_) => return Ok(()),
                SyncOutcome::Unmatched | SyncOutcome::WouldBlock => continue,
            }
        }
    }

    // ── enumerate-crtcs ──────────────────────────────────────────

    /// Request the list of outputs known to the server.
    pub fn enumerate_crtcs_send(&mut self) -> Result<PendingRequest, CoopError> {
        self.send_request(RequestKind::EnumerateCrtcs, &())
    }

    /// Receive the output list. An empty list is a valid result.
    pub fn enumerate_crtcs_recv(
        &mut self,
        token: &PendingRequest,
    ) -> Result<Vec<String>, CoopError> {
        self.decode_response(token)
    }

    /// List outputs with a single synchronous round-trip.
    pub fn enumerate_crtcs_sync(&mut self) -> Result<Vec<String>, CoopError> {
        self.sync_guard()?;
        let token = self.enumerate_crtcs_send()?;
        self.await_response(&token)?;
        self.enumerate_crtcs_recv(&token)
    }

    // ── get-crtc-info ────────────────────────────────────────────

    /// Request the capability snapshot of one output.
    ///
    /// An output unknown to the server is reported back as a server error,
    /// not as an unsupported-but-present snapshot.
    pub fn get_crtc_info_send(&mut self, crtc: &str) -> Result<PendingRequest, CoopError> {
        self.send_request(RequestKind::GetCrtcInfo, &crtc)
    }

    pub fn get_crtc_info_recv(&mut self, token: &PendingRequest) -> Result<CrtcInfo, CoopError> {
        self.decode_response(token)
    }

    pub fn get_crtc_info_sync(&mut self, crtc: &str) -> Result<CrtcInfo, CoopError> {
        self.sync_guard()?;
        let token = self.get_crtc_info_send(crtc)?;
        self.await_response(&token)?;
        self.get_crtc_info_recv(&token)
    }

    // ── get-gamma ────────────────────────────────────────────────

    /// Request the active filter table of one output.
    pub fn get_gamma_send(&mut self, query: &FilterQuery) -> Result<PendingRequest, CoopError> {
        self.send_request(RequestKind::GetGamma, query)
    }

    /// Receive a filter table.
    ///
    /// Under a coalesced query the table holds exactly one entry whose
    /// priority and class are semantically undefined.
    pub fn get_gamma_recv(&mut self, token: &PendingRequest) -> Result<FilterTable, CoopError> {
        self.decode_response(token)
    }

    pub fn get_gamma_sync(&mut self, query: &FilterQuery) -> Result<FilterTable, CoopError> {
        self.sync_guard()?;
        let token = self.get_gamma_send(query)?;
        self.await_response(&token)?;
        self.get_gamma_recv(&token)
    }

    // ── set-gamma ────────────────────────────────────────────────

    /// Apply, update, or remove a filter keyed by `(crtc, class)`.
    pub fn set_gamma_send(&mut self, filter: &Filter) -> Result<PendingRequest, CoopError> {
        filter.validate()?;
        self.send_request(RequestKind::SetGamma, filter)
    }

    /// Receive the set-gamma acknowledgement. There is no partial success:
    /// the filter either fully applied or the server reports an error.
    pub fn set_gamma_recv(&mut self, token: &PendingRequest) -> Result<(), CoopError> {
        self.take_response(token)?;
        Ok(())
    }

    pub fn set_gamma_sync(&mut self, filter: &Filter) -> Result<(), CoopError> {
        self.sync_guard()?;
        let token = self.set_gamma_send(filter)?;
        self.await_response(&token)?;
        self.set_gamma_recv(&token)
    }
}
