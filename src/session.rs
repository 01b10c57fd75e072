//! One client-to-server conversation.
//!
//! A `Session` exclusively owns its transport and outbound buffer. It is
//! single-owner by design: share one across threads only behind external
//! locking, or give each thread its own.
//!
//! # I/O contract
//!
//! In blocking mode (the default), `flush` and the receive path retry
//! interrupted system calls internally; the caller never observes them. In
//! non-blocking mode the same operations return
//! [`Progress::WouldBlock`] / [`SyncOutcome::WouldBlock`] instead of
//! suspending, and the caller re-invokes them once the transport is ready
//! again — typically from an external event loop.
//!
//! [`SyncOutcome::WouldBlock`]: crate::pending::SyncOutcome::WouldBlock

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::codec::WireCodec;
use crate::discovery::Discovery;
use crate::error::{CoopError, VersionDirection};
use crate::frame::Frame;

/// Newest marshalled-state version this engine writes and reads.
pub const MARSHAL_VERSION: u32 = 1;

/// Oldest marshalled-state version this engine still reads.
pub const MIN_MARSHAL_VERSION: u32 = 1;

// ── Progress ─────────────────────────────────────────────────────

/// Outcome of a send-side operation that can would-block.
///
/// `WouldBlock` is a defined non-error outcome in non-blocking mode: retry
/// the same operation once the transport is writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The operation ran to completion.
    Complete,
    /// Non-blocking mode and the transport is not ready; retry later.
    WouldBlock,
}

// ── Session ──────────────────────────────────────────────────────

/// A connection to a cooperative gamma server.
#[derive(Debug)]
pub struct Session {
    stream: Option<UnixStream>,
    nonblocking: bool,
    outbound: BytesMut,
    inbound: BytesMut,
    pub(crate) parked: Option<Frame>,
    pub(crate) next_correlation_id: u64,
    pub(crate) in_flight: u64,
}

impl Session {
    /// Connect to the server selected by `method` and `site`.
    ///
    /// `None` selectors mean automatic discovery. A server is spawned on
    /// demand when none is reachable; [`CoopError::ServerStart`] is
    /// returned when its readiness could not be confirmed.
    pub fn connect(method: Option<&str>, site: Option<&str>) -> Result<Self, CoopError> {
        let mut discovery = Discovery::default();
        if let Some(method) = method {
            discovery = discovery.method(method);
        }
        if let Some(site) = site {
            discovery = discovery.site(site);
        }
        Self::connect_with(&discovery)
    }

    /// Connect through an explicit [`Discovery`] configuration.
    pub fn connect_with(discovery: &Discovery) -> Result<Self, CoopError> {
        let stream = discovery.connect()?;
        debug!("session established");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-connected stream in a blocking-mode session.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            stream: Some(stream),
            nonblocking: false,
            outbound: BytesMut::new(),
            inbound: BytesMut::new(),
            parked: None,
            next_correlation_id: 1,
            in_flight: 0,
        }
    }

    // ── Transport ownership ──────────────────────────────────────

    /// Take the transport out of the session.
    ///
    /// The session no longer closes the stream on drop; the caller owns it
    /// and may hand it back later with [`attach`](Self::attach), keep the
    /// OS-level connection alive across a restart via
    /// [`marshal`](Self::marshal), or pass it to another process.
    pub fn detach(&mut self) -> Option<UnixStream> {
        self.stream.take()
    }

    /// Give the session a transport.
    ///
    /// The session's blocking mode is re-applied to the stream.
    pub fn attach(&mut self, stream: UnixStream) -> Result<(), CoopError> {
        if self.stream.is_some() {
            return Err(CoopError::ProtocolViolation(
                "session already owns a transport",
            ));
        }
        stream.set_nonblocking(self.nonblocking)?;
        self.stream = Some(stream);
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&self) -> Result<&UnixStream, CoopError> {
        self.stream
            .as_ref()
            .ok_or(CoopError::ProtocolViolation("session has no transport"))
    }

    // ── I/O mode ─────────────────────────────────────────────────

    /// Toggle between blocking and non-blocking I/O.
    ///
    /// After enabling non-blocking mode, [`flush`](Self::flush) and
    /// [`synchronise`](Self::synchronise) may report would-block; that is
    /// not an error, and `flush` must be retried to success before further
    /// requests are issued.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> Result<(), CoopError> {
        self.stream()?.set_nonblocking(nonblocking)?;
        self.nonblocking = nonblocking;
        Ok(())
    }

    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }

    /// Number of requests sent but not yet received or skipped.
    pub fn in_flight(&self) -> u64 {
        self.in_flight
    }

    // ── Send path ────────────────────────────────────────────────

    /// Append an encoded frame to the outbound buffer without flushing.
    pub(crate) fn enqueue(&mut self, frame: &Frame) {
        WireCodec::encode(frame, &mut self.outbound);
    }

    /// Bytes waiting in the outbound buffer.
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Drain the outbound buffer into the transport.
    ///
    /// Interrupted writes are retried. In non-blocking mode a not-ready
    /// transport yields [`Progress::WouldBlock`] with partial progress
    /// retained; retry until [`Progress::Complete`] — this is the only way
    /// a partially sent frame is completed.
    pub fn flush(&mut self) -> Result<Progress, CoopError> {
        let Some(stream) = self.stream.as_ref() else {
            return Err(CoopError::ProtocolViolation("session has no transport"));
        };
        let mut stream = stream;
        while !self.outbound.is_empty() {
            match stream.write(&self.outbound) {
                Ok(0) => {
                    return Err(CoopError::Transport(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "server closed the connection",
                    )));
                }
                Ok(n) => {
                    trace!(bytes = n, remaining = self.outbound.len() - n, "flushed");
                    self.outbound.advance(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Progress::WouldBlock);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Progress::Complete)
    }

    // ── Receive path ─────────────────────────────────────────────

    /// Read until one complete frame is available.
    ///
    /// Returns `Ok(None)` in non-blocking mode when the transport has no
    /// complete message yet. Interrupted reads are retried.
    pub(crate) fn receive_frame(&mut self) -> Result<Option<Frame>, CoopError> {
        loop {
            if let Some(frame) = WireCodec::decode(&mut self.inbound)? {
                trace!(
                    correlation_id = frame.correlation_id(),
                    kind = %frame.kind(),
                    "received frame"
                );
                return Ok(Some(frame));
            }
            let Some(stream) = self.stream.as_ref() else {
                return Err(CoopError::ProtocolViolation("session has no transport"));
            };
            let mut stream = stream;
            let mut buf = [0u8; 4096];
            match stream.read(&mut buf) {
                Ok(0) => {
                    return Err(CoopError::Transport(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "server closed the connection",
                    )));
                }
                Ok(n) => self.inbound.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    // ── Marshalling ──────────────────────────────────────────────

    /// Serialize the session's protocol-relevant state.
    ///
    /// The transport itself is never serialized; pair this with
    /// [`detach`](Self::detach) to keep the OS-level connection alive, and
    /// [`attach`](Self::attach) after [`unmarshal`](Self::unmarshal) to
    /// resume it.
    pub fn marshal(&self) -> Result<Vec<u8>, CoopError> {
        let state = SessionState {
            next_correlation_id: self.next_correlation_id,
            in_flight: self.in_flight,
            nonblocking: self.nonblocking,
            outbound: self.outbound.to_vec(),
            inbound: self.inbound.to_vec(),
            parked: self.parked.as_ref().map(Frame::to_bytes),
        };
        let mut bytes = MARSHAL_VERSION.to_le_bytes().to_vec();
        bytes.extend(bincode::serialize(&state)?);
        Ok(bytes)
    }

    /// Restore a session from [`marshal`](Self::marshal) output.
    ///
    /// The restored session is detached; version mismatches fail closed
    /// with [`CoopError::IncompatibleVersion`], never partially
    /// interpreted.
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
        // A blob that declares a supported version but lacks required
        // fields came from an older, incomplete writer.
        let state: SessionState =
            bincode::deserialize(&bytes[4..]).map_err(|_| CoopError::IncompatibleVersion {
                direction: VersionDirection::Older,
                version,
            })?;

        let parked = match state.parked {
            Some(frame_bytes) => {
                let mut buf = BytesMut::from(&frame_bytes[..]);
                match WireCodec::decode(&mut buf) {
                    Ok(Some(frame)) => Some(frame),
                    _ => {
                        return Err(CoopError::IncompatibleVersion {
                            direction: VersionDirection::Older,
                            version,
                        });
                    }
                }
            }
            None => None,
        };

        Ok(Self {
            stream: None,
            nonblocking: state.nonblocking,
            outbound: BytesMut::from(&state.outbound[..]),
            inbound: BytesMut::from(&state.inbound[..]),
            parked,
            next_correlation_id: state.next_correlation_id,
            in_flight: state.in_flight,
        })
    }
}

/// Version-1 marshalled session body.
#[derive(Serialize, Deserialize)]
struct SessionState {
    next_correlation_id: u64,
    in_flight: u64,
    nonblocking: bool,
    outbound: Vec<u8>,
    inbound: Vec<u8>,
    parked: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FrameFlags;
    use crate::message::RequestKind;

    fn pair() -> (Session, UnixStream) {
        let (a, b) = UnixStream::pair().unwrap();
        (Session::from_stream(a), b)
    }

    #[test]
    fn flush_writes_enqueued_frames() {
        let (mut session, peer) = pair();
        let frame = Frame::request(1, RequestKind::GetCrtcInfo, b"eDP-1".to_vec()).unwrap();
        session.enqueue(&frame);
        assert!(session.outbound_len() > 0);

        assert_eq!(session.flush().unwrap(), Progress::Complete);
        assert_eq!(session.outbound_len(), 0);

        let mut peer = peer;
        let mut received = vec![0u8; frame.to_bytes().len()];
        peer.read_exact(&mut received).unwrap();
        assert_eq!(received, frame.to_bytes());
    }

    #[test]
    fn receive_reassembles_split_frame() {
        let (mut session, mut peer) = pair();
        let frame = Frame::response(
            4,
            RequestKind::EnumerateCrtcs,
            FrameFlags::NONE,
            b"payload".to_vec(),
        )
        .unwrap();
        let bytes = frame.to_bytes();
        let (head, tail) = bytes.split_at(10);

        peer.write_all(head).unwrap();
        session.set_nonblocking(true).unwrap();
        assert!(session.receive_frame().unwrap().is_none());

        peer.write_all(tail).unwrap();
        // Give the kernel no excuse: a unix socketpair delivers
        // immediately, so the frame must now be complete.
        let received = loop {
            if let Some(frame) = session.receive_frame().unwrap() {
                break frame;
            }
        };
        assert_eq!(received, frame);
    }

    #[test]
    fn detach_and_attach_transfer_ownership() {
        let (mut session, _peer) = pair();
        assert!(session.is_attached());

        let stream = session.detach().unwrap();
        assert!(!session.is_attached());
        assert!(matches!(
            session.flush(),
            Err(CoopError::ProtocolViolation(_))
        ));

        session.attach(stream).unwrap();
        assert!(session.is_attached());
    }

    #[test]
    fn attach_rejects_double_ownership() {
        let (mut session, _peer) = pair();
        let (extra, _other) = UnixStream::pair().unwrap();
        assert!(matches!(
            session.attach(extra),
            Err(CoopError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn marshal_roundtrip_preserves_state() {
        let (mut session, _peer) = pair();
        let frame = Frame::request(9, RequestKind::SetGamma, b"pending".to_vec()).unwrap();
        session.enqueue(&frame);
        session.next_correlation_id = 17;
        session.in_flight = 2;
        session.parked =
            Some(Frame::response(3, RequestKind::GetGamma, FrameFlags::NONE, Vec::new()).unwrap());

        let bytes = session.marshal().unwrap();
        let restored = Session::unmarshal(&bytes).unwrap();

        assert!(!restored.is_attached());
        assert_eq!(restored.next_correlation_id, 17);
        assert_eq!(restored.in_flight, 2);
        assert_eq!(restored.outbound_len(), session.outbound_len());
        assert_eq!(restored.parked, session.parked);
    }

    #[test]
    fn unmarshal_rejects_future_version() {
        let (session, _peer) = pair();
        let mut bytes = session.marshal().unwrap();
        bytes[0..4].copy_from_slice(&(MARSHAL_VERSION + 1).to_le_bytes());

        match Session::unmarshal(&bytes) {
            Err(CoopError::IncompatibleVersion { direction, version }) => {
                assert_eq!(direction, VersionDirection::Newer);
                assert_eq!(version, MARSHAL_VERSION + 1);
            }
            other => panic!("expected IncompatibleVersion, got {other:?}"),
        }
    }

    #[test]
    fn unmarshal_rejects_truncated_blob() {
        let (session, _peer) = pair();
        let bytes = session.marshal().unwrap();

        // Missing required fields of a declared-supported version.
        match Session::unmarshal(&bytes[..6]) {
            Err(CoopError::IncompatibleVersion { direction, .. }) => {
                assert_eq!(direction, VersionDirection::Older);
            }
            other => panic!("expected IncompatibleVersion, got {other:?}"),
        }

        // Not even a version tag.
        assert!(matches!(
            Session::unmarshal(&bytes[..2]),
            Err(CoopError::IncompatibleVersion {
                direction: VersionDirection::Older,
                ..
            })
        ));
    }
}
