//! # coopgamma
//!
//! Client protocol engine for cooperative gamma servers — long-lived
//! daemons that arbitrate competing display-gamma adjustments from
//! multiple independent clients, each installing named, prioritized
//! filters per output (CRTC).
//!
//! This crate contains:
//! - **Data model**: `Ramp`, `RampSet`, `Depth`, `Filter`, `FilterQuery`,
//!   `FilterTable`, `CrtcInfo`, `Gamut`, `ErrorReport`
//! - **Codec**: `FrameHeader`, `Frame`, `WireCodec` for framed socket I/O
//! - **Session**: `Session` — transport ownership, blocking/non-blocking
//!   mode, buffered flush, and versioned state marshalling
//! - **Correlation**: `PendingRequest` + `Session::synchronise` for
//!   demultiplexing responses against concurrently in-flight requests
//! - **Request engine**: the four operations, each as `_send`/`_recv`/
//!   `_sync`
//! - **Error**: `CoopError` — typed, `thiserror`-based error hierarchy
//!
//! # Usage model
//!
//! The engine is single-threaded and caller-driven: there is no background
//! thread, and a `Session` is owned by exactly one caller at a time. The
//! synchronous wrappers cover the simple case:
//!
//! ```no_run
//! use coopgamma::Session;
//!
//! # fn main() -> Result<(), coopgamma::CoopError> {
//! let mut session = Session::connect(None, None)?;
//! for crtc in session.enumerate_crtcs_sync()? {
//!     let info = session.get_crtc_info_sync(&crtc)?;
//!     println!("{crtc}: supported={}", info.supported);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! For event-loop integration, switch the session to non-blocking mode,
//! issue `_send` calls, retry `flush` until complete, and feed readiness
//! notifications into `synchronise`.

pub mod codec;
pub mod discovery;
pub mod error;
pub mod flags;
pub mod frame;
pub mod header;
pub mod message;
pub mod ops;
pub mod pending;
pub mod proto;
pub mod session;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::WireCodec;
pub use discovery::Discovery;
pub use error::{CoopError, VersionDirection};
pub use flags::FrameFlags;
pub use frame::{Frame, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use header::{FrameHeader, HEADER_LENGTH};
pub use message::{MessageType, RequestKind};
pub use pending::{PendingRequest, SyncOutcome};
pub use proto::{
    Colourspace, CrtcInfo, Depth, ErrorReport, Filter, FilterClass, FilterQuery, FilterTable,
    Gamut, GamutPoint, Lifespan, QueriedFilter, Ramp, RampSet, Support,
};
pub use session::{Progress, Session};
