//! Data model for the cooperative gamma protocol.
//!
//! Each sub-module defines the value types carried inside [`Frame`]
//! payloads. Payloads are serialized with `serde` + `bincode`.
//!
//! [`Frame`]: crate::frame::Frame

pub mod crtc;
pub mod filter;
pub mod ramps;
pub mod report;

// Re-export the most commonly used types at the proto level.
pub use crtc::{Colourspace, CrtcInfo, Gamut, GamutPoint, Support};
pub use filter::{Filter, FilterClass, FilterQuery, FilterTable, Lifespan, QueriedFilter};
pub use ramps::{Depth, Ramp, RampSet};
pub use report::ErrorReport;
