//! Output (CRTC) capability snapshots, colourspaces, and gamuts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoopError;
use crate::proto::ramps::{Depth, RampSet};

// ── Support ──────────────────────────────────────────────────────

/// Whether gamma adjustments are supported on an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Support {
    /// Gamma adjustments are not supported.
    No,
    /// The server does not know whether adjustments are supported.
    Maybe,
    /// Gamma adjustments are supported.
    Yes,
}

impl fmt::Display for Support {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Support::No => write!(f, "no"),
            Support::Maybe => write!(f, "maybe"),
            Support::Yes => write!(f, "yes"),
        }
    }
}

// ── Colourspace ──────────────────────────────────────────────────

/// Classification of a monitor's colour model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Colourspace {
    /// The colourspace is unknown.
    Unknown,
    /// Standard RGB.
    Srgb,
    /// RGB other than sRGB.
    Rgb,
    /// Non-RGB multicolour.
    NonRgb,
    /// Monochrome or some other single-colour scale.
    Grey,
}

impl Colourspace {
    /// Whether gamut data is meaningful for this colourspace.
    pub fn is_rgb_like(self) -> bool {
        matches!(self, Colourspace::Srgb | Colourspace::Rgb)
    }
}

impl fmt::Display for Colourspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Colourspace::Unknown => write!(f, "unknown"),
            Colourspace::Srgb => write!(f, "sRGB"),
            Colourspace::Rgb => write!(f, "RGB"),
            Colourspace::NonRgb => write!(f, "non-RGB"),
            Colourspace::Grey => write!(f, "grey"),
        }
    }
}

// ── Gamut ────────────────────────────────────────────────────────

/// One chromaticity coordinate (CIE xyY), stored as fixed-point raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamutPoint {
    /// The x-value multiplied by 1024.
    pub x_raw: i32,
    /// The y-value multiplied by 1024.
    pub y_raw: i32,
}

impl GamutPoint {
    pub fn new(x_raw: i32, y_raw: i32) -> Self {
        Self { x_raw, y_raw }
    }

    /// The decoded x-value. Always recomputed from the raw value.
    pub fn x(&self) -> f64 {
        f64::from(self.x_raw) / 1024.0
    }

    /// The decoded y-value. Always recomputed from the raw value.
    pub fn y(&self) -> f64 {
        f64::from(self.y_raw) / 1024.0
    }
}

/// The monitor's stimulus triangle plus white point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gamut {
    pub red: GamutPoint,
    pub green: GamutPoint,
    pub blue: GamutPoint,
    pub white: GamutPoint,
}

// ── CrtcInfo ─────────────────────────────────────────────────────

/// Gamma ramp meta information for one output.
///
/// `depth` and the per-channel sizes are undefined when `supported` is
/// [`Support::No`]. `gamut` is `None` when no measurement is available,
/// which is distinct from a zeroed measurement; check `colourspace` before
/// interpreting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrtcInfo {
    /// Whether a cooperative gamma server is actually running for this
    /// output.
    pub cooperative: bool,
    /// Whether gamma adjustments are supported on the output.
    pub supported: Support,
    /// The stop datatype, when known.
    pub depth: Option<Depth>,
    /// Stops in the red ramp, when known.
    pub red_size: Option<u32>,
    /// Stops in the green ramp, when known.
    pub green_size: Option<u32>,
    /// Stops in the blue ramp, when known.
    pub blue_size: Option<u32>,
    /// The monitor's colourspace.
    pub colourspace: Colourspace,
    /// Measured gamut, when available.
    pub gamut: Option<Gamut>,
}

impl CrtcInfo {
    /// Build a zero-filled [`RampSet`] matching this output's geometry.
    pub fn make_ramps(&self) -> Result<RampSet, CoopError> {
        match (self.depth, self.red_size, self.green_size, self.blue_size) {
            (Some(depth), Some(r), Some(g), Some(b)) => Ok(RampSet::of_size(
                depth,
                r as usize,
                g as usize,
                b as usize,
            )),
            _ => Err(CoopError::ProtocolViolation(
                "output does not report ramp geometry",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamut_point_quotient() {
        let p = GamutPoint::new(656, 338);
        assert!((p.x() - 0.640625).abs() < 1e-9);
        assert!((p.y() - 0.330078125).abs() < 1e-9);
    }

    #[test]
    fn colourspace_rgb_like() {
        assert!(Colourspace::Srgb.is_rgb_like());
        assert!(Colourspace::Rgb.is_rgb_like());
        assert!(!Colourspace::Grey.is_rgb_like());
        assert!(!Colourspace::Unknown.is_rgb_like());
    }

    #[test]
    fn make_ramps_uses_geometry() {
        let info = CrtcInfo {
            cooperative: true,
            supported: Support::Yes,
            depth: Some(Depth::U16),
            red_size: Some(1024),
            green_size: Some(1024),
            blue_size: Some(512),
            colourspace: Colourspace::Srgb,
            gamut: None,
        };
        let ramps = info.make_ramps().unwrap();
        assert_eq!(ramps.depth(), Depth::U16);
        assert_eq!(ramps.red().len(), 1024);
        assert_eq!(ramps.blue().len(), 512);
    }

    #[test]
    fn make_ramps_requires_geometry() {
        let info = CrtcInfo {
            cooperative: true,
            supported: Support::No,
            depth: None,
            red_size: None,
            green_size: None,
            blue_size: None,
            colourspace: Colourspace::Unknown,
            gamut: None,
        };
        assert!(info.make_ramps().is_err());
    }

    #[test]
    fn crtc_info_serde_roundtrip() {
        let info = CrtcInfo {
            cooperative: true,
            supported: Support::Yes,
            depth: Some(Depth::U16),
            red_size: Some(256),
            green_size: Some(256),
            blue_size: Some(256),
            colourspace: Colourspace::Srgb,
            gamut: Some(Gamut {
                red: GamutPoint::new(656, 338),
                green: GamutPoint::new(307, 614),
                blue: GamutPoint::new(154, 61),
                white: GamutPoint::new(320, 337),
            }),
        };
        let bytes = bincode::serialize(&info).unwrap();
        let decoded: CrtcInfo = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, info);
    }
}
