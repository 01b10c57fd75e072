//! Gamma ramps and their stop representation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoopError;

// ── Depth ────────────────────────────────────────────────────────

/// The datatype used for gamma ramp stops.
///
/// Serialized as the server's numeric convention: the number of bits for
/// integral types, negative for floating-point types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Depth {
    /// Unsigned 8-bit integer stops.
    U8,
    /// Unsigned 16-bit integer stops.
    U16,
    /// Unsigned 32-bit integer stops.
    U32,
    /// Unsigned 64-bit integer stops.
    U64,
    /// Single-precision floating-point stops.
    F32,
    /// Double-precision floating-point stops.
    F64,
}

impl Depth {
    /// The server's numeric encoding of this depth.
    pub fn wire_value(self) -> i32 {
        match self {
            Depth::U8 => 8,
            Depth::U16 => 16,
            Depth::U32 => 32,
            Depth::U64 => 64,
            Depth::F32 => -1,
            Depth::F64 => -2,
        }
    }

    pub fn from_wire(value: i32) -> Result<Self, CoopError> {
        match value {
            8 => Ok(Depth::U8),
            16 => Ok(Depth::U16),
            32 => Ok(Depth::U32),
            64 => Ok(Depth::U64),
            -1 => Ok(Depth::F32),
            -2 => Ok(Depth::F64),
            _ => Err(CoopError::UnknownVariant {
                type_name: "Depth",
                value: value as u32 as u64,
            }),
        }
    }

    pub fn is_integral(self) -> bool {
        !matches!(self, Depth::F32 | Depth::F64)
    }
}

impl TryFrom<i32> for Depth {
    type Error = CoopError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_wire(value)
    }
}

impl From<Depth> for i32 {
    fn from(depth: Depth) -> Self {
        depth.wire_value()
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::U8 => write!(f, "uint8"),
            Depth::U16 => write!(f, "uint16"),
            Depth::U32 => write!(f, "uint32"),
            Depth::U64 => write!(f, "uint64"),
            Depth::F32 => write!(f, "float"),
            Depth::F64 => write!(f, "double"),
        }
    }
}

// ── Ramp ─────────────────────────────────────────────────────────

/// One channel's gamma lookup table.
///
/// The storage variant always matches the ramp's [`Depth`], so a decoded
/// ramp can never hold stops of the wrong width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ramp {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Ramp {
    /// A zero-filled ramp of `stops` entries at the given depth.
    pub fn of_size(depth: Depth, stops: usize) -> Self {
        match depth {
            Depth::U8 => Ramp::U8(vec![0; stops]),
            Depth::U16 => Ramp::U16(vec![0; stops]),
            Depth::U32 => Ramp::U32(vec![0; stops]),
            Depth::U64 => Ramp::U64(vec![0; stops]),
            Depth::F32 => Ramp::F32(vec![0.0; stops]),
            Depth::F64 => Ramp::F64(vec![0.0; stops]),
        }
    }

    pub fn depth(&self) -> Depth {
        match self {
            Ramp::U8(_) => Depth::U8,
            Ramp::U16(_) => Depth::U16,
            Ramp::U32(_) => Depth::U32,
            Ramp::U64(_) => Depth::U64,
            Ramp::F32(_) => Depth::F32,
            Ramp::F64(_) => Depth::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Ramp::U8(v) => v.len(),
            Ramp::U16(v) => v.len(),
            Ramp::U32(v) => v.len(),
            Ramp::U64(v) => v.len(),
            Ramp::F32(v) => v.len(),
            Ramp::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for Ramp {
    fn from(stops: Vec<u8>) -> Self {
        Ramp::U8(stops)
    }
}

impl From<Vec<u16>> for Ramp {
    fn from(stops: Vec<u16>) -> Self {
        Ramp::U16(stops)
    }
}

impl From<Vec<u32>> for Ramp {
    fn from(stops: Vec<u32>) -> Self {
        Ramp::U32(stops)
    }
}

impl From<Vec<u64>> for Ramp {
    fn from(stops: Vec<u64>) -> Self {
        Ramp::U64(stops)
    }
}

impl From<Vec<f32>> for Ramp {
    fn from(stops: Vec<f32>) -> Self {
        Ramp::F32(stops)
    }
}

impl From<Vec<f64>> for Ramp {
    fn from(stops: Vec<f64>) -> Self {
        Ramp::F64(stops)
    }
}

// ── RampSet ──────────────────────────────────────────────────────

/// The red/green/blue ramp triple of one filter or query result.
///
/// All three channels share one depth; their lengths may legitimately
/// differ (hardware can have asymmetric channel sizes). The shared-depth
/// invariant is re-checked on deserialization, so a decoded `RampSet` is
/// as trustworthy as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RampSetWire", into = "RampSetWire")]
pub struct RampSet {
    red: Ramp,
    green: Ramp,
    blue: Ramp,
}

/// Unvalidated serde image of a [`RampSet`].
#[derive(Serialize, Deserialize)]
struct RampSetWire {
    red: Ramp,
    green: Ramp,
    blue: Ramp,
}

impl TryFrom<RampSetWire> for RampSet {
    type Error = CoopError;

    fn try_from(wire: RampSetWire) -> Result<Self, Self::Error> {
        Self::from_ramps(wire.red, wire.green, wire.blue)
    }
}

impl From<RampSet> for RampSetWire {
    fn from(set: RampSet) -> Self {
        Self {
            red: set.red,
            green: set.green,
            blue: set.blue,
        }
    }
}

impl RampSet {
    /// Build a ramp set from three pre-built ramps of equal depth.
    pub fn from_ramps(red: Ramp, green: Ramp, blue: Ramp) -> Result<Self, CoopError> {
        if red.depth() != green.depth() || green.depth() != blue.depth() {
            return Err(CoopError::ProtocolViolation(
                "ramp depths differ within a ramp set",
            ));
        }
        Ok(Self { red, green, blue })
    }

    /// Build a zero-filled ramp set with the given per-channel sizes.
    pub fn of_size(depth: Depth, red: usize, green: usize, blue: usize) -> Self {
        Self {
            red: Ramp::of_size(depth, red),
            green: Ramp::of_size(depth, green),
            blue: Ramp::of_size(depth, blue),
        }
    }

    pub fn depth(&self) -> Depth {
        self.red.depth()
    }

    pub fn red(&self) -> &Ramp {
        &self.red
    }

    pub fn green(&self) -> &Ramp {
        &self.green
    }

    pub fn blue(&self) -> &Ramp {
        &self.blue
    }

    /// Replace the red channel; the replacement must keep the set's depth.
    pub fn set_red(&mut self, ramp: Ramp) -> Result<(), CoopError> {
        Self::check_depth(self.depth(), &ramp)?;
        self.red = ramp;
        Ok(())
    }

    /// Replace the green channel; the replacement must keep the set's depth.
    pub fn set_green(&mut self, ramp: Ramp) -> Result<(), CoopError> {
        Self::check_depth(self.depth(), &ramp)?;
        self.green = ramp;
        Ok(())
    }

    /// Replace the blue channel; the replacement must keep the set's depth.
    pub fn set_blue(&mut self, ramp: Ramp) -> Result<(), CoopError> {
        Self::check_depth(self.depth(), &ramp)?;
        self.blue = ramp;
        Ok(())
    }

    fn check_depth(expected: Depth, ramp: &Ramp) -> Result<(), CoopError> {
        if ramp.depth() != expected {
            return Err(CoopError::ProtocolViolation(
                "replacement ramp depth differs from the ramp set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_wire_roundtrip() {
        for depth in [
            Depth::U8,
            Depth::U16,
            Depth::U32,
            Depth::U64,
            Depth::F32,
            Depth::F64,
        ] {
            assert_eq!(Depth::from_wire(depth.wire_value()).unwrap(), depth);
        }
    }

    #[test]
    fn depth_from_wire_invalid() {
        assert!(Depth::from_wire(7).is_err());
        assert!(Depth::from_wire(-3).is_err());
    }

    #[test]
    fn depth_serializes_as_wire_value() {
        for depth in [
            Depth::U8,
            Depth::U16,
            Depth::U32,
            Depth::U64,
            Depth::F32,
            Depth::F64,
        ] {
            let bytes = bincode::serialize(&depth).unwrap();
            assert_eq!(bytes, bincode::serialize(&depth.wire_value()).unwrap());
            assert_eq!(bincode::deserialize::<Depth>(&bytes).unwrap(), depth);
        }
    }

    #[test]
    fn depth_decode_rejects_unknown_value() {
        let bytes = bincode::serialize(&7i32).unwrap();
        assert!(bincode::deserialize::<Depth>(&bytes).is_err());
    }

    #[test]
    fn depth_integral() {
        assert!(Depth::U16.is_integral());
        assert!(!Depth::F64.is_integral());
    }

    #[test]
    fn ramp_of_size_matches_depth() {
        let ramp = Ramp::of_size(Depth::U16, 256);
        assert_eq!(ramp.depth(), Depth::U16);
        assert_eq!(ramp.len(), 256);
        assert!(!ramp.is_empty());
    }

    #[test]
    fn ramp_from_values() {
        let ramp = Ramp::from(vec![0u16, 32768, 65535]);
        assert_eq!(ramp.depth(), Depth::U16);
        assert_eq!(ramp.len(), 3);
    }

    #[test]
    fn rampset_rejects_mixed_depths() {
        let result = RampSet::from_ramps(
            Ramp::of_size(Depth::U8, 4),
            Ramp::of_size(Depth::U16, 4),
            Ramp::of_size(Depth::U8, 4),
        );
        assert!(matches!(result, Err(CoopError::ProtocolViolation(_))));
    }

    #[test]
    fn rampset_allows_asymmetric_sizes() {
        let set = RampSet::from_ramps(
            Ramp::of_size(Depth::U16, 1024),
            Ramp::of_size(Depth::U16, 512),
            Ramp::of_size(Depth::U16, 256),
        )
        .unwrap();
        assert_eq!(set.red().len(), 1024);
        assert_eq!(set.green().len(), 512);
        assert_eq!(set.blue().len(), 256);
        assert_eq!(set.depth(), Depth::U16);
    }

    #[test]
    fn rampset_serde_roundtrip() {
        let set = RampSet::of_size(Depth::U32, 16, 16, 16);
        let bytes = bincode::serialize(&set).unwrap();
        let decoded: RampSet = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn rampset_decode_rejects_mixed_depths() {
        // Byte-compatible with a ramp set, but the channels disagree on
        // depth; decoding must fail rather than yield a set whose depth()
        // misreports two of its channels.
        let forged = bincode::serialize(&(
            Ramp::of_size(Depth::U8, 4),
            Ramp::of_size(Depth::U16, 4),
            Ramp::of_size(Depth::F64, 4),
        ))
        .unwrap();
        assert!(bincode::deserialize::<RampSet>(&forged).is_err());
    }

    #[test]
    fn rampset_setters_preserve_depth() {
        let mut set = RampSet::of_size(Depth::U16, 4, 4, 4);
        set.set_green(Ramp::from(vec![0u16, 1, 2, 3, 4])).unwrap();
        assert_eq!(set.green().len(), 5);

        assert!(matches!(
            set.set_blue(Ramp::of_size(Depth::U8, 4)),
            Err(CoopError::ProtocolViolation(_))
        ));
        assert_eq!(set.blue().depth(), Depth::U16);
    }
}
