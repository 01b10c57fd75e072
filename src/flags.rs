//! Frame flag bits.

use bitflags::bitflags;

bitflags! {
    /// Flags carried in every frame header.
    ///
    /// Requests never set any flags. A response with `ERROR` set carries an
    /// [`ErrorReport`] payload instead of the operation's typed payload.
    ///
    /// [`ErrorReport`]: crate::proto::ErrorReport
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u32 {
        /// No flags set.
        const NONE = 0x0;
        /// The response reports a failure.
        const ERROR = 0x1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bit_roundtrip() {
        let flags = FrameFlags::ERROR;
        let restored = FrameFlags::from_bits_truncate(flags.bits());
        assert_eq!(flags, restored);
        assert!(restored.contains(FrameFlags::ERROR));
    }

    #[test]
    fn unknown_bits_are_dropped() {
        let restored = FrameFlags::from_bits_truncate(0xFF00_0001);
        assert_eq!(restored, FrameFlags::ERROR);
    }
}
