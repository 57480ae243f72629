//! Player update flag mask
//!
//! Drives which trailer blocks the player-info encoder appends after the
//! bit-packed movement section, in a fixed payload order.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdateFlags: u16 {
        const APPEARANCE    = 0x01;
        const CHAT          = 0x02;
        const GRAPHICS      = 0x04;
        const ANIMATION     = 0x08;
        const FORCED_CHAT   = 0x10;
        const FACE_ENTITY   = 0x20;
        /// When extended flags are present this bit is repurposed as the
        /// extended-block indicator rather than FACE_POSITION.
        const FACE_POSITION = 0x40;
        const HIT           = 0x80;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExtendedUpdateFlags: u16 {
        const HIT2             = 0x100;
        const FORCED_MOVEMENT  = 0x200;
    }
}

/// Fixed trailer block ordering: appearance first, then the rest in the
/// order their mask bits are defined.
pub const BLOCK_ORDER: &[UpdateFlags] = &[
    UpdateFlags::APPEARANCE,
    UpdateFlags::CHAT,
    UpdateFlags::GRAPHICS,
    UpdateFlags::ANIMATION,
    UpdateFlags::FORCED_CHAT,
    UpdateFlags::FACE_ENTITY,
    UpdateFlags::FACE_POSITION,
    UpdateFlags::HIT,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bits_match_spec() {
        assert_eq!(UpdateFlags::APPEARANCE.bits(), 0x01);
        assert_eq!(UpdateFlags::HIT.bits(), 0x80);
    }
}
