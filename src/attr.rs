//! Packed color attributes.
//!
//! An [`Attr`] is what the automaton hands to the host with every recolor
//! command. It packs a foreground palette index, a background palette index
//! and a set of style flags into a single `u32`. How those indices map to
//! actual colors is the host's business.
//!
//! ## Gotchas
//!
//! - The all-zero attribute (black on black, no styles) is a perfectly valid
//!   value, so a spare bit is set whenever the packed value would otherwise
//!   be zero. `Attr::NONE` (the true zero) therefore always means "no
//!   attribute was produced".

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Style flags carried alongside the fg/bg palette indices.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Styles: u32 {
        const UNDERLINE = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const BOLD = 1 << 3;
        const INVERSE = 1 << 4;
        const BLINK = 1 << 5;
    }
}

/// A packed color attribute: foreground index, background index, styles.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Attr(u32);

impl Attr {
    /// "No attribute produced." Distinct from the valid all-zero attribute.
    pub const NONE: Attr = Attr(0);

    /// Attribute substituted when a color reference cannot be resolved.
    pub const ERROR: Attr = Attr::pack(1, 0, Styles::INVERSE);

    // Set when the packed value would otherwise collide with NONE.
    const OCCUPIED: u32 = 0x8000_0000;

    pub const fn pack(fg: u8, bg: u8, styles: Styles) -> Attr {
        let mut bits = fg as u32 | (bg as u32) << 8 | styles.bits() << 16;
        if bits == 0 {
            bits = Attr::OCCUPIED;
        }
        Attr(bits)
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    pub const fn fg(self) -> u8 {
        self.0 as u8
    }

    pub const fn bg(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn styles(self) -> Styles {
        Styles::from_bits_truncate(self.0 >> 16)
    }
}

impl fmt::Debug for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Attr(none)")
        } else {
            write!(f, "Attr(fg={}, bg={}, styles={:?})", self.fg(), self.bg(), self.styles())
        }
    }
}
