//! Identifier key compaction.
//!
//! Identifier-keyed maps elsewhere in the system want a fixed-size textual
//! key rather than a formatted number.  [`IdToken`] packs a `u32` into two
//! 16-bit code units, low half first.  This is purely a key-compaction
//! trick — the token carries no meaning about the map feature it names and
//! is not a general string encoding (arbitrary halves are not valid
//! characters, so the units stay `u16`).

use std::fmt;

/// A `u32` identifier packed into two 16-bit units, low half first.
///
/// `IdToken::encode(x).decode() == x` for every representable `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdToken([u16; 2]);

impl IdToken {
    pub fn encode(value: u32) -> Self {
        Self([(value & 0xffff) as u16, (value >> 16) as u16])
    }

    pub fn decode(self) -> u32 {
        u32::from(self.0[0]) | (u32::from(self.0[1]) << 16)
    }

    /// The raw code units, in packed (low, high) order.
    pub fn units(self) -> [u16; 2] {
        self.0
    }
}

impl From<u32> for IdToken {
    fn from(value: u32) -> Self {
        Self::encode(value)
    }
}

impl fmt::Display for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.0[0], self.0[1])
    }
}
