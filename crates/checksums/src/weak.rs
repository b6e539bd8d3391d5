//! The 64-bit weak fingerprint.

use std::fmt;
use std::str::FromStr;

use crate::error::ChecksumError;

/// Weak block fingerprint: the Rabin rolling hash value at the block's
/// content-defined boundary.
///
/// Rendered as exactly 16 uppercase hex characters (`%016X`), which is the
/// form used in signature records, manifests and the sparse sample file.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct WeakSum(u64);

impl WeakSum {
    /// Number of hex characters in the rendered form.
    pub const HEX_LEN: usize = 16;

    /// The all-zero weak sum, reserved for the empty block.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw 64-bit fingerprint value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw 64-bit fingerprint value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the top nibble of the fingerprint.
    ///
    /// The sparse sample ("hooks") keeps only fingerprints whose top nibble
    /// has a fixed value, thinning the per-backup sample by a factor of 16.
    #[must_use]
    pub const fn top_nibble(self) -> u8 {
        (self.0 >> 60) as u8
    }

    /// Parses a weak sum from its 16-character hex rendering.
    pub fn parse_hex(text: &[u8]) -> Result<Self, ChecksumError> {
        if text.len() != Self::HEX_LEN {
            return Err(ChecksumError::InvalidHexLength {
                expected: Self::HEX_LEN,
                got: text.len(),
            });
        }

        let mut value = 0u64;
        for (offset, &byte) in text.iter().enumerate() {
            let digit = hex_digit(byte).ok_or(ChecksumError::InvalidHexDigit { byte, offset })?;
            value = (value << 4) | u64::from(digit);
        }
        Ok(Self(value))
    }
}

impl fmt::Display for WeakSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for WeakSum {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s.as_bytes())
    }
}

impl From<u64> for WeakSum {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

pub(crate) fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
