//! The 128-bit strong fingerprint.

use std::fmt;
use std::str::FromStr;

use digest::Digest;
use md5::Md5;

use crate::error::ChecksumError;
use crate::weak::hex_digit;

/// Strong block fingerprint: the MD5 digest of the block's bytes.
///
/// Rendered as exactly 32 lowercase hex characters, the form used in
/// signature records and manifests. MD5 is used here as a content identifier
/// within a trusted store, not as a security boundary.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct StrongSum([u8; 16]);

impl StrongSum {
    /// Number of hex characters in the rendered form.
    pub const HEX_LEN: usize = 32;

    /// MD5 of the empty input; pairs with [`WeakSum::ZERO`] to form the
    /// reserved empty-block fingerprint.
    ///
    /// [`WeakSum::ZERO`]: crate::WeakSum::ZERO
    pub const EMPTY: Self = Self([
        0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec, 0xf8, 0x42,
        0x7e,
    ]);

    /// Wraps a raw 16-byte digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Parses a strong sum from its 32-character hex rendering.
    pub fn parse_hex(text: &[u8]) -> Result<Self, ChecksumError> {
        if text.len() != Self::HEX_LEN {
            return Err(ChecksumError::InvalidHexLength {
                expected: Self::HEX_LEN,
                got: text.len(),
            });
        }

        let mut bytes = [0u8; 16];
        for (i, pair) in text.chunks_exact(2).enumerate() {
            let hi = hex_digit(pair[0]).ok_or(ChecksumError::InvalidHexDigit {
                byte: pair[0],
                offset: i * 2,
            })?;
            let lo = hex_digit(pair[1]).ok_or(ChecksumError::InvalidHexDigit {
                byte: pair[1],
                offset: i * 2 + 1,
            })?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for StrongSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for StrongSum {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s.as_bytes())
    }
}

/// Computes the strong sum of a byte slice.
#[must_use]
pub fn strong_sum(data: &[u8]) -> StrongSum {
    let digest = Md5::digest(data);
    StrongSum(digest.into())
}
