//! Error type shared by the fingerprint parsers.

use thiserror::Error;

/// Errors produced while parsing hex-rendered fingerprints.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ChecksumError {
    /// The hex string has the wrong number of characters.
    #[error("fingerprint has {got} hex characters, expected {expected}")]
    InvalidHexLength {
        /// Number of characters the fingerprint requires.
        expected: usize,
        /// Number of characters actually supplied.
        got: usize,
    },
    /// A character outside `[0-9a-fA-F]` was encountered.
    #[error("invalid hex digit {byte:#04x} at offset {offset} in fingerprint")]
    InvalidHexDigit {
        /// The offending byte.
        byte: u8,
        /// Byte offset of the offending character.
        offset: usize,
    },
}
