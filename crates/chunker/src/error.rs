use std::io;

use thiserror::Error;

/// Errors produced while chunking a stream.
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// Reading from the underlying stream failed.
    #[error("I/O error while chunking: {0}")]
    Io(#[from] io::Error),
    /// The chunker configuration is inconsistent.
    #[error("invalid chunker configuration: {0}")]
    InvalidConfig(String),
}
