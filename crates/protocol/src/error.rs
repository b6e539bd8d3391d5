use std::io;

use thiserror::Error;

/// Errors produced while encoding or decoding records.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload exceeds the 4-hex-digit length field.
    #[error("record payload of {len} bytes exceeds the {max}-byte format limit")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        len: usize,
        /// Maximum encodable payload size.
        max: usize,
    },
    /// The stream ended inside a record header or payload.
    #[error("truncated record: expected {expected} more bytes of {context}")]
    Truncated {
        /// What was being read when the stream ended.
        context: &'static str,
        /// Bytes still owed by the stream.
        expected: usize,
    },
    /// The first header byte does not name a known command.
    #[error("unknown record command byte {0:#04x}")]
    UnknownCommand(u8),
    /// The four length bytes are not uppercase-hex ASCII.
    #[error("record length field {0:?} is not 4 hex digits")]
    InvalidLength(String),
    /// A record payload does not have the shape its command requires.
    #[error("malformed {context} payload: {detail}")]
    MalformedPayload {
        /// Which payload kind failed to parse.
        context: &'static str,
        /// Parser-specific explanation.
        detail: String,
    },
    /// The underlying reader or writer failed.
    #[error("record I/O failed: {0}")]
    Io(#[from] io::Error),
}
