#![deny(unsafe_code)]
//! The tagged record format shared by on-disk files and the chooser wire.
//!
//! Every record is framed the same way everywhere it appears - in backup
//! manifests, signature files, the gzip-wrapped sparse sample file, and on
//! the Unix-socket connection between block producers and the chooser
//! daemon:
//!
//! ```text
//! +---------+----------------------+------------------+
//! | command | length (4 hex ASCII) | payload (length) |
//! |  1 byte |        4 bytes       |   0..=65535      |
//! +---------+----------------------+------------------+
//! ```
//!
//! The length field is the payload size rendered as big-endian uppercase
//! hex, so the largest representable payload is 65535 bytes. A short read or
//! write anywhere in a record is a hard error; there is no resumable
//! partial-record state. Records are only acted upon once fully decoded.

mod command;
mod error;
mod message;
mod record;

pub use command::Command;
pub use error::ProtocolError;
pub use message::{
    match_payload, parse_client_name, parse_match_payload, parse_signature, parse_wrap_up,
    signature_payload, wrap_up_payload, CNAME_OK, CNAME_PREFIX, EMPTY_SAVE_PATH,
    SIGNATURE_PAYLOAD_LEN, SIGS_END,
};
pub use record::{read_record, try_parse_record, write_record, Record, MAX_PAYLOAD_LEN};
