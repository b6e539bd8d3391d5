use std::io;
use std::path::PathBuf;

use protocol::ProtocolError;
use thiserror::Error;

/// Errors produced by the on-disk tier.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The dpth counters have no addresses left. Unrecoverable for this
    /// store; the operator must move the storage aside and restart.
    #[error(
        "storage addressing exhausted at {current}; move the store aside and restart with a fresh one"
    )]
    CapacityExhausted {
        /// Last address handed out before the counters overflowed.
        current: String,
    },
    /// Another process owns the store's advisory lock.
    #[error("store lock at {path} is held by another process")]
    LockHeld {
        /// Path of the contended lock file.
        path: PathBuf,
    },
    /// A directory or file name inside the sharded tree is not 4 hex digits.
    #[error("malformed entry {name:?} in storage tree at {path}")]
    MalformedTreeEntry {
        /// The unexpected file name.
        name: String,
        /// Directory the entry was found in.
        path: PathBuf,
    },
    /// A save path string did not parse as `PPPP/SSSS/TTTT/IIII`.
    #[error("malformed storage address {0:?}")]
    MalformedAddress(String),
    /// A record-level failure in a store file.
    #[error("record error in {path}: {source}")]
    Record {
        /// File being read or written.
        path: PathBuf,
        /// Underlying codec error.
        #[source]
        source: ProtocolError,
    },
    /// A file or directory operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path the operation touched.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn record(path: impl Into<PathBuf>, source: ProtocolError) -> Self {
        Self::Record {
            path: path.into(),
            source,
        }
    }
}
