//! Common error types for the engine crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during deduplication.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The on-disk tier failed; the batch is aborted.
    #[error(transparent)]
    Store(#[from] store::StoreError),
    /// A champion's manifest could not be loaded. The index may be
    /// partially populated, so the session is no longer trustworthy.
    #[error("failed to load champion manifest {path}: {source}")]
    ChampionLoad {
        /// Manifest that failed to load.
        path: PathBuf,
        /// Underlying store failure.
        #[source]
        source: store::StoreError,
    },
    /// Chunking the input stream failed during ingest.
    #[error(transparent)]
    Chunker(#[from] chunker::ChunkerError),
}
