#![deny(unsafe_code)]
//! The deduplication core.
//!
//! Incoming fingerprints are collected into bounded batches. For each batch
//! the [`ChampionChooser`] scores every historical backup ("candidate")
//! against the batch using the memory-bounded [`SparseIndex`], loads the few
//! highest-scoring manifests ("champions") into the [`FingerprintIndex`],
//! and the [`DedupSession`] then resolves every block to a verdict: `Got`
//! with the existing save path, or `NotGot` with a freshly assigned storage
//! address. Novel blocks are inserted into the index immediately so later
//! blocks of the same batch deduplicate against them.
//!
//! The index is a disposable cache scoped to the champions of the current
//! batch; it is cleared wholesale, never evicted entry by entry.

mod batch;
mod champ;
mod error;
mod index;
mod ingest;
mod session;
mod sparse;
mod stats;

pub use batch::{Batch, BATCH_MAX};
pub use champ::{ChampionChooser, MAX_CHAMPS};
pub use error::{EngineError, EngineResult};
pub use index::FingerprintIndex;
pub use ingest::{ingest_reader, ingest_with_config, IngestOutcome};
pub use session::{DedupSession, Resolution, WRAP_UP_AFTER};
pub use sparse::{Candidate, CandidateId, SparseIndex};
pub use stats::DedupStats;
