//! Per-client batches of incoming fingerprints.

use checksums::{StrongSum, WeakSum};
use store::SIG_MAX;

/// Fingerprints per batch before a scoring pass is triggered.
///
/// Matches the signatures-per-file bound so one batch maps onto at most one
/// full `dat`/`sig` file pair of novel blocks.
pub const BATCH_MAX: usize = SIG_MAX as usize;

/// One incoming fingerprint awaiting resolution.
#[derive(Clone, Copy, Debug)]
pub(crate) struct IncomingFp {
    /// Producer-side block index, echoed back in verdicts.
    pub index: u64,
    pub weak: WeakSum,
    pub strong: StrongSum,
    /// Set once a champion (or the reserved pair) accounts for this
    /// fingerprint; found entries are skipped by later scoring passes.
    pub found: bool,
}

/// A bounded batch of incoming fingerprints for one client stream.
///
/// The session resolves a batch when it fills or when the stream ends; the
/// consecutive-duplicate counter for wrap-up backpressure also lives here,
/// since it follows one producer's stream across batches.
#[derive(Debug, Default)]
pub struct Batch {
    pub(crate) entries: Vec<IncomingFp>,
    pub(crate) consecutive_got: u64,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(BATCH_MAX),
            consecutive_got: 0,
        }
    }

    /// Appends one fingerprint; returns `true` when the batch is full and
    /// must be resolved before accepting more.
    pub(crate) fn push(&mut self, index: u64, weak: WeakSum, strong: StrongSum) -> bool {
        debug_assert!(self.entries.len() < BATCH_MAX);
        self.entries.push(IncomingFp {
            index,
            weak,
            strong,
            found: false,
        });
        self.entries.len() >= BATCH_MAX
    }

    /// Number of queued fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the batch holds no fingerprints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports whether every entry has been accounted for by a champion.
    pub(crate) fn all_found(&self) -> bool {
        self.entries.iter().all(|entry| entry.found)
    }
}
