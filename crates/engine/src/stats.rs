//! Session counters, logged at end of stream.

/// Running totals for one dedup session.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DedupStats {
    /// Fingerprints resolved, including empty blocks.
    pub blocks: u64,
    /// Blocks found in a loaded champion or earlier in the stream.
    pub got: u64,
    /// Novel blocks that were assigned a fresh address.
    pub not_got: u64,
    /// Empty blocks answered by the reserved pair.
    pub empty: u64,
    /// Weak hits whose strong sums disagreed.
    pub collisions: u64,
    /// Champion manifests replayed into the index.
    pub champions_loaded: u64,
    /// Wrap-up requests issued for duplicate runs.
    pub wrap_ups: u64,
}

impl DedupStats {
    /// Fraction of resolved blocks that deduplicated, in [0, 1].
    #[must_use]
    pub fn dedup_ratio(&self) -> f64 {
        if self.blocks == 0 {
            return 0.0;
        }
        (self.got + self.empty) as f64 / self.blocks as f64
    }
}
