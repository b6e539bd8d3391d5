//! The in-memory fingerprint index: weak hash to strong-hash chains.

use checksums::{StrongSum, WeakSum};
use rustc_hash::FxHashMap;
use store::Address;

/// One concrete stored block behind a weak entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StrongEntry {
    /// Strong fingerprint disambiguating the weak collision chain.
    pub strong: StrongSum,
    /// Where the block's payload lives.
    pub address: Address,
}

/// The chain of stored blocks sharing one weak hash.
///
/// Weak hashes are not unique; equality is only established by walking the
/// chain and comparing strong sums. Chains are short in practice.
#[derive(Clone, Debug, Default)]
pub struct WeakEntry {
    strongs: Vec<StrongEntry>,
}

impl WeakEntry {
    /// Finds the chain entry with a matching strong sum.
    #[must_use]
    pub fn find_strong(&self, strong: &StrongSum) -> Option<&StrongEntry> {
        self.strongs.iter().find(|entry| entry.strong == *strong)
    }

    /// Number of distinct blocks behind this weak hash.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.strongs.len()
    }
}

/// Exact-match dedup lookup over the currently loaded working set.
///
/// Holds only the champions loaded for the current batch plus blocks stored
/// during it, never the whole store. Owned by the session so independent
/// sessions (and tests) never share state.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    map: FxHashMap<WeakSum, WeakEntry>,
    entries: usize,
}

impl FingerprintIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the chain for a weak hash.
    #[inline]
    #[must_use]
    pub fn find_weak(&self, weak: WeakSum) -> Option<&WeakEntry> {
        self.map.get(&weak)
    }

    /// Adds a stored block, creating the weak entry on first sight.
    ///
    /// Existing chain entries are never overwritten: a duplicate
    /// (weak, strong) pair appends a second chain entry rather than
    /// replacing the first, preserving the original address.
    pub fn insert(&mut self, weak: WeakSum, strong: StrongSum, address: Address) {
        self.map
            .entry(weak)
            .or_default()
            .strongs
            .push(StrongEntry { strong, address });
        self.entries += 1;
    }

    /// Number of (strong, address) entries currently loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Reports whether the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Drops the whole table.
    ///
    /// Called when the chooser moves on to a new champion set. There is no
    /// per-entry eviction; the index is a disposable cache.
    pub fn clear(&mut self) {
        self.map.clear();
        self.entries = 0;
    }
}
