//! The sparse index: which candidates might hold a given fingerprint.

use std::path::{Path, PathBuf};

use checksums::WeakSum;
use rustc_hash::FxHashMap;
use store::{append_sparse_member, read_sparse, StoreLayout};
use tracing::info;

use crate::error::EngineResult;

/// Identifies one candidate for the lifetime of the chooser process.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CandidateId(pub(crate) usize);

/// One historical backup's manifest, considered as a dedup source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Candidate {
    manifest: PathBuf,
}

impl Candidate {
    /// Path of the candidate's manifest.
    #[must_use]
    pub fn manifest(&self) -> &Path {
        &self.manifest
    }
}

/// Memory-bounded map from sampled weak hashes to the candidates known to
/// contain them.
///
/// Built once at startup by replaying the store's sparse file; appended to
/// as new backups complete. Candidates live for the whole process, so the
/// per-hash lists hold ids rather than owning the candidates.
#[derive(Debug, Default)]
pub struct SparseIndex {
    candidates: Vec<Candidate>,
    by_weak: FxHashMap<WeakSum, Vec<CandidateId>>,
}

impl SparseIndex {
    /// Builds the index from the store's sparse file.
    pub fn build(layout: &StoreLayout) -> EngineResult<Self> {
        let mut index = Self::default();
        for member in read_sparse(layout)? {
            index.register(member.manifest, &member.hooks);
        }
        info!(
            candidates = index.candidates.len(),
            hooks = index.by_weak.len(),
            "sparse index built"
        );
        Ok(index)
    }

    /// Registers a finished backup in memory and persists its hooks to the
    /// store's sparse file.
    pub fn add_candidate(
        &mut self,
        layout: &StoreLayout,
        manifest: PathBuf,
        hooks: &[WeakSum],
    ) -> EngineResult<CandidateId> {
        append_sparse_member(layout, &manifest, hooks)?;
        Ok(self.register(manifest, hooks))
    }

    fn register(&mut self, manifest: PathBuf, hooks: &[WeakSum]) -> CandidateId {
        let id = CandidateId(self.candidates.len());
        self.candidates.push(Candidate { manifest });
        for &hook in hooks {
            let list = self.by_weak.entry(hook).or_default();
            // A backup can sample the same hook repeatedly; one reference
            // per candidate keeps scores proportional to distinct hooks.
            if list.last() != Some(&id) {
                list.push(id);
            }
        }
        id
    }

    /// Candidates known to contain `weak`, if any.
    #[must_use]
    pub fn candidates_for(&self, weak: WeakSum) -> Option<&[CandidateId]> {
        self.by_weak.get(&weak).map(Vec::as_slice)
    }

    /// Looks up a candidate by id.
    #[must_use]
    pub fn candidate(&self, id: CandidateId) -> &Candidate {
        &self.candidates[id.0]
    }

    /// Number of registered candidates.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}
