//! Champion selection: which candidates deserve a full manifest load.

use tracing::debug;

use crate::batch::Batch;
use crate::error::{EngineError, EngineResult};
use crate::index::FingerprintIndex;
use crate::sparse::{CandidateId, SparseIndex};

/// Champions loaded per batch, bounding the per-batch manifest I/O.
pub const MAX_CHAMPS: usize = 3;

/// Scores candidates against a batch and loads the winners.
///
/// Scoring recomputes from scratch on every pass, over only the
/// fingerprints no already-loaded champion accounted for, and skips
/// candidates that were already chosen this batch. That keeps the contract
/// simple: no champion's score ever includes contributions attributable to
/// an earlier champion, and a chosen champion can never win again within
/// the batch.
#[derive(Debug)]
pub struct ChampionChooser {
    sparse: SparseIndex,
    /// Per-candidate scores, reused across passes to avoid reallocation.
    scores: Vec<u32>,
    /// Candidates already chosen for the current batch.
    chosen: Vec<bool>,
}

impl ChampionChooser {
    /// Wraps a built sparse index.
    #[must_use]
    pub fn new(sparse: SparseIndex) -> Self {
        let candidates = sparse.candidate_count();
        Self {
            sparse,
            scores: vec![0; candidates],
            chosen: vec![false; candidates],
        }
    }

    /// Read access to the underlying sparse index.
    #[must_use]
    pub fn sparse(&self) -> &SparseIndex {
        &self.sparse
    }

    /// Mutable access, for registering newly finished backups.
    pub fn sparse_mut(&mut self) -> &mut SparseIndex {
        &mut self.sparse
    }

    /// Forgets the current batch's chosen champions.
    pub(crate) fn start_batch(&mut self) {
        self.grow_tables();
        self.chosen.fill(false);
    }

    /// One scoring pass: returns the best not-yet-chosen candidate with a
    /// positive score against the batch's unfound fingerprints.
    pub(crate) fn choose(&mut self, batch: &Batch) -> Option<CandidateId> {
        self.grow_tables();
        self.scores.fill(0);

        let mut best: Option<(CandidateId, u32)> = None;
        for entry in batch.entries.iter().filter(|entry| !entry.found) {
            let Some(ids) = self.sparse.candidates_for(entry.weak) else {
                continue;
            };
            for &id in ids {
                if self.chosen[id.0] {
                    continue;
                }
                let score = self.scores[id.0] + 1;
                self.scores[id.0] = score;
                match best {
                    Some((_, high)) if high >= score => {}
                    _ => best = Some((id, score)),
                }
            }
        }

        best.map(|(id, score)| {
            self.chosen[id.0] = true;
            debug!(candidate = id.0, score, "champion chosen");
            id
        })
    }

    /// Loads a champion's full manifest into the index and marks the batch
    /// fingerprints it accounts for as found.
    pub(crate) fn load_champion(
        &self,
        index: &mut FingerprintIndex,
        id: CandidateId,
        batch: &mut Batch,
    ) -> EngineResult<usize> {
        let manifest = self.sparse.candidate(id).manifest();
        let entries =
            store::read_manifest(manifest).map_err(|source| EngineError::ChampionLoad {
                path: manifest.to_path_buf(),
                source,
            })?;
        let loaded = entries.len();
        for entry in entries {
            index.insert(entry.weak, entry.strong, entry.address);
        }

        for fp in batch.entries.iter_mut() {
            if !fp.found && index.find_weak(fp.weak).is_some() {
                fp.found = true;
            }
        }
        debug!(candidate = id.0, loaded, "champion manifest loaded");
        Ok(loaded)
    }

    /// Keeps the score tables sized to the candidate population, which can
    /// grow mid-run as backups finish.
    fn grow_tables(&mut self) {
        let candidates = self.sparse.candidate_count();
        if self.scores.len() < candidates {
            self.scores.resize(candidates, 0);
            self.chosen.resize(candidates, false);
        }
    }
}
