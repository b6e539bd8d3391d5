//! The dedup session: batches in, verdicts out.

use checksums::{is_reserved_pair, StrongSum, WeakSum};
use store::{Address, ChunkAddress, StoreLayout};
use tracing::{debug, info};

use crate::batch::Batch;
use crate::champ::{ChampionChooser, MAX_CHAMPS};
use crate::error::EngineResult;
use crate::index::FingerprintIndex;
use crate::stats::DedupStats;

/// Consecutive duplicate verdicts tolerated before the session asks the
/// producer to wrap up its in-flight stream.
pub const WRAP_UP_AFTER: u64 = 10_000;

/// Verdict for one incoming fingerprint, keyed by its producer-side index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// The block already exists at `address`.
    Got { index: u64, address: Address },
    /// The block is novel and has been assigned `address`.
    NotGot { index: u64, address: Address },
    /// The reserved empty-block pair; nothing is stored or addressed.
    Empty { index: u64 },
    /// Too many consecutive duplicates; the producer should flush
    /// everything up to and including `index` before sending more.
    WrapUp { index: u64 },
}

/// Resolves fingerprint streams against the store.
///
/// Owns the disposable [`FingerprintIndex`], the [`ChampionChooser`] and
/// the address allocator. One session per store; producers are kept apart
/// by giving each its own [`Batch`].
#[derive(Debug)]
pub struct DedupSession {
    index: FingerprintIndex,
    chooser: ChampionChooser,
    dpth: ChunkAddress,
    stats: DedupStats,
}

impl DedupSession {
    /// Opens a session over an existing store.
    pub fn new(layout: &StoreLayout, chooser: ChampionChooser) -> EngineResult<Self> {
        Ok(Self {
            index: FingerprintIndex::new(),
            chooser,
            dpth: ChunkAddress::init(layout)?,
            stats: DedupStats::default(),
        })
    }

    /// Running counters for this session.
    #[must_use]
    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }

    /// Mutable access to the chooser, for registering finished backups
    /// while the session stays alive.
    pub fn chooser_mut(&mut self) -> &mut ChampionChooser {
        &mut self.chooser
    }

    /// Gives the chooser back when the session ends, so its sparse index
    /// can register the finished backup.
    #[must_use]
    pub fn into_chooser(self) -> ChampionChooser {
        self.chooser
    }

    /// Queues one fingerprint; resolves and drains the batch when full.
    ///
    /// Returns an empty vec while the batch is still filling.
    pub fn push(
        &mut self,
        batch: &mut Batch,
        index: u64,
        weak: WeakSum,
        strong: StrongSum,
    ) -> EngineResult<Vec<Resolution>> {
        if batch.push(index, weak, strong) {
            self.resolve_batch(batch)
        } else {
            Ok(Vec::new())
        }
    }

    /// Resolves whatever remains in the batch at end of stream.
    pub fn finish(&mut self, batch: &mut Batch) -> EngineResult<Vec<Resolution>> {
        let resolutions = self.resolve_batch(batch)?;
        info!(
            blocks = self.stats.blocks,
            got = self.stats.got,
            not_got = self.stats.not_got,
            collisions = self.stats.collisions,
            champions = self.stats.champions_loaded,
            "session finished"
        );
        Ok(resolutions)
    }

    fn resolve_batch(&mut self, batch: &mut Batch) -> EngineResult<Vec<Resolution>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        // Empty blocks never participate in scoring or lookup, and entries
        // the current index already covers need no champion either.
        for entry in batch.entries.iter_mut() {
            if is_reserved_pair(entry.weak, &entry.strong)
                || self.index.find_weak(entry.weak).is_some()
            {
                entry.found = true;
            }
        }

        // The index is cleared only when the champion set actually changes;
        // until then it keeps serving the blocks of recent batches.
        self.chooser.start_batch();
        let mut cleared = false;
        for _ in 0..MAX_CHAMPS {
            if batch.all_found() {
                break;
            }
            let Some(id) = self.chooser.choose(batch) else {
                break;
            };
            if !cleared {
                // Entries the outgoing index already resolves must survive
                // the champion swap, or their blocks would be stored twice.
                let mut carried = Vec::new();
                for entry in batch.entries.iter().filter(|entry| entry.found) {
                    if is_reserved_pair(entry.weak, &entry.strong) {
                        continue;
                    }
                    let hit = self
                        .index
                        .find_weak(entry.weak)
                        .and_then(|weak_entry| weak_entry.find_strong(&entry.strong));
                    if let Some(strong_entry) = hit {
                        carried.push((entry.weak, entry.strong, strong_entry.address));
                    }
                }
                self.index.clear();
                for (weak, strong, address) in carried {
                    self.index.insert(weak, strong, address);
                }
                cleared = true;
            }
            self.chooser.load_champion(&mut self.index, id, batch)?;
            self.stats.champions_loaded += 1;
        }

        let mut resolutions = Vec::with_capacity(batch.entries.len());
        for i in 0..batch.entries.len() {
            let entry = batch.entries[i];
            self.stats.blocks += 1;

            if is_reserved_pair(entry.weak, &entry.strong) {
                self.stats.empty += 1;
                resolutions.push(Resolution::Empty { index: entry.index });
                self.note_got(entry.index, &mut resolutions, batch);
                continue;
            }

            let mut collision = false;
            let hit = match self.index.find_weak(entry.weak) {
                Some(weak_entry) => match weak_entry.find_strong(&entry.strong) {
                    Some(strong_entry) => Some(strong_entry.address),
                    None => {
                        collision = true;
                        None
                    }
                },
                None => None,
            };
            if collision {
                self.stats.collisions += 1;
            }

            if let Some(address) = hit {
                self.stats.got += 1;
                resolutions.push(Resolution::Got {
                    index: entry.index,
                    address,
                });
                self.note_got(entry.index, &mut resolutions, batch);
            } else {
                let address = self.dpth.address();
                self.dpth.advance()?;
                self.index.insert(entry.weak, entry.strong, address);
                self.stats.not_got += 1;
                batch.consecutive_got = 0;
                resolutions.push(Resolution::NotGot {
                    index: entry.index,
                    address,
                });
            }
        }

        debug!(
            resolved = batch.entries.len(),
            got = resolutions
                .iter()
                .filter(|r| matches!(r, Resolution::Got { .. } | Resolution::Empty { .. }))
                .count(),
            "batch resolved"
        );
        batch.entries.clear();
        Ok(resolutions)
    }

    /// Bumps the duplicate run and emits a wrap-up once it exceeds the
    /// threshold, restarting the count so runs keep producing signals.
    fn note_got(&mut self, index: u64, resolutions: &mut Vec<Resolution>, batch: &mut Batch) {
        batch.consecutive_got += 1;
        if batch.consecutive_got > WRAP_UP_AFTER {
            self.stats.wrap_ups += 1;
            batch.consecutive_got = 0;
            resolutions.push(Resolution::WrapUp { index });
        }
    }
}
