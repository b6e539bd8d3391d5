//! Local ingest: chunk a stream, dedup it, and persist the novel blocks.

use std::io::Read;
use std::path::PathBuf;

use chunker::{Chunker, ChunkerConfig};
use rustc_hash::FxHashMap;
use store::{is_hook, DataWriter, ManifestWriter, StoreLayout};
use tracing::info;

use crate::batch::Batch;
use crate::champ::ChampionChooser;
use crate::error::EngineResult;
use crate::session::{DedupSession, Resolution};
use crate::sparse::CandidateId;
use crate::stats::DedupStats;

/// What one completed ingest produced.
#[derive(Debug)]
pub struct IngestOutcome {
    /// The finished backup's manifest.
    pub manifest: PathBuf,
    /// The backup's id as a future dedup candidate.
    pub candidate: CandidateId,
    /// Session counters for the whole stream.
    pub stats: DedupStats,
}

/// Chunks `reader`, resolves every block against the store, writes novel
/// block payloads, and registers the finished backup as a candidate.
///
/// The chooser is threaded through and handed back so repeated ingests
/// share one sparse index.
pub fn ingest_reader<R: Read>(
    layout: &StoreLayout,
    chooser: ChampionChooser,
    name: &str,
    reader: R,
) -> EngineResult<(IngestOutcome, ChampionChooser)> {
    ingest_with_config(layout, chooser, name, reader, ChunkerConfig::default())
}

/// [`ingest_reader`] with explicit chunker tuning.
pub fn ingest_with_config<R: Read>(
    layout: &StoreLayout,
    chooser: ChampionChooser,
    name: &str,
    reader: R,
    config: ChunkerConfig,
) -> EngineResult<(IngestOutcome, ChampionChooser)> {
    let mut session = DedupSession::new(layout, chooser)?;
    let mut batch = Batch::new();
    let mut data = DataWriter::new(layout.clone());
    let mut manifest = ManifestWriter::create(layout.manifest_path(name))?;
    let mut hooks = Vec::new();
    // Blocks awaiting their batch's verdicts, keyed by stream index.
    let mut pending: FxHashMap<u64, chunker::Block> = FxHashMap::default();

    for block in Chunker::with_config(reader, config)? {
        let block = block?;
        if is_hook(block.weak()) {
            hooks.push(block.weak());
        }
        let resolutions =
            session.push(&mut batch, block.index(), block.weak(), *block.strong())?;
        pending.insert(block.index(), block);
        apply(&mut data, &mut manifest, &mut pending, &resolutions)?;
    }
    let resolutions = session.finish(&mut batch)?;
    apply(&mut data, &mut manifest, &mut pending, &resolutions)?;
    data.flush()?;
    let manifest = manifest.finish()?;

    let stats = *session.stats();
    let mut chooser = session.into_chooser();
    let candidate = chooser
        .sparse_mut()
        .add_candidate(layout, manifest.clone(), &hooks)?;
    info!(
        name,
        blocks = stats.blocks,
        stored = stats.not_got,
        deduplicated = stats.got + stats.empty,
        "ingest complete"
    );
    Ok((
        IngestOutcome {
            manifest,
            candidate,
            stats,
        },
        chooser,
    ))
}

/// Applies one batch's verdicts: novel payloads go to the data files, every
/// non-empty block lands in the manifest at its resolved address.
fn apply(
    data: &mut DataWriter,
    manifest: &mut ManifestWriter,
    pending: &mut FxHashMap<u64, chunker::Block>,
    resolutions: &[Resolution],
) -> EngineResult<()> {
    for resolution in resolutions {
        match *resolution {
            Resolution::NotGot { index, address } => {
                if let Some(block) = pending.remove(&index) {
                    data.append(&address, block.data(), block.weak(), block.strong())?;
                    manifest.push(block.weak(), block.strong(), &address)?;
                }
            }
            Resolution::Got { index, address } => {
                if let Some(block) = pending.remove(&index) {
                    manifest.push(block.weak(), block.strong(), &address)?;
                }
            }
            Resolution::Empty { index } => {
                pending.remove(&index);
            }
            Resolution::WrapUp { .. } => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
    use store::read_manifest;

    use crate::sparse::SparseIndex;

    fn setup() -> (tempfile::TempDir, StoreLayout, ChampionChooser) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(tmp.path());
        layout.create_dirs().unwrap();
        let chooser = ChampionChooser::new(SparseIndex::build(&layout).unwrap());
        (tmp, layout, chooser)
    }

    fn random_stream(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0u8; len];
        rng.fill_bytes(&mut data);
        data
    }

    // Small blocks keep the tests fast and give each stream hundreds of
    // blocks, so sampled hooks are plentiful.
    fn small_blocks() -> ChunkerConfig {
        ChunkerConfig {
            min_block: 1 << 10,
            avg_block: 1 << 12,
            max_block: 1 << 14,
            ..ChunkerConfig::default()
        }
    }

    fn ingest(
        layout: &StoreLayout,
        chooser: ChampionChooser,
        name: &str,
        stream: &[u8],
    ) -> (IngestOutcome, ChampionChooser) {
        ingest_with_config(layout, chooser, name, stream, small_blocks()).unwrap()
    }

    #[test]
    fn first_ingest_stores_every_block() {
        let (_tmp, layout, chooser) = setup();
        let stream = random_stream(3 << 20, 11);
        let (outcome, _chooser) = ingest(&layout, chooser, "first", &stream);
        assert!(outcome.stats.blocks > 0);
        assert_eq!(outcome.stats.not_got, outcome.stats.blocks);
        assert_eq!(outcome.stats.got, 0);

        // The manifest lists one entry per block, in stream order.
        let entries = read_manifest(&outcome.manifest).unwrap();
        assert_eq!(entries.len() as u64, outcome.stats.blocks);
    }

    #[test]
    fn second_ingest_of_the_same_stream_stores_nothing() {
        let (_tmp, layout, chooser) = setup();
        let stream = random_stream(3 << 20, 12);
        let (first, chooser) = ingest(&layout, chooser, "first", &stream);
        let (second, _chooser) = ingest(&layout, chooser, "second", &stream);

        assert_eq!(second.stats.blocks, first.stats.blocks);
        assert_eq!(second.stats.not_got, 0);
        assert_eq!(second.stats.got, second.stats.blocks);

        // Both manifests resolve to the same addresses.
        let a = read_manifest(&first.manifest).unwrap();
        let b = read_manifest(&second.manifest).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn modified_stream_stores_only_new_blocks() {
        let (_tmp, layout, chooser) = setup();
        let mut stream = random_stream(3 << 20, 13);
        let (first, chooser) = ingest(&layout, chooser, "first", &stream);

        // Flip bytes near the end; boundaries before the edit are stable,
        // so most blocks must still deduplicate.
        let tail = stream.len() - 512;
        let mut rng = StdRng::seed_from_u64(14);
        for byte in &mut stream[tail..] {
            *byte = rng.gen();
        }
        let (second, _chooser) = ingest(&layout, chooser, "second", &stream);
        assert!(second.stats.got >= first.stats.blocks.saturating_sub(3));
        assert!(second.stats.not_got <= 3);
    }

    #[test]
    fn default_config_blocks_fit_the_data_files() {
        let (_tmp, layout, chooser) = setup();
        let stream = random_stream(1 << 20, 15);
        let (outcome, _chooser) =
            ingest_reader(&layout, chooser, "defaults", stream.as_slice()).unwrap();
        assert!(outcome.stats.blocks > 0);
        assert_eq!(outcome.stats.not_got, outcome.stats.blocks);
        let entries = read_manifest(&outcome.manifest).unwrap();
        assert_eq!(entries.len() as u64, outcome.stats.blocks);
    }

    #[test]
    fn empty_stream_produces_an_empty_backup() {
        let (_tmp, layout, chooser) = setup();
        let (outcome, _chooser) = ingest(&layout, chooser, "empty", &[]);
        assert_eq!(outcome.stats.blocks, 0);
        assert!(read_manifest(&outcome.manifest).unwrap().is_empty());
    }
}
