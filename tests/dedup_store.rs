//! End-to-end dedup behavior over a real on-disk store.

use std::fs;
use std::path::Path;

use engine::{ingest_with_config, ChampionChooser, SparseIndex};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use store::{read_manifest, StoreLayout};

// Small blocks keep the streams to a few MiB while still producing
// hundreds of blocks per ingest.
fn small_blocks() -> chunker::ChunkerConfig {
    chunker::ChunkerConfig {
        min_block: 1 << 10,
        avg_block: 1 << 12,
        max_block: 1 << 14,
        ..chunker::ChunkerConfig::default()
    }
}

fn random_stream(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

/// Every regular file under `root`, as (relative path, contents).
fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) {
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().display().to_string();
                out.push((rel, fs::read(&path).unwrap()));
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[test]
fn re_ingesting_a_stream_writes_no_new_block_data() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(tmp.path());
    layout.create_dirs().unwrap();
    let chooser = ChampionChooser::new(SparseIndex::build(&layout).unwrap());

    let stream = random_stream(2 << 20, 42);
    let (first, chooser) =
        ingest_with_config(&layout, chooser, "day1", stream.as_slice(), small_blocks()).unwrap();
    assert_eq!(first.stats.not_got, first.stats.blocks);

    let dat_before = snapshot(&layout.dat_root());
    assert!(!dat_before.is_empty());

    let (second, _chooser) =
        ingest_with_config(&layout, chooser, "day2", stream.as_slice(), small_blocks()).unwrap();
    assert_eq!(second.stats.not_got, 0);
    assert_eq!(second.stats.got, second.stats.blocks);

    // No block data was written: the dat tree is byte-identical.
    assert_eq!(snapshot(&layout.dat_root()), dat_before);

    // Both manifests describe the same blocks at the same addresses.
    assert_eq!(
        read_manifest(&first.manifest).unwrap(),
        read_manifest(&second.manifest).unwrap()
    );
}

#[test]
fn a_cold_process_still_deduplicates_via_the_sparse_file() {
    let tmp = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(tmp.path());
    layout.create_dirs().unwrap();
    let stream = random_stream(2 << 20, 43);

    {
        let chooser = ChampionChooser::new(SparseIndex::build(&layout).unwrap());
        ingest_with_config(&layout, chooser, "day1", stream.as_slice(), small_blocks()).unwrap();
    }

    // Fresh chooser, rebuilt purely from the on-disk sparse file.
    let chooser = ChampionChooser::new(SparseIndex::build(&layout).unwrap());
    let (second, _chooser) =
        ingest_with_config(&layout, chooser, "day2", stream.as_slice(), small_blocks()).unwrap();
    assert_eq!(second.stats.not_got, 0);
}
