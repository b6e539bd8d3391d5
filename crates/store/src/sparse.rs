//! The sparse sample file: which backups are likely to contain which
//! fingerprints.
//!
//! Loading every historical manifest to answer "who might have this block"
//! would not scale, so each completed backup contributes a thinned sample of
//! its fingerprints ("hooks"): only weak sums whose top nibble is
//! [`HOOK_NIBBLE`], a 1-in-16 sample that is stable across backups because
//! it depends only on the fingerprint value.
//!
//! On disk the file is a sequence of complete gzip members, one appended per
//! finished backup, each holding record-codec data: one manifest-path record
//! followed by that manifest's hook fingerprint records. Appending a member
//! never rewrites existing ones, and a multi-member-aware decoder reads the
//! file back as a single stream.

use std::fs::OpenOptions;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use checksums::WeakSum;
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use protocol::{read_record, write_record, Command};
use tracing::debug;

use crate::error::StoreError;
use crate::layout::StoreLayout;

/// Top nibble selecting which weak sums are sampled into the sparse file.
pub const HOOK_NIBBLE: u8 = 0xF;

/// Reports whether a weak sum belongs to the sparse sample.
#[must_use]
pub fn is_hook(weak: WeakSum) -> bool {
    weak.top_nibble() == HOOK_NIBBLE
}

/// One backup's contribution to the sparse file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SparseMember {
    /// Path of the backup's manifest.
    pub manifest: PathBuf,
    /// The sampled weak sums found in that manifest.
    pub hooks: Vec<WeakSum>,
}

/// Appends one backup's hooks to the store's sparse file as a new gzip
/// member.
pub fn append_sparse_member(
    layout: &StoreLayout,
    manifest: &PathBuf,
    hooks: &[WeakSum],
) -> Result<(), StoreError> {
    let path = layout.sparse_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| StoreError::io(&path, err))?;

    let mut encoder = GzEncoder::new(file, Compression::default());
    write_record(
        &mut encoder,
        Command::ManifestPath,
        manifest.to_string_lossy().as_bytes(),
    )
    .map_err(|err| StoreError::record(&path, err))?;
    for hook in hooks {
        write_record(
            &mut encoder,
            Command::Fingerprint,
            hook.to_string().as_bytes(),
        )
        .map_err(|err| StoreError::record(&path, err))?;
    }

    encoder
        .finish()
        .and_then(|mut file| file.flush().map(|()| ()))
        .map_err(|err| StoreError::io(&path, err))?;
    debug!(manifest = %manifest.display(), hooks = hooks.len(), "sparse member appended");
    Ok(())
}

/// Reads the whole sparse file back into per-manifest members.
///
/// A missing sparse file is an empty store, not an error. A fingerprint
/// record before any manifest-path record, or an unparsable fingerprint, is
/// a corrupt file and fails the build.
pub fn read_sparse(layout: &StoreLayout) -> Result<Vec<SparseMember>, StoreError> {
    let path = layout.sparse_path();
    let file = match std::fs::File::open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::io(&path, err)),
    };

    let mut reader = MultiGzDecoder::new(BufReader::new(file));
    let mut members: Vec<SparseMember> = Vec::new();
    while let Some(record) =
        read_record(&mut reader).map_err(|err| StoreError::record(&path, err))?
    {
        match record.command {
            Command::ManifestPath => {
                let text = record
                    .payload_str()
                    .map_err(|err| StoreError::record(&path, err))?;
                members.push(SparseMember {
                    manifest: PathBuf::from(text),
                    hooks: Vec::new(),
                });
            }
            Command::Fingerprint => {
                let member = members.last_mut().ok_or_else(|| {
                    StoreError::record(
                        &path,
                        protocol::ProtocolError::MalformedPayload {
                            context: "sparse",
                            detail: "fingerprint record before any manifest path".to_owned(),
                        },
                    )
                })?;
                let weak = WeakSum::parse_hex(&record.payload).map_err(|err| {
                    StoreError::record(
                        &path,
                        protocol::ProtocolError::MalformedPayload {
                            context: "sparse",
                            detail: err.to_string(),
                        },
                    )
                })?;
                member.hooks.push(weak);
            }
            other => {
                return Err(StoreError::record(
                    &path,
                    protocol::ProtocolError::MalformedPayload {
                        context: "sparse",
                        detail: format!("unexpected {other} record"),
                    },
                ));
            }
        }
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> (tempfile::TempDir, StoreLayout) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(tmp.path());
        layout.create_dirs().unwrap();
        (tmp, layout)
    }

    #[test]
    fn hook_sampling_selects_top_nibble() {
        assert!(is_hook(WeakSum::new(0xF123_0000_0000_0000)));
        assert!(!is_hook(WeakSum::new(0x0123_0000_0000_0000)));
        assert!(!is_hook(WeakSum::new(0x7FFF_FFFF_FFFF_FFFF)));
    }

    #[test]
    fn missing_sparse_file_reads_as_empty() {
        let (_tmp, layout) = layout();
        assert!(read_sparse(&layout).unwrap().is_empty());
    }

    #[test]
    fn members_round_trip_across_appends() {
        let (_tmp, layout) = layout();
        let first = SparseMember {
            manifest: PathBuf::from("/store/man/alpha"),
            hooks: vec![WeakSum::new(0xF000_0000_0000_0001), WeakSum::new(0xF000_0000_0000_0002)],
        };
        let second = SparseMember {
            manifest: PathBuf::from("/store/man/beta"),
            hooks: vec![WeakSum::new(0xFFFF_0000_0000_0003)],
        };

        append_sparse_member(&layout, &first.manifest, &first.hooks).unwrap();
        append_sparse_member(&layout, &second.manifest, &second.hooks).unwrap();

        let members = read_sparse(&layout).unwrap();
        assert_eq!(members, vec![first, second]);
    }

    #[test]
    fn member_with_no_hooks_is_preserved() {
        let (_tmp, layout) = layout();
        let manifest = PathBuf::from("/store/man/empty");
        append_sparse_member(&layout, &manifest, &[]).unwrap();

        let members = read_sparse(&layout).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].manifest, manifest);
        assert!(members[0].hooks.is_empty());
    }
}
