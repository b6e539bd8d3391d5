//! Backup manifests: the ordered block list of one backup.
//!
//! A manifest is a record stream of signature / save-path pairs, one pair
//! per block, in stream order. Champion loading replays a manifest into the
//! in-memory fingerprint index; writing one is how a backup becomes a future
//! dedup candidate.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use checksums::{StrongSum, WeakSum};
use protocol::{
    parse_signature, read_record, signature_payload, write_record, Command, ProtocolError, Record,
};

use crate::address::Address;
use crate::error::StoreError;

/// One block entry read back from a manifest.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ManifestEntry {
    /// The block's weak fingerprint.
    pub weak: WeakSum,
    /// The block's strong fingerprint.
    pub strong: StrongSum,
    /// Where the block's payload lives.
    pub address: Address,
}

/// Streams manifest entries to disk in arrival order.
#[derive(Debug)]
pub struct ManifestWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ManifestWriter {
    /// Creates (or truncates) the manifest at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|err| StoreError::io(&path, err))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Appends one block's signature / save-path pair.
    pub fn push(
        &mut self,
        weak: WeakSum,
        strong: &StrongSum,
        address: &Address,
    ) -> Result<(), StoreError> {
        write_record(
            &mut self.writer,
            Command::Signature,
            &signature_payload(weak, strong),
        )
        .map_err(|err| StoreError::record(&self.path, err))?;
        write_record(
            &mut self.writer,
            Command::SavePath,
            address.to_string().as_bytes(),
        )
        .map_err(|err| StoreError::record(&self.path, err))
    }

    /// Flushes the manifest to disk.
    pub fn finish(mut self) -> Result<PathBuf, StoreError> {
        self.writer
            .flush()
            .map_err(|err| StoreError::io(&self.path, err))?;
        Ok(self.path)
    }
}

/// Reads manifest entries back in file order.
#[derive(Debug)]
pub struct ManifestReader {
    path: PathBuf,
    reader: BufReader<File>,
}

impl ManifestReader {
    /// Opens the manifest at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = File::open(&path).map_err(|err| StoreError::io(&path, err))?;
        Ok(Self {
            path,
            reader: BufReader::new(file),
        })
    }

    /// Reads the next signature / save-path pair, or `None` at end of file.
    ///
    /// A signature without its save path, or records of any other kind, mean
    /// the manifest is corrupt.
    pub fn next_entry(&mut self) -> Result<Option<ManifestEntry>, StoreError> {
        let Some(first) = self.next_record()? else {
            return Ok(None);
        };
        if first.command != Command::Signature {
            return Err(self.malformed(format!("expected signature record, got {}", first.command)));
        }
        let (weak, strong) =
            parse_signature(&first.payload).map_err(|err| StoreError::record(&self.path, err))?;

        let Some(second) = self.next_record()? else {
            return Err(self.malformed("signature record without a save path".to_owned()));
        };
        if second.command != Command::SavePath {
            return Err(self.malformed(format!("expected save-path record, got {}", second.command)));
        }
        let text = second
            .payload_str()
            .map_err(|err| StoreError::record(&self.path, err))?;
        let address: Address = text.parse()?;

        Ok(Some(ManifestEntry {
            weak,
            strong,
            address,
        }))
    }

    /// Reads all remaining entries.
    pub fn read_to_end(&mut self) -> Result<Vec<ManifestEntry>, StoreError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    fn next_record(&mut self) -> Result<Option<Record>, StoreError> {
        read_record(&mut self.reader).map_err(|err| StoreError::record(&self.path, err))
    }

    fn malformed(&self, detail: String) -> StoreError {
        StoreError::record(
            &self.path,
            ProtocolError::MalformedPayload {
                context: "manifest",
                detail,
            },
        )
    }
}

/// Convenience helper: read a whole manifest at once.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, StoreError> {
    ManifestReader::open(path)?.read_to_end()
}
