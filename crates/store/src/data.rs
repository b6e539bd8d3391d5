//! Appending block payloads and their signatures to the sharded tree.

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use checksums::{StrongSum, WeakSum};
use protocol::{signature_payload, write_record, Command};
use tracing::trace;

use crate::address::Address;
use crate::error::StoreError;
use crate::layout::StoreLayout;

/// Appends novel blocks to their `dat` file and the matching signature
/// record to the co-located `sig` file.
///
/// The writer keeps the current file pair open and rolls over when a block's
/// address crosses a tert boundary. Records land at the same ordinal
/// position in both files, so slot `IIII` of a signature file always
/// describes slot `IIII` of its data file.
#[derive(Debug)]
pub struct DataWriter {
    layout: StoreLayout,
    open_pair: Option<OpenPair>,
}

#[derive(Debug)]
struct OpenPair {
    subtree: Address,
    dat: BufWriter<File>,
    sig: BufWriter<File>,
}

impl DataWriter {
    /// Creates a writer for the given store.
    #[must_use]
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            open_pair: None,
        }
    }

    /// Appends one block and its signature at `address`.
    ///
    /// Addresses must arrive in the order the dpth counter handed them out;
    /// the writer only rolls files forward.
    pub fn append(
        &mut self,
        address: &Address,
        data: &[u8],
        weak: WeakSum,
        strong: &StrongSum,
    ) -> Result<(), StoreError> {
        let rollover = match &self.open_pair {
            Some(pair) => pair.subtree.crosses_file_boundary(address),
            None => true,
        };
        if rollover {
            self.flush()?;
            self.open_pair = Some(self.open_pair_for(address)?);
        }

        let pair = self.open_pair.as_mut().expect("pair opened above");
        let dat_path = self.layout.data_path(address);
        write_record(&mut pair.dat, Command::Data, data)
            .map_err(|err| StoreError::record(&dat_path, err))?;
        let sig_path = self.layout.sig_path(address);
        write_record(
            &mut pair.sig,
            Command::Signature,
            &signature_payload(weak, strong),
        )
        .map_err(|err| StoreError::record(&sig_path, err))?;
        trace!(%address, len = data.len(), "block appended");
        Ok(())
    }

    /// Flushes and closes the currently open file pair, if any.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        use std::io::Write;

        if let Some(mut pair) = self.open_pair.take() {
            let dat_path = self.layout.data_path(&pair.subtree);
            pair.dat
                .flush()
                .map_err(|err| StoreError::io(&dat_path, err))?;
            let sig_path = self.layout.sig_path(&pair.subtree);
            pair.sig
                .flush()
                .map_err(|err| StoreError::io(&sig_path, err))?;
        }
        Ok(())
    }

    fn open_pair_for(&self, address: &Address) -> Result<OpenPair, StoreError> {
        let dat = open_append(&self.layout.data_path(address))?;
        let sig = open_append(&self.layout.sig_path(address))?;
        Ok(OpenPair {
            subtree: *address,
            dat: BufWriter::new(dat),
            sig: BufWriter::new(sig),
        })
    }
}

fn open_append(path: &PathBuf) -> Result<File, StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| StoreError::io(path, err))
}

/// Reads every record of a store file, for verification and tests.
pub fn read_all_records(path: &Path) -> Result<Vec<protocol::Record>, StoreError> {
    let file = File::open(path).map_err(|err| StoreError::io(path, err))?;
    let mut reader = std::io::BufReader::new(file);
    let mut records = Vec::new();
    while let Some(record) =
        protocol::read_record(&mut reader).map_err(|err| StoreError::record(path, err))?
    {
        records.push(record);
    }
    Ok(records)
}
