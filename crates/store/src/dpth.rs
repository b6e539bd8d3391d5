//! The dpth counter: hands out storage addresses and recovers its position
//! from the directory tree.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::address::{Address, MAX_STORAGE_SUBDIRS, SIG_MAX};
use crate::error::StoreError;
use crate::layout::StoreLayout;

/// Generator of fresh, never-reused storage addresses.
///
/// The current position is implicit in the filesystem: `init` scans the
/// `dat` tree for the highest-numbered entry at each of its three levels, so
/// a restarted process resumes exactly where the previous owner stopped.
/// `sig` restarts at 0 after a scan; re-appending into a partially filled
/// tert file is the caller's decision, made by reading that file's
/// signature companion.
#[derive(Debug)]
pub struct ChunkAddress {
    current: Address,
}

impl ChunkAddress {
    /// Scans the store's `dat` tree and positions the counter at the highest
    /// existing `prim/seco/tert`, or at zero for an empty store.
    ///
    /// Any filesystem failure during the scan is fatal to startup; a store
    /// whose tree cannot be enumerated must not be written to.
    pub fn init(layout: &StoreLayout) -> Result<Self, StoreError> {
        let dat = layout.dat_root();
        let prim = highest_entry(&dat)?;
        let seco = match prim {
            Some(p) => highest_entry(&dat.join(format!("{p:04X}")))?,
            None => None,
        };
        let tert = match (prim, seco) {
            (Some(p), Some(s)) => {
                highest_entry(&dat.join(format!("{p:04X}")).join(format!("{s:04X}")))?
            }
            _ => None,
        };

        let current = Address::new(
            prim.unwrap_or(0),
            seco.unwrap_or(0),
            tert.unwrap_or(0),
            0,
        );
        debug!(address = %current, "dpth recovered from directory scan");
        Ok(Self { current })
    }

    /// Starts from an explicit address (used when resuming into a partially
    /// filled signature file).
    #[must_use]
    pub const fn from_address(current: Address) -> Self {
        Self { current }
    }

    /// The address the next stored block will receive.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.current
    }

    /// The `PPPP/SSSS/TTTT` subtree the current address stores into.
    #[must_use]
    pub fn subtree_path(&self) -> String {
        self.current.subtree()
    }

    /// Moves to the next address.
    ///
    /// Increments `sig`; at `SIG_MAX` the carry propagates through `tert`,
    /// `seco` and `prim` like a mixed-radix counter. Overflowing `prim` means
    /// the store's roughly 2.8e14 addresses are spent; that is surfaced as
    /// [`StoreError::CapacityExhausted`], never wrapped silently.
    pub fn advance(&mut self) -> Result<(), StoreError> {
        let a = &mut self.current;
        if a.prim >= MAX_STORAGE_SUBDIRS {
            // Previously exhausted; the counter stays pinned at the cap.
            return Err(StoreError::CapacityExhausted {
                current: a.to_string(),
            });
        }
        a.sig += 1;
        if a.sig < SIG_MAX {
            return Ok(());
        }
        a.sig = 0;
        a.tert += 1;
        if a.tert < MAX_STORAGE_SUBDIRS {
            return Ok(());
        }
        a.tert = 0;
        a.seco += 1;
        if a.seco < MAX_STORAGE_SUBDIRS {
            return Ok(());
        }
        a.seco = 0;
        a.prim += 1;
        if a.prim < MAX_STORAGE_SUBDIRS {
            return Ok(());
        }
        // Leave the counter pinned at the cap so retries keep failing
        // instead of handing out a wrapped address.
        a.prim = MAX_STORAGE_SUBDIRS;
        Err(StoreError::CapacityExhausted {
            current: a.to_string(),
        })
    }
}

/// Highest 4-hex-digit entry name in `dir`, or `None` if the directory does
/// not exist or holds no entries.
///
/// Entries that are not exactly four hex digits are a corrupted tree and
/// reported as errors rather than skipped.
fn highest_entry(dir: &Path) -> Result<Option<u16>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StoreError::io(dir, err)),
    };

    let mut highest = None;
    for entry in entries {
        let entry = entry.map_err(|err| StoreError::io(dir, err))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let value = parse_component(&name).ok_or_else(|| StoreError::MalformedTreeEntry {
            name: name.into_owned(),
            path: dir.to_path_buf(),
        })?;
        highest = Some(highest.map_or(value, |h: u16| h.max(value)));
    }
    Ok(highest)
}

fn parse_component(name: &str) -> Option<u16> {
    if name.len() != 4 {
        return None;
    }
    u16::from_str_radix(name, 16).ok()
}
