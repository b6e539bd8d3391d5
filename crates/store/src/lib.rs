#![deny(unsafe_code)]
//! The on-disk tier of the deduplicating block store.
//!
//! One store root holds everything for a dedup group:
//!
//! ```text
//! <root>/
//!   lock                  advisory lock, one owning process at a time
//!   dat/PPPP/SSSS/TTTT    block-data records, up to SIG_MAX per file
//!   sig/PPPP/SSSS/TTTT    signature records, 1:1 with the dat file
//!   man/<backup name>     one manifest per backup
//!   sparse                gzip-framed sampled fingerprints per manifest
//! ```
//!
//! Path components are 4-digit uppercase hex. The `dat`/`sig` trees are
//! addressed by [`Address`] and advanced by [`ChunkAddress`], which recovers
//! its position after a restart by scanning the existing directories; no
//! counter file exists to go stale.

mod address;
mod data;
mod dpth;
mod error;
mod layout;
mod lock;
mod manifest;
mod sparse;

pub use address::{Address, MAX_STORAGE_SUBDIRS, SIG_MAX};
pub use data::{read_all_records, DataWriter};
pub use dpth::ChunkAddress;
pub use error::StoreError;
pub use layout::StoreLayout;
pub use lock::StoreLock;
pub use manifest::{read_manifest, ManifestEntry, ManifestReader, ManifestWriter};
pub use sparse::{append_sparse_member, is_hook, read_sparse, SparseMember, HOOK_NIBBLE};
