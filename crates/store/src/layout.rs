//! Fixed paths under a store root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::address::Address;
use crate::error::StoreError;

/// Resolves the well-known files and subtrees of one store root.
#[derive(Clone, Debug)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Wraps a store root path.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root of the block-data tree.
    #[must_use]
    pub fn dat_root(&self) -> PathBuf {
        self.root.join("dat")
    }

    /// Root of the signature tree.
    #[must_use]
    pub fn sig_root(&self) -> PathBuf {
        self.root.join("sig")
    }

    /// Directory holding one manifest per backup.
    #[must_use]
    pub fn manifest_root(&self) -> PathBuf {
        self.root.join("man")
    }

    /// Path of a named backup's manifest.
    #[must_use]
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.manifest_root().join(name)
    }

    /// The gzip-framed sparse sample file.
    #[must_use]
    pub fn sparse_path(&self) -> PathBuf {
        self.root.join("sparse")
    }

    /// The advisory lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.root.join("lock")
    }

    /// Data file an address stores into: `dat/PPPP/SSSS/TTTT`.
    #[must_use]
    pub fn data_path(&self, address: &Address) -> PathBuf {
        self.dat_root().join(address.subtree())
    }

    /// Signature file co-located with [`data_path`](Self::data_path).
    #[must_use]
    pub fn sig_path(&self, address: &Address) -> PathBuf {
        self.sig_root().join(address.subtree())
    }

    /// Creates the store skeleton (root, `dat`, `sig`, `man`).
    pub fn create_dirs(&self) -> Result<(), StoreError> {
        for dir in [
            self.root.clone(),
            self.dat_root(),
            self.sig_root(),
            self.manifest_root(),
        ] {
            fs::create_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_root() {
        let layout = StoreLayout::new("/srv/dedup");
        let addr = Address::new(1, 2, 3, 4);
        assert_eq!(
            layout.data_path(&addr),
            PathBuf::from("/srv/dedup/dat/0001/0002/0003")
        );
        assert_eq!(
            layout.sig_path(&addr),
            PathBuf::from("/srv/dedup/sig/0001/0002/0003")
        );
        assert_eq!(layout.sparse_path(), PathBuf::from("/srv/dedup/sparse"));
        assert_eq!(
            layout.manifest_path("host-2026-08-31"),
            PathBuf::from("/srv/dedup/man/host-2026-08-31")
        );
    }

    #[test]
    fn create_dirs_builds_the_skeleton() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(tmp.path().join("store"));
        layout.create_dirs().unwrap();
        assert!(layout.dat_root().is_dir());
        assert!(layout.sig_root().is_dir());
        assert!(layout.manifest_root().is_dir());
    }
}
