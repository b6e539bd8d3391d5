//! Exclusive store ownership via an advisory lock file.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use fs2::FileExt;
use tracing::debug;

use crate::error::StoreError;
use crate::layout::StoreLayout;

/// Holds the store's advisory lock for the lifetime of the guard.
///
/// Exactly one process may own a store's `dat`/`sig` trees at a time. The
/// lock is taken non-blockingly: a contended lock means a live owner exists
/// and the caller must exit rather than wait, leaving retry policy to
/// whatever launched it.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Acquires the store lock, failing fast if another process holds it.
    pub fn acquire(layout: &StoreLayout) -> Result<Self, StoreError> {
        let path = layout.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| StoreError::io(&path, err))?;

        file.try_lock_exclusive().map_err(|err| {
            if err.kind() == fs2::lock_contended_error().kind() {
                StoreError::LockHeld { path: path.clone() }
            } else {
                StoreError::io(&path, err)
            }
        })?;
        debug!(path = %path.display(), "store lock acquired");
        Ok(Self { file, path })
    }

    /// Path of the lock file this guard holds.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Held locks also vanish when the process exits; the explicit unlock
        // just releases earlier for in-process guard churn (tests, restarts).
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_guard_lives() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(tmp.path());
        layout.create_dirs().unwrap();

        let guard = StoreLock::acquire(&layout).unwrap();
        let err = StoreLock::acquire(&layout).unwrap_err();
        assert!(matches!(err, StoreError::LockHeld { .. }));
        drop(guard);

        // Releasing the guard frees the lock for the next owner.
        let reacquired = StoreLock::acquire(&layout);
        assert!(reacquired.is_ok());
    }
}
