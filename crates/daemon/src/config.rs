//! Daemon configuration.

use std::path::{Path, PathBuf};

/// Socket file name used when no explicit socket path is given.
pub const DEFAULT_SOCKET_NAME: &str = "dedupd.sock";

/// Resolved configuration for one daemon process.
#[derive(Clone, Debug)]
pub struct DaemonConfig {
    store_root: PathBuf,
    socket_path: PathBuf,
}

impl DaemonConfig {
    /// Configuration for a store root, socket defaulting to
    /// [`DEFAULT_SOCKET_NAME`] inside it.
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        let store_root = store_root.into();
        let socket_path = store_root.join(DEFAULT_SOCKET_NAME);
        Self {
            store_root,
            socket_path,
        }
    }

    /// Overrides the listening socket path.
    #[must_use]
    pub fn with_socket(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.socket_path = socket_path.into();
        self
    }

    /// The store's root directory.
    #[must_use]
    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    /// The Unix socket the daemon listens on.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_defaults_into_the_store_root() {
        let config = DaemonConfig::new("/srv/store");
        assert_eq!(
            config.socket_path(),
            Path::new("/srv/store/dedupd.sock")
        );
    }

    #[test]
    fn socket_override_wins() {
        let config = DaemonConfig::new("/srv/store").with_socket("/run/dedupd.sock");
        assert_eq!(config.socket_path(), Path::new("/run/dedupd.sock"));
    }
}
