//! Daemon-level errors and their exit-code mapping.

use std::path::PathBuf;

use thiserror::Error;

use crate::exit_code::ExitCode;

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;

/// Errors surfaced by the daemon entry points.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Invalid configuration or usage.
    #[error("configuration error: {0}")]
    Config(String),
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] store::StoreError),
    /// The dedup engine failed.
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    /// A peer sent something the record protocol forbids.
    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),
    /// Socket or file I/O failed outside the store.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path or socket the failure is attributed to.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl DaemonError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The exit code this error maps to.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::Config,
            Self::Protocol(_) => ExitCode::Protocol,
            Self::Store(err) => store_exit_code(err),
            Self::Engine(err) => engine_exit_code(err),
            Self::Io { .. } => ExitCode::Io,
        }
    }
}

fn store_exit_code(err: &store::StoreError) -> ExitCode {
    match err {
        store::StoreError::CapacityExhausted { .. } => ExitCode::Capacity,
        store::StoreError::LockHeld { .. } => ExitCode::LockHeld,
        store::StoreError::Record { .. }
        | store::StoreError::MalformedTreeEntry { .. }
        | store::StoreError::MalformedAddress(_) => ExitCode::Protocol,
        store::StoreError::Io { .. } => ExitCode::Io,
    }
}

fn engine_exit_code(err: &engine::EngineError) -> ExitCode {
    match err {
        engine::EngineError::Store(source) => store_exit_code(source),
        engine::EngineError::ChampionLoad { source, .. } => store_exit_code(source),
        engine::EngineError::Chunker(_) => ExitCode::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exhaustion_maps_through_the_engine() {
        let err = DaemonError::from(engine::EngineError::Store(
            store::StoreError::CapacityExhausted {
                current: "7529/0000/0000/0FFF".to_owned(),
            },
        ));
        assert_eq!(err.exit_code(), ExitCode::Capacity);
    }

    #[test]
    fn lock_contention_has_its_own_code() {
        let err = DaemonError::from(store::StoreError::LockHeld {
            path: PathBuf::from("/tmp/store/lock"),
        });
        assert_eq!(err.exit_code(), ExitCode::LockHeld);
    }

    #[test]
    fn protocol_violations_map_to_protocol() {
        let err = DaemonError::from(protocol::ProtocolError::UnknownCommand(b'z'));
        assert_eq!(err.exit_code(), ExitCode::Protocol);
    }
}
