//! The chooser daemon: CLI, configuration and the Unix-socket server.
//!
//! The binary crate is a thin shell over [`cli::run`]; everything testable
//! lives here. The server is a single-threaded readiness loop (`poll`) and
//! owns all engine state; see [`server`] for the threading model.

pub mod cli;
pub mod config;
pub mod error;
pub mod exit_code;
pub mod server;

pub use cli::{run, Cli};
pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
pub use exit_code::ExitCode;
