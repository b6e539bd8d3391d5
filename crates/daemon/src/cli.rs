//! Command-line interface for the `dedupd` binary.

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use engine::{ingest_reader, ChampionChooser, SparseIndex};
use store::{StoreLayout, StoreLock};
use tracing::info;

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::server;

/// Deduplicating block store and chooser daemon.
#[derive(Debug, Parser)]
#[command(name = "dedupd", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Create an empty store at the given root.
    Init {
        /// Store root directory.
        #[arg(long)]
        store: PathBuf,
    },
    /// Serve the chooser protocol on a Unix socket.
    Serve {
        /// Store root directory.
        #[arg(long)]
        store: PathBuf,
        /// Listening socket path; defaults to `dedupd.sock` in the store.
        #[arg(long)]
        socket: Option<PathBuf>,
    },
    /// Chunk a local file and deduplicate it into the store.
    Ingest {
        /// Store root directory.
        #[arg(long)]
        store: PathBuf,
        /// Backup name; defaults to the file name.
        #[arg(long)]
        name: Option<String>,
        /// File to ingest.
        file: PathBuf,
    },
}

/// Runs the parsed command to completion.
pub fn run(cli: Cli) -> DaemonResult<()> {
    match cli.command {
        CliCommand::Init { store } => init(&store),
        CliCommand::Serve { store, socket } => {
            let mut config = DaemonConfig::new(store);
            if let Some(socket) = socket {
                config = config.with_socket(socket);
            }
            server::serve(&config)
        }
        CliCommand::Ingest { store, name, file } => ingest(&store, name.as_deref(), &file),
    }
}

fn init(store: &Path) -> DaemonResult<()> {
    let layout = StoreLayout::new(store);
    layout.create_dirs()?;
    info!(store = %store.display(), "store initialised");
    Ok(())
}

fn ingest(store: &Path, name: Option<&str>, file: &Path) -> DaemonResult<()> {
    let name = match name {
        Some(name) => name.to_owned(),
        None => file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DaemonError::Config(format!("cannot derive a backup name from {}", file.display()))
            })?,
    };

    let layout = StoreLayout::new(store);
    layout.create_dirs()?;
    let _lock = StoreLock::acquire(&layout)?;
    let chooser = ChampionChooser::new(SparseIndex::build(&layout)?);
    let reader = File::open(file).map_err(|err| DaemonError::io(file, err))?;
    let (outcome, _chooser) = ingest_reader(&layout, chooser, &name, reader)?;

    let stats = outcome.stats;
    println!(
        "{name}: {} blocks, {} stored, {} deduplicated ({:.1}% dedup)",
        stats.blocks,
        stats.not_got,
        stats.got + stats.empty,
        stats.dedup_ratio() * 100.0,
    );
    Ok(())
}
