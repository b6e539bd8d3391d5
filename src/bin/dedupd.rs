#![deny(unsafe_code)]

use mimalloc::MiMalloc;

/// High-performance memory allocator for improved allocation throughput.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = match daemon::Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            let code = if error.use_stderr() {
                daemon::ExitCode::Config
            } else {
                daemon::ExitCode::Ok
            };
            return ExitCode::from(code);
        }
    };
    match daemon::run(cli) {
        Ok(()) => ExitCode::from(daemon::ExitCode::Ok),
        Err(error) => {
            eprintln!("dedupd: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}
