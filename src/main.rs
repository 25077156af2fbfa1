//! Main entry point for the cvemirror CLI.
//!
//! Parses command-line arguments, configures logging, and runs the selected
//! synchronization flow once. Expected no-op conditions (no matching release,
//! nothing new) exit 0; only propagated errors exit non-zero.

use anyhow::Result;
use clap::Parser;

use cvemirror::{Cli, Command, run_delta, run_snapshot};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = cli.config();
    match cli.command {
        Command::Delta => run_delta(&config).await,
        Command::Snapshot => run_snapshot(&config).await,
    }
}

fn setup_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    // Human-readable compact format
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
