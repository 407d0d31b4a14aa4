// ============================================================
// digit-classifier — entry point
// ============================================================
// Parses the command line first so `-v` can pick the log level,
// installs the tracing subscriber, then hands over to Layer 1.
//
// Log lines go to stderr; stdout only carries results such as
// the per-epoch summary and `test accuracy: ...`. RUST_LOG, when
// set, overrides `-v`.

#![recursion_limit = "256"]

mod cli;
mod application;
mod domain;
mod data;
mod ml;
mod infra;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli.run()
}
