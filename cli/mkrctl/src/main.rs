//! mkrctl (mkr) - CLI for Mackerel service metadata
//!
//! Manages `(service, namespace)` metadata documents declaratively from a
//! TOML manifest, with state tracked in a local JSON file.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod manifest;
mod output;
mod state;

use commands::{Cli, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    // Run the command
    if let Err(e) = cli.run().await {
        // Print error in a user-friendly way
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

/// Logs go to stderr so command output on stdout stays machine-readable.
/// Prefer MKR_LOG, then RUST_LOG, falling back to warnings only.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env("MKR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
