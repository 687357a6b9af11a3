//! # spikenet - leaky integrate-and-fire network simulator
//!
//! Reads neuron and connection tables, runs the fixed-step simulation and
//! prints how many times each neuron fired.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spikenet_cli::{error::CliResult, SpikenetCli};

#[tokio::main]
async fn main() -> CliResult<()> {
    // Parse CLI arguments
    let cli = SpikenetCli::parse();

    // Initialize logging with environment variable support
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute the command
    if let Err(err) = cli.execute().await {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }

    Ok(())
}
