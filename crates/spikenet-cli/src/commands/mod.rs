//! CLI command implementations for spikenet

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crate::error::CliResult;

pub mod init;
pub mod inspect;
pub mod run;

/// spikenet - leaky integrate-and-fire network simulator
#[derive(Parser, Debug)]
#[command(
    name = "spikenet",
    version,
    about = "Leaky integrate-and-fire network simulator",
    long_about = "spikenet simulates a network of LIF neurons with exponentially decaying \
                  synaptic currents, read from CSV neuron and connection tables, and \
                  reports how often each neuron fired."
)]
pub struct SpikenetCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace directory (defaults to current directory)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Configuration file path (defaults to <workspace>/spikenet.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration and sample tables
    #[command(alias = "new")]
    Init(init::InitCommand),

    /// Simulate the network and print spike counts
    Run(run::RunCommand),

    /// Report table sizes and connectivity statistics
    Inspect(inspect::InspectCommand),
}

impl SpikenetCli {
    /// Execute the CLI command
    pub async fn execute(self) -> CliResult<()> {
        let workspace = match self.workspace {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let config = self.config;

        match self.command {
            Commands::Init(cmd) => cmd.execute(workspace).await,
            Commands::Run(cmd) => cmd.execute(workspace, config).await,
            Commands::Inspect(cmd) => cmd.execute(workspace).await,
        }
    }
}

/// Resolve a path relative to the workspace
pub(crate) fn in_workspace(workspace: &std::path::Path, path: &std::path::Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}
