//! Workspace initialization command

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::{
    commands::in_workspace,
    config::{SimulationConfig, CONFIG_FILE},
    error::{CliError, CliResult},
};

const SAMPLE_NEURONS: &str = "name
ADAL
ADAR
AVAL
AVAR
AVBL
AVBR
PVCL
PVCR
";

const SAMPLE_CONNECTIONS: &str = "pre,post,weight
ADAL,AVAL,6.0
ADAR,AVAR,6.0
AVAL,AVBL,9.0
AVAR,AVBR,9.0
AVBL,PVCL,12.0
AVBR,PVCR,12.0
PVCL,AVAL,3.0
PVCR,AVAR,3.0
";

/// Write a default configuration and sample tables
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Directory to initialize (relative to the workspace)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,

    /// Skip the sample neuron and connection tables
    #[arg(long)]
    pub no_samples: bool,
}

impl InitCommand {
    pub async fn execute(self, workspace: PathBuf) -> CliResult<()> {
        let dir = in_workspace(&workspace, &self.dir);
        info!("Initializing spikenet workspace: {}", dir.display());

        let mut files = vec![(dir.join(CONFIG_FILE), None)];
        if !self.no_samples {
            files.push((dir.join("data").join("neurons.csv"), Some(SAMPLE_NEURONS)));
            files.push((dir.join("data").join("connections.csv"), Some(SAMPLE_CONNECTIONS)));
        }

        if !self.force {
            if let Some((existing, _)) = files.iter().find(|(path, _)| path.exists()) {
                return Err(CliError::invalid_args(format!(
                    "{} already exists (use --force to overwrite)",
                    existing.display()
                )));
            }
        }

        for (path, content) in files {
            match content {
                None => SimulationConfig::default().save_to_file(&path)?,
                Some(text) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, text)?;
                }
            }
            info!("Wrote {}", path.display());
        }

        info!("Run 'spikenet --workspace {} run' to simulate the sample network", dir.display());
        Ok(())
    }
}
