//! Simulation run command

use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use spikenet_runtime::{
    CancellationToken, Scheme, SimulationEngine, SimulationState,
};

use crate::{
    commands::in_workspace,
    config::{SimulationConfig, CONFIG_FILE},
    error::{CliError, CliResult},
    report::{render_summary, SpikeReport},
    tables::{read_connections, read_neuron_table},
};

/// Simulate the network and print spike counts
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Neuron table (CSV, first column is the name)
    #[arg(long, default_value = "data/neurons.csv")]
    pub neurons: PathBuf,

    /// Connection table (CSV: pre, post, weight)
    #[arg(long, default_value = "data/connections.csv")]
    pub connections: PathBuf,

    /// Integration step in milliseconds (overrides config)
    #[arg(long)]
    pub dt_ms: Option<f64>,

    /// Simulated duration in milliseconds (overrides config)
    #[arg(long)]
    pub duration_ms: Option<f64>,

    /// Initial synaptic current of stimulated neurons in mV (overrides config)
    #[arg(long)]
    pub stimulus_mv: Option<f64>,

    /// Number of first-listed neurons to stimulate (overrides config)
    #[arg(long)]
    pub stimulus_count: Option<usize>,

    /// Integration scheme (overrides config)
    #[arg(long, value_parser = parse_scheme)]
    pub scheme: Option<Scheme>,

    /// Write spike counts and events as JSON
    #[arg(long)]
    pub spikes_out: Option<PathBuf>,

    /// Log per-step timing statistics
    #[arg(long)]
    pub perf: bool,
}

fn parse_scheme(s: &str) -> Result<Scheme, String> {
    s.parse::<Scheme>().map_err(|e| e.to_string())
}

impl RunCommand {
    /// Merge command-line overrides into the loaded configuration
    pub fn apply_overrides(&self, config: &mut SimulationConfig) {
        if let Some(dt) = self.dt_ms {
            config.run.dt_ms = dt;
        }
        if let Some(duration) = self.duration_ms {
            config.run.duration_ms = duration;
        }
        if let Some(value) = self.stimulus_mv {
            config.stimulus.value_mv = value;
        }
        if let Some(count) = self.stimulus_count {
            config.stimulus.count = count;
        }
        if let Some(scheme) = self.scheme {
            config.model.scheme = scheme;
        }
    }

    pub async fn execute(self, workspace: PathBuf, config: Option<PathBuf>) -> CliResult<()> {
        let mut config = match config {
            Some(path) => SimulationConfig::load_existing(&in_workspace(&workspace, &path))?,
            None => SimulationConfig::load_from_file(&workspace.join(CONFIG_FILE))?,
        };
        self.apply_overrides(&mut config);

        let table = read_neuron_table(&in_workspace(&workspace, &self.neurons))?;
        let rows = read_connections(&in_workspace(&workspace, &self.connections))?;
        info!("Loaded {} neurons and {} connections", table.len(), rows.len());

        let state = SimulationState::from_tables(
            &table,
            &rows,
            config.network.weight_scale,
            config.lif_params()?,
            config.stimulus(),
        )?;
        let params = config.simulation_params()?.with_perf(self.perf);

        let token = CancellationToken::new();
        let engine = SimulationEngine::new(state, params)?.with_cancellation(token.clone());

        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current step");
                token.cancel();
            }
        });

        let result = tokio::task::spawn_blocking(move || engine.run())
            .await
            .map_err(|e| CliError::Generic(anyhow::anyhow!("simulation task failed: {}", e)))??;
        interrupt.abort();

        if result.cancelled {
            warn!(
                "Run cancelled after {} steps ({}); counts cover the completed steps only",
                result.steps_executed, result.simulated
            );
        }
        if let Some(perf) = &result.perf {
            info!(
                "Step timing: avg {}ns, max {}ns over {} steps",
                perf.avg_step_ns, perf.max_step_ns, perf.steps
            );
        }

        println!();
        print!("{}", render_summary(&table, &result.recorder));

        if let Some(out) = &self.spikes_out {
            let out = in_workspace(&workspace, out);
            SpikeReport::new(&table, &result).write_json(&out)?;
            info!("Spike report written to {}", out.display());
        }

        Ok(())
    }
}
