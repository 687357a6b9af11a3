//! Simulation configuration file (`spikenet.toml`)

use std::path::Path;
use serde::{Deserialize, Serialize};

use spikenet_runtime::{LIFParams, RuntimeError, Scheme, SimulationParams, Stimulus, Time};

use crate::error::{CliError, CliResult};

/// Default configuration file name inside a workspace
pub const CONFIG_FILE: &str = "spikenet.toml";

/// Complete simulation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Neuron model constants
    pub model: ModelConfig,
    /// Clock settings
    pub run: RunConfig,
    /// Initial current injection
    pub stimulus: StimulusConfig,
    /// Connection table handling
    pub network: NetworkConfig,
}

/// Neuron model constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Membrane time constant (ms)
    pub tau_ms: f64,
    /// Synaptic time constant (ms)
    pub tau_syn_ms: f64,
    /// Resting potential (mV)
    pub v_rest_mv: f64,
    /// Spike threshold (mV)
    pub v_thresh_mv: f64,
    /// Reset potential (mV)
    pub v_reset_mv: f64,
    /// Integration scheme
    pub scheme: Scheme,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let lif = LIFParams::default();
        Self {
            tau_ms: lif.tau,
            tau_syn_ms: lif.tau_syn,
            v_rest_mv: lif.v_rest,
            v_thresh_mv: lif.v_thresh,
            v_reset_mv: lif.v_reset,
            scheme: Scheme::Exact,
        }
    }
}

/// Clock settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Integration step (ms)
    pub dt_ms: f64,
    /// Total simulated time (ms)
    pub duration_ms: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dt_ms: 0.1,
            duration_ms: 500.0,
        }
    }
}

/// Initial current injection into the first-listed neurons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Synaptic current at t=0 (mV)
    pub value_mv: f64,
    /// Number of neurons stimulated
    pub count: usize,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            value_mv: 2.5,
            count: 5,
        }
    }
}

/// Connection table handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Factor converting table weights to millivolts
    pub weight_scale: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { weight_scale: 1.0 }
    }
}

impl SimulationConfig {
    /// Load configuration from file, falling back to defaults if it does not exist
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load_existing(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file that must exist
    pub fn load_existing(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Err(CliError::missing_resource(format!("config file {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validated model constants
    pub fn lif_params(&self) -> CliResult<LIFParams> {
        let m = &self.model;
        Ok(LIFParams::new(m.tau_ms, m.tau_syn_ms, m.v_rest_mv, m.v_thresh_mv, m.v_reset_mv)?)
    }

    /// Validated clock settings
    pub fn simulation_params(&self) -> CliResult<SimulationParams> {
        let dt = millis_to_time("dt_ms", self.run.dt_ms)?;
        let duration = millis_to_time("duration_ms", self.run.duration_ms)?;
        Ok(SimulationParams::new(dt.nanos(), duration.nanos())?.with_scheme(self.model.scheme))
    }

    /// Initial stimulus
    pub fn stimulus(&self) -> Stimulus {
        Stimulus::new(self.stimulus.value_mv, self.stimulus.count)
    }
}

/// Convert a positive millisecond setting to the integral clock
fn millis_to_time(parameter: &str, ms: f64) -> CliResult<Time> {
    if !(ms.is_finite() && ms > 0.0) {
        return Err(RuntimeError::invalid_parameter(parameter, ms.to_string(), "finite and > 0").into());
    }
    let time = Time::from_millis_f64(ms);
    if time.nanos() == 0 {
        return Err(RuntimeError::invalid_parameter(parameter, ms.to_string(), ">= 1ns").into());
    }
    Ok(time)
}
