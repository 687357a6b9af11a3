//! Run summary and JSON spike export

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use spikenet_runtime::{NeuronId, NeuronTable, SimulationResult, SpikeRecorder};

use crate::error::CliResult;

/// Spike count of one neuron
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronCount {
    /// Neuron name
    pub name: String,
    /// Spikes over the run
    pub count: u64,
}

/// One spike with the neuron resolved to its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeRecord {
    /// Neuron name
    pub neuron: String,
    /// Spike time (ms)
    pub time_ms: f64,
}

/// JSON document written by `run --spikes-out`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeReport {
    /// Sum over all neurons
    pub total_spikes: u64,
    /// Steps executed
    pub steps: u64,
    /// Simulated time (ms)
    pub simulated_ms: f64,
    /// Run stopped early
    pub cancelled: bool,
    /// Neurons with at least one spike, in table order
    pub neurons: Vec<NeuronCount>,
    /// All spikes in chronological order
    pub events: Vec<SpikeRecord>,
}

fn name_of(table: &NeuronTable, id: NeuronId) -> String {
    table
        .name(id)
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string())
}

impl SpikeReport {
    /// Build the report of a finished run
    pub fn new(table: &NeuronTable, result: &SimulationResult) -> Self {
        let recorder = &result.recorder;
        Self {
            total_spikes: recorder.total_spikes(),
            steps: result.steps_executed,
            simulated_ms: result.simulated.as_millis_f64(),
            cancelled: result.cancelled,
            neurons: active_counts(table, recorder),
            events: recorder
                .events()
                .iter()
                .map(|spike| SpikeRecord {
                    neuron: name_of(table, spike.neuron_id),
                    time_ms: spike.time.as_millis_f64(),
                })
                .collect(),
        }
    }

    /// Write pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> CliResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Neurons with a nonzero count, in table order
pub fn active_counts(table: &NeuronTable, recorder: &SpikeRecorder) -> Vec<NeuronCount> {
    recorder
        .active_neurons()
        .into_iter()
        .map(|id| NeuronCount {
            name: name_of(table, id),
            count: recorder.count_of(id),
        })
        .collect()
}

/// Human-readable summary printed after a run
pub fn render_summary(table: &NeuronTable, recorder: &SpikeRecorder) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total spikes recorded: {}", recorder.total_spikes());
    let _ = writeln!(out, "Neurons that spiked at least once:");
    for NeuronCount { name, count } in active_counts(table, recorder) {
        let _ = writeln!(out, " - {}: {} spikes", name, count);
    }
    out
}
