//! Table and connectivity inspection command

use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use spikenet_runtime::{NetworkTopology, NeuronId, NeuronTable};

use crate::{
    commands::in_workspace,
    error::CliResult,
    tables::{read_connections, read_neuron_table},
};

/// Report table sizes and connectivity statistics
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Neuron table (CSV, first column is the name)
    #[arg(long, default_value = "data/neurons.csv")]
    pub neurons: PathBuf,

    /// Connection table (CSV: pre, post, weight)
    #[arg(long, default_value = "data/connections.csv")]
    pub connections: PathBuf,

    /// List every repeated (pre, post) pair
    #[arg(short, long)]
    pub detailed: bool,
}

/// Connectivity summary of a resolved network
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkStats {
    /// Number of neurons
    pub neurons: usize,
    /// Number of synapses (repeated pairs counted separately)
    pub synapses: usize,
    /// Largest out-degree
    pub max_out_degree: usize,
    /// Neurons without outgoing synapses
    pub sinks: usize,
    /// (pre, post) pairs connected more than once, with multiplicity
    pub repeated_pairs: Vec<((NeuronId, NeuronId), usize)>,
}

impl NetworkStats {
    /// Gather statistics from a topology
    pub fn from_topology(topology: &NetworkTopology) -> Self {
        let degrees: Vec<usize> = (0..topology.neuron_count())
            .map(|k| topology.out_degree(NeuronId::new(k as u32)))
            .collect();

        let mut pairs: BTreeMap<(NeuronId, NeuronId), usize> = BTreeMap::new();
        for synapse in topology.synapses() {
            *pairs.entry((synapse.pre, synapse.post)).or_default() += 1;
        }

        Self {
            neurons: topology.neuron_count(),
            synapses: topology.synapse_count(),
            max_out_degree: degrees.iter().copied().max().unwrap_or(0),
            sinks: degrees.iter().filter(|&&d| d == 0).count(),
            repeated_pairs: pairs.into_iter().filter(|(_, n)| *n > 1).collect(),
        }
    }

    /// Mean out-degree
    pub fn mean_out_degree(&self) -> f64 {
        if self.neurons == 0 {
            0.0
        } else {
            self.synapses as f64 / self.neurons as f64
        }
    }
}

impl InspectCommand {
    pub async fn execute(self, workspace: PathBuf) -> CliResult<()> {
        let table = read_neuron_table(&in_workspace(&workspace, &self.neurons))?;
        let rows = read_connections(&in_workspace(&workspace, &self.connections))?;
        let topology = NetworkTopology::build(table.len(), table.resolve(&rows, 1.0)?)?;
        let stats = NetworkStats::from_topology(&topology);

        info!("Neurons: {}", stats.neurons);
        info!("Synapses: {}", stats.synapses);
        info!(
            "Out-degree: mean {:.2}, max {}, {} neurons without outgoing synapses",
            stats.mean_out_degree(),
            stats.max_out_degree,
            stats.sinks
        );
        info!("Repeated (pre, post) pairs: {}", stats.repeated_pairs.len());

        if self.detailed {
            for ((pre, post), count) in &stats.repeated_pairs {
                info!("  {} -> {}: {} synapses", label(&table, *pre), label(&table, *post), count);
            }
        }

        Ok(())
    }
}

fn label(table: &NeuronTable, id: NeuronId) -> String {
    table.name(id).map(str::to_string).unwrap_or_else(|| id.to_string())
}
