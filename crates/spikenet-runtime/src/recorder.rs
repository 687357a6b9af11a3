//! Spike counts and timestamps

use crate::{NeuronId, Spike, Time};

/// Append-only record of the spikes of one run
///
/// Events are stored in the order they were recorded, which is chronological;
/// within a step they follow increasing neuron index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpikeRecorder {
    events: Vec<Spike>,
    counts: Vec<u64>,
}

impl SpikeRecorder {
    /// Create an empty recorder for `neuron_count` neurons
    pub fn new(neuron_count: usize) -> Self {
        Self {
            events: Vec::new(),
            counts: vec![0; neuron_count],
        }
    }

    /// Append one spike event
    pub fn record(&mut self, neuron_id: NeuronId, time: Time) {
        debug_assert!(
            self.events.last().map_or(true, |last| last.time <= time),
            "spikes must be recorded in time order"
        );
        let k = neuron_id.index();
        if k >= self.counts.len() {
            self.counts.resize(k + 1, 0);
        }
        self.counts[k] += 1;
        self.events.push(Spike::new(neuron_id, time));
    }

    /// Total spikes of one neuron
    pub fn count_of(&self, neuron_id: NeuronId) -> u64 {
        self.counts.get(neuron_id.index()).copied().unwrap_or(0)
    }

    /// Sum of spike counts over all neurons
    pub fn total_spikes(&self) -> u64 {
        self.events.len() as u64
    }

    /// Per-neuron counts in index order
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// All events in recording order
    pub fn events(&self) -> &[Spike] {
        &self.events
    }

    /// Spike times of one neuron
    pub fn spike_times(&self, neuron_id: NeuronId) -> Vec<Time> {
        self.events
            .iter()
            .filter(|spike| spike.neuron_id == neuron_id)
            .map(|spike| spike.time)
            .collect()
    }

    /// Neurons with at least one spike, in index order
    pub fn active_neurons(&self) -> Vec<NeuronId> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(k, _)| NeuronId::new(k as u32))
            .collect()
    }

    /// Firing rate of a neuron over `duration` (Hz)
    pub fn firing_rate(&self, neuron_id: NeuronId, duration: Time) -> f64 {
        if duration.nanos() == 0 {
            return 0.0;
        }
        self.count_of(neuron_id) as f64 / (duration.nanos() as f64 / 1e9)
    }

    /// Export spikes to simple format (time_ns, neuron_id)
    pub fn export(&self) -> Vec<(u64, u32)> {
        self.events
            .iter()
            .map(|spike| (spike.time.nanos(), spike.neuron_id.raw()))
            .collect()
    }
}
