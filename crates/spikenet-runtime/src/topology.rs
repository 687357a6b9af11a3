//! Immutable network connectivity
//!
//! Synapses are stored in compressed sparse row form keyed by the
//! pre-synaptic neuron, so delivering a spike costs O(out-degree). The edge
//! list is a multiset: repeated (pre, post) pairs stay separate synapses and
//! each one contributes its own weight.

use crate::{error::*, NeuronId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Directed weighted connection between two neurons
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Synapse {
    /// Pre-synaptic neuron ID
    pub pre: NeuronId,
    /// Post-synaptic neuron ID
    pub post: NeuronId,
    /// Increment applied to the target's synaptic current (mV)
    pub weight: f64,
}

impl Synapse {
    /// Create a new synapse
    pub fn new(pre: NeuronId, post: NeuronId, weight: f64) -> Self {
        Self { pre, post, weight }
    }
}

/// Adjacency of the whole network, grouped by source neuron
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkTopology {
    neuron_count: usize,
    /// `offsets[k]..offsets[k + 1]` spans the outgoing synapses of neuron `k`
    offsets: Vec<usize>,
    targets: Vec<NeuronId>,
    weights: Vec<f64>,
}

impl NetworkTopology {
    /// Build the adjacency structure from an edge list
    ///
    /// Outgoing synapses of each neuron keep the order in which they appear in
    /// `edges`. Fails with [`RuntimeError::InvalidIndex`] if any endpoint is
    /// outside `0..neuron_count`.
    pub fn build<I>(neuron_count: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = Synapse>,
    {
        let edges: Vec<Synapse> = edges.into_iter().collect();

        let mut offsets = vec![0usize; neuron_count + 1];
        for synapse in &edges {
            for index in [synapse.pre.index(), synapse.post.index()] {
                if index >= neuron_count {
                    return Err(RuntimeError::InvalidIndex { index, neuron_count });
                }
            }
            if !synapse.weight.is_finite() {
                return Err(RuntimeError::invalid_parameter(
                    format!("weight[{} -> {}]", synapse.pre, synapse.post),
                    synapse.weight.to_string(),
                    "finite",
                ));
            }
            offsets[synapse.pre.index() + 1] += 1;
        }
        for k in 0..neuron_count {
            offsets[k + 1] += offsets[k];
        }

        // Counting sort, stable within each source
        let mut cursor = offsets.clone();
        let mut targets = vec![NeuronId::new(0); edges.len()];
        let mut weights = vec![0.0; edges.len()];
        for synapse in &edges {
            let slot = &mut cursor[synapse.pre.index()];
            targets[*slot] = synapse.post;
            weights[*slot] = synapse.weight;
            *slot += 1;
        }

        log::debug!(
            "Built topology: {} neurons, {} synapses",
            neuron_count,
            edges.len()
        );

        Ok(Self {
            neuron_count,
            offsets,
            targets,
            weights,
        })
    }

    /// Network without any synapses
    pub fn unconnected(neuron_count: usize) -> Self {
        Self {
            neuron_count,
            offsets: vec![0; neuron_count + 1],
            targets: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Get neuron count
    pub fn neuron_count(&self) -> usize {
        self.neuron_count
    }

    /// Get synapse count
    pub fn synapse_count(&self) -> usize {
        self.targets.len()
    }

    /// Number of outgoing synapses of `pre`
    pub fn out_degree(&self, pre: NeuronId) -> usize {
        let k = pre.index();
        if k >= self.neuron_count {
            return 0;
        }
        self.offsets[k + 1] - self.offsets[k]
    }

    /// Outgoing `(post, weight)` pairs of `pre`, in insertion order
    pub fn outgoing(&self, pre: NeuronId) -> impl Iterator<Item = (NeuronId, f64)> + '_ {
        let k = pre.index();
        let range = if k < self.neuron_count {
            self.offsets[k]..self.offsets[k + 1]
        } else {
            0..0
        };
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    /// All synapses, grouped by source in index order
    pub fn synapses(&self) -> impl Iterator<Item = Synapse> + '_ {
        (0..self.neuron_count).flat_map(move |k| {
            let pre = NeuronId::new(k as u32);
            self.outgoing(pre)
                .map(move |(post, weight)| Synapse::new(pre, post, weight))
        })
    }
}

/// Builder for constructing network topologies in code
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    neuron_count: usize,
    synapses: Vec<Synapse>,
}

impl TopologyBuilder {
    /// Create a new topology builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of neurons
    pub fn neurons(mut self, count: usize) -> Self {
        self.neuron_count = count;
        self
    }

    /// Add a synapse
    pub fn add_synapse(mut self, pre: u32, post: u32, weight: f64) -> Self {
        self.synapses
            .push(Synapse::new(NeuronId::new(pre), NeuronId::new(post), weight));
        self
    }

    /// Connect neuron `k` to `k + 1` for every neuron
    pub fn chain(mut self, weight: f64) -> Self {
        for k in 1..self.neuron_count as u32 {
            self.synapses
                .push(Synapse::new(NeuronId::new(k - 1), NeuronId::new(k), weight));
        }
        self
    }

    /// Connect all neurons in a fully connected pattern (no self-connections)
    pub fn fully_connected(mut self, weight: f64) -> Self {
        let n = self.neuron_count as u32;
        for pre in 0..n {
            for post in 0..n {
                if pre != post {
                    self.synapses
                        .push(Synapse::new(NeuronId::new(pre), NeuronId::new(post), weight));
                }
            }
        }
        self
    }

    /// Build the topology
    pub fn build(self) -> Result<NetworkTopology> {
        NetworkTopology::build(self.neuron_count, self.synapses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(k: u32) -> NeuronId {
        NeuronId::new(k)
    }

    #[test]
    fn test_empty_topology() {
        let topology = NetworkTopology::build(3, Vec::new()).unwrap();
        assert_eq!(topology.neuron_count(), 3);
        assert_eq!(topology.synapse_count(), 0);
        assert_eq!(topology.outgoing(id(1)).count(), 0);
        assert_eq!(topology, NetworkTopology::unconnected(3));
    }

    #[test]
    fn test_grouping_preserves_order() {
        let topology = TopologyBuilder::new()
            .neurons(3)
            .add_synapse(2, 0, 0.5)
            .add_synapse(0, 2, 1.0)
            .add_synapse(0, 1, 2.0)
            .build()
            .unwrap();

        let out: Vec<_> = topology.outgoing(id(0)).collect();
        assert_eq!(out, vec![(id(2), 1.0), (id(1), 2.0)]);
        assert_eq!(topology.out_degree(id(1)), 0);
        assert_eq!(topology.out_degree(id(2)), 1);

        let all: Vec<_> = topology.synapses().map(|s| (s.pre.raw(), s.post.raw())).collect();
        assert_eq!(all, vec![(0, 2), (0, 1), (2, 0)]);
    }

    #[test]
    fn test_duplicate_pairs_are_kept() {
        let topology = TopologyBuilder::new()
            .neurons(2)
            .add_synapse(0, 1, 1.5)
            .add_synapse(0, 1, 1.5)
            .build()
            .unwrap();

        assert_eq!(topology.synapse_count(), 2);
        let total: f64 = topology.outgoing(id(0)).map(|(_, w)| w).sum();
        assert_eq!(total, 3.0);
    }

    #[test]
    fn test_invalid_index() {
        let err = TopologyBuilder::new()
            .neurons(2)
            .add_synapse(0, 2, 1.0)
            .build()
            .unwrap_err();
        assert_eq!(err, RuntimeError::InvalidIndex { index: 2, neuron_count: 2 });

        let err = NetworkTopology::build(1, vec![Synapse::new(id(5), id(0), 1.0)]).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidIndex { index: 5, .. }));
    }

    #[test]
    fn test_non_finite_weight() {
        let err = NetworkTopology::build(2, vec![Synapse::new(id(0), id(1), f64::NAN)]).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidParameter { .. }));
    }

    #[test]
    fn test_builder_patterns() {
        let chain = TopologyBuilder::new().neurons(4).chain(0.2).build().unwrap();
        assert_eq!(chain.synapse_count(), 3);

        let full = TopologyBuilder::new().neurons(3).fully_connected(0.1).build().unwrap();
        assert_eq!(full.synapse_count(), 6); // 3x3 - 3 (no self-connections)
    }

    #[test]
    fn test_out_of_range_queries() {
        let topology = TopologyBuilder::new().neurons(2).chain(1.0).build().unwrap();
        assert_eq!(topology.out_degree(id(9)), 0);
        assert_eq!(topology.outgoing(id(9)).count(), 0);
    }
}
