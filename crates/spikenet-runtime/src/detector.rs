//! Threshold detection, reset and synaptic injection
//!
//! Runs after the integrator on every step:
//! 1. every neuron with `v > v_thresh` is reset to `v_reset` and recorded
//! 2. each outgoing synapse of a spiking neuron adds its weight to the
//!    target's synaptic current
//!
//! Injections are accumulated in a per-target buffer and merged once the
//! scan is done, so the result does not depend on the order in which spiking
//! neurons are visited. The injected current is part of the state the next
//! step integrates; it never moves `v` within the current step.

use crate::{
    error::*,
    neuron::{LIFParams, NeuronState},
    recorder::SpikeRecorder,
    topology::NetworkTopology,
    NeuronId, Time,
};

/// Applies threshold/reset and delivers spikes to postsynaptic neurons
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    v_thresh: f64,
    v_reset: f64,
    /// Pending synaptic current per target
    pending: Vec<f64>,
    /// Neurons that fired in the last call, increasing index order
    fired: Vec<NeuronId>,
}

impl SpikeDetector {
    /// Create a detector sized for `neuron_count` neurons
    pub fn new(params: &LIFParams, neuron_count: usize) -> Self {
        Self {
            v_thresh: params.v_thresh,
            v_reset: params.v_reset,
            pending: vec![0.0; neuron_count],
            fired: Vec::new(),
        }
    }

    /// Detect spikes of the step at `time`, reset, record and inject
    ///
    /// Returns the number of neurons that fired. A non-finite `v` or `i_syn`
    /// from integration aborts with [`RuntimeError::NumericalInstability`]
    /// before any state is changed; a synaptic current that overflows during
    /// injection aborts the same way once the merge is done.
    pub fn detect_and_inject(
        &mut self,
        state: &mut NeuronState,
        topology: &NetworkTopology,
        time: Time,
        recorder: &mut SpikeRecorder,
    ) -> Result<usize> {
        self.check_finite(state, time)?;

        self.fired.clear();
        for (k, v) in state.v.iter_mut().enumerate() {
            if *v > self.v_thresh {
                *v = self.v_reset;
                self.fired.push(NeuronId::new(k as u32));
            }
        }

        if self.fired.is_empty() {
            return Ok(0);
        }

        for &pre in &self.fired {
            recorder.record(pre, time);
            for (post, weight) in topology.outgoing(pre) {
                self.pending[post.index()] += weight;
            }
        }

        let mut overflow = None;
        for (k, (i_syn, pending)) in state.i_syn.iter_mut().zip(self.pending.iter_mut()).enumerate() {
            if *pending != 0.0 {
                *i_syn += *pending;
                *pending = 0.0;
                if overflow.is_none() && !i_syn.is_finite() {
                    overflow = Some((k, *i_syn));
                }
            }
        }

        if let Some((neuron, value)) = overflow {
            return Err(RuntimeError::NumericalInstability {
                neuron,
                time_ns: time.nanos(),
                variable: "i_syn",
                value,
            });
        }

        Ok(self.fired.len())
    }

    /// Neurons that fired in the most recent step
    pub fn last_fired(&self) -> &[NeuronId] {
        &self.fired
    }

    fn check_finite(&self, state: &NeuronState, time: Time) -> Result<()> {
        let arrays = [("v", state.potentials()), ("i_syn", state.currents())];
        for (variable, values) in arrays {
            if let Some((neuron, &value)) = values.iter().enumerate().find(|(_, x)| !x.is_finite()) {
                return Err(RuntimeError::NumericalInstability {
                    neuron,
                    time_ns: time.nanos(),
                    variable,
                    value,
                });
            }
        }
        Ok(())
    }
}
