//! LIF model constants and per-neuron state

use crate::{error::*, NeuronId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters shared by every neuron of the network
///
/// ```text
/// dv/dt     = (v_rest - v + i_syn) / tau
/// di_syn/dt = -i_syn / tau_syn
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LIFParams {
    /// Membrane time constant (ms)
    pub tau: f64,
    /// Synaptic current time constant (ms)
    pub tau_syn: f64,
    /// Resting potential (mV)
    pub v_rest: f64,
    /// Threshold potential (mV)
    pub v_thresh: f64,
    /// Reset potential (mV)
    pub v_reset: f64,
}

impl Default for LIFParams {
    fn default() -> Self {
        Self {
            tau: 10.0,       // 10ms membrane time constant
            tau_syn: 5.0,    // 5ms synaptic time constant
            v_rest: -65.0,   // -65mV resting potential
            v_thresh: -50.0, // -50mV threshold
            v_reset: -65.0,  // -65mV reset potential
        }
    }
}

impl LIFParams {
    /// Create new LIF parameters with validation
    pub fn new(tau: f64, tau_syn: f64, v_rest: f64, v_thresh: f64, v_reset: f64) -> Result<Self> {
        let params = Self {
            tau,
            tau_syn,
            v_rest,
            v_thresh,
            v_reset,
        };
        params.validate()?;
        Ok(params)
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        require_positive("tau", self.tau)?;
        require_positive("tau_syn", self.tau_syn)?;
        require_finite("v_rest", self.v_rest)?;
        require_finite("v_thresh", self.v_thresh)?;
        require_finite("v_reset", self.v_reset)?;
        // A reset at or above threshold would fire again on every step
        if self.v_thresh <= self.v_reset {
            return Err(RuntimeError::invalid_parameter(
                "v_thresh",
                format!("{} (with v_reset={})", self.v_thresh, self.v_reset),
                "> v_reset",
            ));
        }
        Ok(())
    }
}

/// Initial synaptic current injected into the first neurons of the table
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stimulus {
    /// Synaptic current set at t=0 (mV)
    pub value: f64,
    /// How many of the first-listed neurons receive it
    pub count: usize,
}

impl Stimulus {
    /// Create a new stimulus
    pub fn new(value: f64, count: usize) -> Self {
        Self { value, count }
    }

    /// Stimulus that touches no neuron
    pub fn none() -> Self {
        Self::default()
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        require_finite("stimulus_value", self.value)
    }
}

/// Mutable dynamical variables of every neuron, stored as parallel arrays
#[derive(Debug, Clone, PartialEq)]
pub struct NeuronState {
    /// Membrane potential per neuron (mV)
    pub(crate) v: Vec<f64>,
    /// Synaptic current per neuron (mV)
    pub(crate) i_syn: Vec<f64>,
}

impl NeuronState {
    /// Every neuron at rest with no synaptic current
    pub fn new(neuron_count: usize, params: &LIFParams) -> Self {
        Self {
            v: vec![params.v_rest; neuron_count],
            i_syn: vec![0.0; neuron_count],
        }
    }

    /// Resting state plus the initial stimulus
    ///
    /// A stimulus count larger than the network is clamped.
    pub fn with_stimulus(neuron_count: usize, params: &LIFParams, stimulus: &Stimulus) -> Self {
        let mut state = Self::new(neuron_count, params);
        let stimulated = stimulus.count.min(neuron_count);
        state.i_syn[..stimulated].fill(stimulus.value);
        state
    }

    /// Number of neurons
    pub fn len(&self) -> usize {
        self.v.len()
    }

    /// True when the network has no neurons
    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    /// Membrane potential of a neuron
    pub fn v(&self, id: NeuronId) -> f64 {
        self.v[id.index()]
    }

    /// Synaptic current of a neuron
    pub fn i_syn(&self, id: NeuronId) -> f64 {
        self.i_syn[id.index()]
    }

    /// All membrane potentials in index order
    pub fn potentials(&self) -> &[f64] {
        &self.v
    }

    /// All synaptic currents in index order
    pub fn currents(&self) -> &[f64] {
        &self.i_syn
    }

    /// Overwrite the state of one neuron
    pub fn set(&mut self, id: NeuronId, v: f64, i_syn: f64) {
        self.v[id.index()] = v;
        self.i_syn[id.index()] = i_syn;
    }

    /// Add to a neuron's synaptic current
    pub fn add_current(&mut self, id: NeuronId, current: f64) {
        self.i_syn[id.index()] += current;
    }
}
