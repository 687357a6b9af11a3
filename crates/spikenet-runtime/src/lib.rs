//! Fixed-step leaky integrate-and-fire network simulation engine
//!
//! This crate advances a network of point neurons with exponentially decaying
//! synaptic currents through discrete time. Each step integrates every neuron
//! with the closed-form solution of its linear dynamics, detects threshold
//! crossings, resets the neurons that fired and delivers their spikes to
//! postsynaptic targets with zero synaptic delay.
//!
//! The pieces, leaf first:
//! - [`topology`]: immutable weighted connectivity grouped by source neuron
//! - [`neuron`]: model constants and per-neuron mutable state
//! - [`integrator`]: exact propagators and the per-step state update
//! - [`detector`]: threshold, reset and synaptic injection
//! - [`recorder`]: spike counts and timestamps
//! - [`simulation`]: the fixed-step driver
//! - [`tables`]: name resolution for externally supplied neuron/connection tables

#![deny(missing_docs)]
#![warn(clippy::all)]

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Neuron identifier (row index in the neuron table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronId(pub u32);

impl NeuronId {
    /// Create a new neuron ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Index into per-neuron arrays
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Simulation time in nanoseconds since the start of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Time(pub u64);

impl Time {
    /// Zero time constant
    pub const ZERO: Self = Self(0);

    /// Create time from nanoseconds
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    /// Create time from whole milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * NANOS_PER_MILLI)
    }

    /// Create time from fractional milliseconds, rounded to the nearest nanosecond
    pub fn from_millis_f64(ms: f64) -> Self {
        Self((ms * NANOS_PER_MILLI as f64).round() as u64)
    }

    /// Get nanoseconds
    pub const fn nanos(&self) -> u64 {
        self.0
    }

    /// Get time in milliseconds
    pub fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / NANOS_PER_MILLI as f64
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.as_millis_f64())
    }
}

/// A spike event: neuron index plus the time of the step that detected it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spike {
    /// Neuron that spiked
    pub neuron_id: NeuronId,
    /// Time of spike
    pub time: Time,
}

impl Spike {
    /// Create a new spike
    pub const fn new(neuron_id: NeuronId, time: Time) -> Self {
        Self { neuron_id, time }
    }
}

// Core modules
pub mod error;
pub mod topology;
pub mod neuron;
pub mod integrator;
pub mod detector;
pub mod recorder;
pub mod tables;
pub mod simulation;

// Re-export essential types
pub use error::{RuntimeError, Result};
pub use topology::{NetworkTopology, Synapse, TopologyBuilder};
pub use neuron::{LIFParams, NeuronState, Stimulus};
pub use integrator::{ExactLif, ExponentialEulerLif, IntegrableModel, Integrator, Scheme};
pub use detector::SpikeDetector;
pub use recorder::SpikeRecorder;
pub use tables::{ConnectionRow, NeuronTable};
pub use simulation::{
    CancellationToken, SimulationEngine, SimulationParams, SimulationResult,
    SimulationState, StateSample, run_fixed_step,
};

/// Nanoseconds per millisecond
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Default simulation time step (0.1 millisecond in nanoseconds)
pub const DEFAULT_TIMESTEP_NS: u64 = 100_000;
