//! Fixed-step simulation driver
//!
//! Every step at `t = k * dt` integrates all neurons, then detects spikes,
//! resets, records and injects synaptic current. Cancellation is only
//! observed between steps, so a step is always either fully applied or not
//! applied at all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::{
    detector::SpikeDetector,
    error::*,
    integrator::{Integrator, Scheme},
    neuron::{LIFParams, NeuronState, Stimulus},
    recorder::SpikeRecorder,
    tables::{ConnectionRow, NeuronTable},
    topology::NetworkTopology,
    NeuronId, Time, DEFAULT_TIMESTEP_NS, NANOS_PER_MILLI,
};

/// Simulation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    /// Time step duration (ns)
    pub dt_ns: u64,
    /// Total simulation duration (ns)
    pub duration_ns: u64,
    /// Integration scheme
    pub scheme: Scheme,
    /// Record `v`/`i_syn` of these neurons after every step
    pub record_state: Option<Vec<NeuronId>>,
    /// Enable performance sampling
    pub perf_enabled: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt_ns: DEFAULT_TIMESTEP_NS,         // 0.1ms timestep
            duration_ns: 500 * NANOS_PER_MILLI, // 500ms
            scheme: Scheme::Exact,
            record_state: None,
            perf_enabled: false,
        }
    }
}

impl SimulationParams {
    /// Create new simulation parameters with validation
    pub fn new(dt_ns: u64, duration_ns: u64) -> Result<Self> {
        let params = Self {
            dt_ns,
            duration_ns,
            ..Default::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Select the integration scheme
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Record state variables of these neurons after every step
    pub fn with_state_recording(mut self, neurons: Vec<NeuronId>) -> Self {
        self.record_state = Some(neurons);
        self
    }

    /// Enable or disable performance sampling
    pub fn with_perf(mut self, enabled: bool) -> Self {
        self.perf_enabled = enabled;
        self
    }

    /// Get timestep in milliseconds
    pub fn dt_ms(&self) -> f64 {
        self.dt_ns as f64 / NANOS_PER_MILLI as f64
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.duration_ns as f64 / NANOS_PER_MILLI as f64
    }

    /// Number of steps: `ceil(duration / dt)`
    pub fn num_steps(&self) -> u64 {
        self.duration_ns.div_ceil(self.dt_ns)
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.dt_ns == 0 {
            return Err(RuntimeError::invalid_parameter("dt_ns", "0", "> 0"));
        }
        if self.duration_ns == 0 {
            return Err(RuntimeError::invalid_parameter("duration_ns", "0", "> 0"));
        }
        // The clock reaches num_steps * dt after the last step
        if self.num_steps().checked_mul(self.dt_ns).is_none() {
            return Err(RuntimeError::invalid_parameter(
                "duration_ns",
                self.duration_ns.to_string(),
                format!("a whole number of {}ns steps that fits in u64 nanoseconds", self.dt_ns),
            ));
        }
        Ok(())
    }
}

/// Cooperative stop signal checked between steps
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create an untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop after the current step
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Recorded state variables of one neuron after one step
#[derive(Debug, Clone, PartialEq)]
pub struct StateSample {
    /// Neuron ID
    pub neuron_id: NeuronId,
    /// Step time
    pub time: Time,
    /// Membrane potential (mV)
    pub v: f64,
    /// Synaptic current (mV)
    pub i_syn: f64,
}

/// Performance metrics collected during simulation steps.
/// Present when SimulationParams::with_perf(true) is used.
#[derive(Debug, Clone)]
pub struct PerfReport {
    /// Average step time in nanoseconds
    pub avg_step_ns: u64,
    /// Max step time in nanoseconds
    pub max_step_ns: u64,
    /// Steps sampled
    pub steps: usize,
}

/// Everything a run owns: connectivity, model constants and neuron state
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Network connectivity
    pub topology: NetworkTopology,
    /// Model constants
    pub params: LIFParams,
    /// Per-neuron state
    pub neurons: NeuronState,
}

impl SimulationState {
    /// Rest every neuron, then apply the initial stimulus
    pub fn new(topology: NetworkTopology, params: LIFParams, stimulus: Stimulus) -> Result<Self> {
        params.validate()?;
        stimulus.validate()?;
        let neurons = NeuronState::with_stimulus(topology.neuron_count(), &params, &stimulus);
        Ok(Self {
            topology,
            params,
            neurons,
        })
    }

    /// Build from a resolved neuron table and connection rows
    pub fn from_tables<'a, I>(
        table: &NeuronTable,
        rows: I,
        weight_scale: f64,
        params: LIFParams,
        stimulus: Stimulus,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ConnectionRow>,
    {
        let synapses = table.resolve(rows, weight_scale)?;
        let topology = NetworkTopology::build(table.len(), synapses)?;
        Self::new(topology, params, stimulus)
    }

    /// Number of neurons
    pub fn neuron_count(&self) -> usize {
        self.topology.neuron_count()
    }
}

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Spike counts and events
    pub recorder: SpikeRecorder,
    /// State samples (if recorded)
    pub samples: Vec<StateSample>,
    /// Neuron state after the last executed step
    pub final_state: NeuronState,
    /// Number of steps executed
    pub steps_executed: u64,
    /// Simulated time covered by the executed steps
    pub simulated: Time,
    /// True if the run stopped early on a cancellation request
    pub cancelled: bool,
    /// Optional performance report
    pub perf: Option<PerfReport>,
}

impl SimulationResult {
    /// Sum of spike counts over all neurons
    pub fn total_spikes(&self) -> u64 {
        self.recorder.total_spikes()
    }

    /// Get samples for a specific neuron
    pub fn samples_for_neuron(&self, neuron_id: NeuronId) -> Vec<&StateSample> {
        self.samples
            .iter()
            .filter(|sample| sample.neuron_id == neuron_id)
            .collect()
    }

    /// Get average firing rate across all neurons (Hz)
    pub fn average_firing_rate(&self) -> f64 {
        let neurons = self.recorder.counts().len();
        if neurons == 0 || self.simulated.nanos() == 0 {
            return 0.0;
        }
        let duration_s = self.simulated.nanos() as f64 / 1e9;
        self.total_spikes() as f64 / duration_s / neurons as f64
    }
}

/// Simulation engine
#[derive(Debug)]
pub struct SimulationEngine {
    state: SimulationState,
    params: SimulationParams,
    integrator: Integrator,
    detector: SpikeDetector,
    recorder: SpikeRecorder,
    samples: Vec<StateSample>,
    /// Steps executed so far; the next step runs at `step * dt`
    step: u64,
    cancel: Option<CancellationToken>,
    /// Per-step timing samples (ns), captured when perf_enabled
    perf_samples: Vec<u64>,
}

impl SimulationEngine {
    /// Create a new simulation engine
    pub fn new(state: SimulationState, params: SimulationParams) -> Result<Self> {
        params.validate()?;

        if let Some(neurons) = &params.record_state {
            if let Some(bad) = neurons.iter().find(|id| id.index() >= state.neuron_count()) {
                return Err(RuntimeError::InvalidIndex {
                    index: bad.index(),
                    neuron_count: state.neuron_count(),
                });
            }
        }

        let integrator = Integrator::for_scheme(params.scheme, &state.params, params.dt_ms())?;
        let detector = SpikeDetector::new(&state.params, state.neuron_count());
        let recorder = SpikeRecorder::new(state.neuron_count());

        Ok(Self {
            state,
            params,
            integrator,
            detector,
            recorder,
            samples: Vec::new(),
            step: 0,
            cancel: None,
            perf_samples: Vec::new(),
        })
    }

    /// Stop between steps once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Time of the next step
    pub fn current_time(&self) -> Time {
        Time::from_nanos(self.step * self.params.dt_ns)
    }

    /// Steps executed so far
    pub fn steps_executed(&self) -> u64 {
        self.step
    }

    /// Get simulation state
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Get simulation parameters
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Get spikes recorded so far
    pub fn recorder(&self) -> &SpikeRecorder {
        &self.recorder
    }

    /// Execute one step; returns the number of neurons that fired
    pub fn step(&mut self) -> Result<usize> {
        let time = self.current_time();

        self.integrator.step(&mut self.state.neurons);
        let fired = self.detector.detect_and_inject(
            &mut self.state.neurons,
            &self.state.topology,
            time,
            &mut self.recorder,
        )?;

        if let Some(neurons) = &self.params.record_state {
            for &neuron_id in neurons {
                self.samples.push(StateSample {
                    neuron_id,
                    time,
                    v: self.state.neurons.v(neuron_id),
                    i_syn: self.state.neurons.i_syn(neuron_id),
                });
            }
        }

        self.step += 1;
        Ok(fired)
    }

    /// Run the remaining steps and hand back the recorded spikes
    pub fn run(mut self) -> Result<SimulationResult> {
        let num_steps = self.params.num_steps();
        log::info!(
            "Starting simulation: {} neurons, {} synapses, {}ms with {}ms timestep ({} steps, {} integration)",
            self.state.neuron_count(),
            self.state.topology.synapse_count(),
            self.params.duration_ms(),
            self.params.dt_ms(),
            num_steps,
            self.integrator.model().name(),
        );

        let progress_every = (num_steps / 10).max(1);
        let mut cancelled = false;

        while self.step < num_steps {
            if self.cancel.as_ref().map_or(false, |t| t.is_cancelled()) {
                log::warn!(
                    "Simulation cancelled at {} after {} of {} steps",
                    self.current_time(),
                    self.step,
                    num_steps
                );
                cancelled = true;
                break;
            }

            let step_start = self.params.perf_enabled.then(Instant::now);
            self.step()?;
            if let Some(start) = step_start {
                self.perf_samples.push(start.elapsed().as_nanos() as u64);
            }

            if self.step % progress_every == 0 {
                let progress = (self.step as f64 / num_steps as f64) * 100.0;
                log::debug!(
                    "Simulation progress: {:.1}% ({} spikes)",
                    progress,
                    self.recorder.total_spikes()
                );
            }
        }

        log::info!(
            "Simulation completed: {} spikes in {} steps",
            self.recorder.total_spikes(),
            self.step
        );

        let perf = if self.perf_samples.is_empty() {
            None
        } else {
            let steps = self.perf_samples.len();
            let sum: u128 = self.perf_samples.iter().map(|v| *v as u128).sum();
            Some(PerfReport {
                avg_step_ns: (sum / steps as u128) as u64,
                max_step_ns: self.perf_samples.iter().copied().max().unwrap_or(0),
                steps,
            })
        };

        Ok(SimulationResult {
            simulated: self.current_time(),
            recorder: self.recorder,
            samples: self.samples,
            final_state: self.state.neurons,
            steps_executed: self.step,
            cancelled,
            perf,
        })
    }
}

/// Run a fixed-step simulation of `topology` with exact integration
pub fn run_fixed_step(
    topology: NetworkTopology,
    params: LIFParams,
    stimulus: Stimulus,
    dt_ns: u64,
    duration_ns: u64,
) -> Result<SimulationResult> {
    let state = SimulationState::new(topology, params, stimulus)?;
    let engine = SimulationEngine::new(state, SimulationParams::new(dt_ns, duration_ns)?)?;
    engine.run()
}
