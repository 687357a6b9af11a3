//! End-to-end behaviour of small networks

use spikenet_runtime::{
    run_fixed_step, ConnectionRow, LIFParams, NetworkTopology, NeuronId, NeuronTable, RuntimeError,
    SimulationEngine, SimulationParams, SimulationState, Stimulus, Time, TopologyBuilder,
    NANOS_PER_MILLI,
};

const DT_NS: u64 = 100_000;

fn engine(state: SimulationState, duration_ms: u64, probe: Vec<NeuronId>) -> SimulationEngine {
    let params = SimulationParams::new(DT_NS, duration_ms * NANOS_PER_MILLI)
        .unwrap()
        .with_state_recording(probe);
    SimulationEngine::new(state, params).unwrap()
}

#[test]
fn single_weak_pulse_never_fires() {
    let state = SimulationState::new(
        NetworkTopology::unconnected(1),
        LIFParams::default(),
        Stimulus::new(2.5, 5),
    )
    .unwrap();

    let result = engine(state, 500, vec![NeuronId::new(0)]).run().unwrap();

    assert_eq!(result.steps_executed, 5000);
    assert_eq!(result.total_spikes(), 0);

    // Peak depolarisation of a 2.5mV pulse with tau=10ms, tau_syn=5ms is 0.625mV
    let peak = result
        .samples
        .iter()
        .map(|s| s.v)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(peak > -65.0 && peak < -64.3, "peak={}", peak);

    let last = result.samples.last().unwrap();
    assert!((last.v + 65.0).abs() < 1e-6);
    assert!(last.i_syn.abs() < 1e-30);
}

#[test]
fn chain_fires_downstream_after_upstream() {
    let a = NeuronId::new(0);
    let b = NeuronId::new(1);
    let topology = TopologyBuilder::new().neurons(2).add_synapse(0, 1, 100.0).build().unwrap();
    let state = SimulationState::new(topology, LIFParams::default(), Stimulus::new(100.0, 1)).unwrap();

    let result = engine(state, 50, vec![b]).run().unwrap();

    let a_first = result.recorder.spike_times(a)[0];
    let b_first = result.recorder.spike_times(b)[0];
    assert!(b_first > a_first, "A at {}, B at {}", a_first, b_first);
    assert!(b_first.nanos() >= a_first.nanos() + DT_NS);

    // In A's spike step B only sees the current jump, its potential is untouched
    let b_at_a = result
        .samples
        .iter()
        .find(|s| s.time == a_first)
        .unwrap();
    assert_eq!(b_at_a.i_syn, 100.0);
    assert_eq!(b_at_a.v, -65.0);

    // The step before, B had no input at all
    let before = result
        .samples
        .iter()
        .find(|s| s.time.nanos() + DT_NS == a_first.nanos())
        .unwrap();
    assert_eq!(before.i_syn, 0.0);
}

#[test]
fn spike_is_recorded_once_and_resets_exactly() {
    let params = LIFParams::default();
    let state = SimulationState::new(NetworkTopology::unconnected(1), params.clone(), Stimulus::new(200.0, 1))
        .unwrap();
    let mut engine = engine(state, 20, Vec::new());

    let mut fired_steps = 0;
    for _ in 0..200 {
        let time = engine.current_time();
        let fired = engine.step().unwrap();
        let events_now = engine.recorder().events().iter().filter(|s| s.time == time).count();
        assert_eq!(fired, events_now);
        if fired > 0 {
            fired_steps += 1;
            assert_eq!(engine.state().neurons.v(NeuronId::new(0)), params.v_reset);
        }
        assert!(engine.state().neurons.v(NeuronId::new(0)) <= params.v_thresh);
    }
    assert!(fired_steps >= 1);
    assert_eq!(engine.recorder().total_spikes(), fired_steps as u64);
}

#[test]
fn unconnected_network_relaxes_to_rest() {
    let topology = NetworkTopology::unconnected(4);
    let state = SimulationState::new(topology, LIFParams::default(), Stimulus::new(10.0, 2)).unwrap();
    let result = engine(state, 1000, Vec::new()).run().unwrap();

    for (&v, &i) in result
        .final_state
        .potentials()
        .iter()
        .zip(result.final_state.currents())
    {
        assert!((v + 65.0).abs() < 1e-9, "v={}", v);
        assert!(i.abs() < 1e-9, "i={}", i);
    }
}

#[test]
fn table_rows_map_to_independent_synapses() {
    let table = NeuronTable::from_names(["A", "B", "C"]).unwrap();
    let rows = vec![
        ConnectionRow::new("A", "B", 1.0),
        ConnectionRow::new("B", "C", 2.0),
        ConnectionRow::new("C", "A", 3.0),
        ConnectionRow::new("A", "C", 4.0),
    ];
    let state =
        SimulationState::from_tables(&table, &rows, 1.0, LIFParams::default(), Stimulus::none()).unwrap();
    assert_eq!(state.topology.synapse_count(), rows.len());

    // Duplicated pairs double the delivered current
    let doubled = vec![ConnectionRow::new("A", "B", 30.0), ConnectionRow::new("A", "B", 30.0)];
    let state = SimulationState::from_tables(
        &table,
        &doubled,
        1.0,
        LIFParams::default(),
        Stimulus::new(100.0, 1),
    )
    .unwrap();
    let b = NeuronId::new(1);
    let result = engine(state, 10, vec![b]).run().unwrap();
    let a_first = result.recorder.spike_times(NeuronId::new(0))[0];
    let jump = result.samples.iter().find(|s| s.time == a_first).unwrap();
    assert_eq!(jump.i_syn, 60.0);
}

#[test]
fn identical_runs_produce_identical_spikes() {
    let build = || {
        let n = 6000;
        let mut builder = TopologyBuilder::new().neurons(n);
        for k in 0..n as u32 {
            builder = builder
                .add_synapse(k, (k * 7 + 3) % n as u32, 9.0)
                .add_synapse(k, (k * 13 + 1) % n as u32, 8.5);
        }
        builder.build().unwrap()
    };

    let run = || {
        run_fixed_step(build(), LIFParams::default(), Stimulus::new(120.0, 50), DT_NS, 100 * NANOS_PER_MILLI)
            .unwrap()
    };
    let first = run();
    let second = run();

    assert!(first.total_spikes() > 50);
    assert_eq!(first.recorder.export(), second.recorder.export());
    assert_eq!(first.recorder.counts(), second.recorder.counts());
    assert_eq!(first.final_state, second.final_state);
}

#[test]
fn events_are_chronological() {
    let topology = TopologyBuilder::new().neurons(5).fully_connected(12.0).build().unwrap();
    let result = run_fixed_step(topology, LIFParams::default(), Stimulus::new(150.0, 2), DT_NS, 200 * NANOS_PER_MILLI)
        .unwrap();

    let events = result.recorder.events();
    assert!(!events.is_empty());
    assert!(events.windows(2).all(|w| (w[0].time, w[0].neuron_id) < (w[1].time, w[1].neuron_id)));
    assert!(events.iter().all(|s| s.time < Time::from_millis(200)));
    assert_eq!(result.recorder.counts().iter().sum::<u64>(), result.total_spikes());
}

#[test]
fn overflowing_injection_on_last_step_fails_the_run() {
    let topology = TopologyBuilder::new()
        .neurons(2)
        .add_synapse(0, 1, 1e308)
        .add_synapse(0, 1, 1e308)
        .build()
        .unwrap();
    let result = run_fixed_step(topology, LIFParams::default(), Stimulus::new(5000.0, 1), DT_NS, DT_NS);
    assert!(matches!(
        result,
        Err(RuntimeError::NumericalInstability { neuron: 1, time_ns: 0, variable: "i_syn", .. })
    ));
}

#[test]
fn coarse_step_with_slow_synapse_stays_at_rest() {
    let params = LIFParams { tau: 1.0, tau_syn: 5.0, ..LIFParams::default() };
    let result = run_fixed_step(
        NetworkTopology::unconnected(1),
        params,
        Stimulus::none(),
        1000 * NANOS_PER_MILLI,
        3000 * NANOS_PER_MILLI,
    )
    .unwrap();

    assert_eq!(result.steps_executed, 3);
    assert_eq!(result.total_spikes(), 0);
    assert_eq!(result.final_state.potentials(), &[-65.0]);
}
