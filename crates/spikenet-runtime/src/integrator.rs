//! Per-step state update
//!
//! The LIF system is linear, so one step of length `dt` is an affine map of
//! `(v, i_syn)` whose coefficients depend only on `dt` and the time
//! constants. They are computed once at setup and stepping is pure
//! multiply-add.
//!
//! ```text
//! i' = P_ii * i
//! v' = v_rest + P_vv * (v - v_rest) + P_vi * i
//!
//! P_ii = exp(-dt/tau_syn)
//! P_vv = exp(-dt/tau)
//! P_vi = tau_syn / (tau_syn - tau) * (P_ii - P_vv)
//!      = P_vv * (dt/tau) * expm1(x) / x,   x = dt * (tau_syn - tau) / (tau * tau_syn)
//! ```
//!
//! The second form of `P_vi` stays accurate as `tau_syn` approaches `tau`
//! and reduces to `P_vv * dt/tau` when they are equal. It is only used near
//! that limit; for large `dt` the first form avoids `0 * inf`.

use crate::{error::*, neuron::{LIFParams, NeuronState}};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Below this many neurons the parallel path is not worth the fork/join
#[cfg(feature = "parallel")]
const PARALLEL_MIN_LEN: usize = 4096;

/// A neuron model that can advance one neuron's state by a fixed step
pub trait IntegrableModel: Send + Sync + std::fmt::Debug {
    /// Advance `(v, i_syn)` by one step in place
    fn step(&self, v: &mut f64, i_syn: &mut f64);

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// Largest `|x|` for which `P_vi` is computed through [`phi`]
const PHI_MAX_ARG: f64 = 1e-3;

/// `expm1(x) / x`, continuous at zero
fn phi(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        x.exp_m1() / x
    }
}

/// Exact propagator solution of the coupled LIF system
#[derive(Debug, Clone, PartialEq)]
pub struct ExactLif {
    v_rest: f64,
    p_vv: f64,
    p_vi: f64,
    p_ii: f64,
}

impl ExactLif {
    /// Precompute propagators for step `dt_ms`
    pub fn new(params: &LIFParams, dt_ms: f64) -> Result<Self> {
        params.validate()?;
        require_positive("dt", dt_ms)?;

        let p_vv = (-dt_ms / params.tau).exp();
        let p_ii = (-dt_ms / params.tau_syn).exp();
        let x = dt_ms * (params.tau_syn - params.tau) / (params.tau * params.tau_syn);
        // expm1(x) overflows for large x while p_vv underflows, so only the
        // near-equal time constants case goes through phi
        let p_vi = if x.abs() < PHI_MAX_ARG {
            p_vv * (dt_ms / params.tau) * phi(x)
        } else {
            params.tau_syn / (params.tau_syn - params.tau) * (p_ii - p_vv)
        };

        Ok(Self {
            v_rest: params.v_rest,
            p_vv,
            p_vi,
            p_ii,
        })
    }

    /// Synaptic current decay factor per step
    pub fn current_decay(&self) -> f64 {
        self.p_ii
    }

    /// Membrane decay factor per step
    pub fn membrane_decay(&self) -> f64 {
        self.p_vv
    }

    /// Contribution of the step-start synaptic current to the membrane
    pub fn current_coupling(&self) -> f64 {
        self.p_vi
    }
}

impl IntegrableModel for ExactLif {
    #[inline]
    fn step(&self, v: &mut f64, i_syn: &mut f64) {
        let i = *i_syn;
        *v = self.v_rest + self.p_vv * (*v - self.v_rest) + self.p_vi * i;
        *i_syn = self.p_ii * i;
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

/// Exponential-Euler variant
///
/// Decays the synaptic current first, then advances `v` analytically holding
/// the decayed current constant over the step. First-order accurate in the
/// coupling term; converges to [`ExactLif`] as `dt` shrinks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialEulerLif {
    v_rest: f64,
    p_vv: f64,
    p_ii: f64,
}

impl ExponentialEulerLif {
    /// Precompute decay factors for step `dt_ms`
    pub fn new(params: &LIFParams, dt_ms: f64) -> Result<Self> {
        params.validate()?;
        require_positive("dt", dt_ms)?;
        Ok(Self {
            v_rest: params.v_rest,
            p_vv: (-dt_ms / params.tau).exp(),
            p_ii: (-dt_ms / params.tau_syn).exp(),
        })
    }
}

impl IntegrableModel for ExponentialEulerLif {
    #[inline]
    fn step(&self, v: &mut f64, i_syn: &mut f64) {
        let i = self.p_ii * *i_syn;
        let v_inf = self.v_rest + i;
        *v = v_inf + (*v - v_inf) * self.p_vv;
        *i_syn = i;
    }

    fn name(&self) -> &'static str {
        "exponential-euler"
    }
}

/// Integration scheme selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Scheme {
    /// Exact propagators
    #[default]
    Exact,
    /// Exponential Euler with the decayed current held over the step
    ExponentialEuler,
}

impl Scheme {
    /// Build the model for this scheme
    pub fn model(self, params: &LIFParams, dt_ms: f64) -> Result<Box<dyn IntegrableModel>> {
        let model: Box<dyn IntegrableModel> = match self {
            Scheme::Exact => Box::new(ExactLif::new(params, dt_ms)?),
            Scheme::ExponentialEuler => Box::new(ExponentialEulerLif::new(params, dt_ms)?),
        };
        Ok(model)
    }
}

impl std::str::FromStr for Scheme {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" => Ok(Scheme::Exact),
            "exponential-euler" | "exponential_euler" => Ok(Scheme::ExponentialEuler),
            other => Err(RuntimeError::invalid_parameter(
                "scheme",
                other,
                "one of: exact, exponential-euler",
            )),
        }
    }
}

/// Advances every neuron by one step
#[derive(Debug)]
pub struct Integrator {
    model: Box<dyn IntegrableModel>,
}

impl Integrator {
    /// Wrap a prepared model
    pub fn new(model: Box<dyn IntegrableModel>) -> Self {
        Self { model }
    }

    /// Integrator for a scheme, parameters and step
    pub fn for_scheme(scheme: Scheme, params: &LIFParams, dt_ms: f64) -> Result<Self> {
        Ok(Self::new(scheme.model(params, dt_ms)?))
    }

    /// The model in use
    pub fn model(&self) -> &dyn IntegrableModel {
        self.model.as_ref()
    }

    /// Overwrite `v` and `i_syn` of every neuron with their values one step later
    ///
    /// Neurons are independent within a step, so the parallel path produces
    /// the same bits as the sequential one.
    pub fn step(&self, state: &mut NeuronState) {
        let model = self.model.as_ref();

        #[cfg(feature = "parallel")]
        {
            if state.len() >= PARALLEL_MIN_LEN {
                state
                    .v
                    .par_iter_mut()
                    .zip(state.i_syn.par_iter_mut())
                    .with_min_len(PARALLEL_MIN_LEN / 4)
                    .for_each(|(v, i)| model.step(v, i));
                return;
            }
        }

        for (v, i) in state.v.iter_mut().zip(state.i_syn.iter_mut()) {
            model.step(v, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NeuronId;

    const DT: f64 = 0.1;

    /// Closed-form solution after `t` ms from `(v0, i0)`, tau != tau_syn
    fn analytic(p: &LIFParams, v0: f64, i0: f64, t: f64) -> (f64, f64) {
        let i = i0 * (-t / p.tau_syn).exp();
        let u = (v0 - p.v_rest) * (-t / p.tau).exp()
            + i0 * p.tau_syn / (p.tau_syn - p.tau) * ((-t / p.tau_syn).exp() - (-t / p.tau).exp());
        (p.v_rest + u, i)
    }

    #[test]
    fn test_current_decay_is_exact() {
        let params = LIFParams::default();
        let model = ExactLif::new(&params, DT).unwrap();
        let (mut v, mut i) = (params.v_rest, 2.5);
        model.step(&mut v, &mut i);
        assert_eq!(i, 2.5 * (-DT / params.tau_syn).exp());
    }

    #[test]
    fn test_matches_analytic_solution() {
        let params = LIFParams::default();
        let model = ExactLif::new(&params, DT).unwrap();
        let (mut v, mut i) = (-60.0, 7.0);
        for _ in 0..500 {
            model.step(&mut v, &mut i);
        }
        let (v_ref, i_ref) = analytic(&params, -60.0, 7.0, 500.0 * DT);
        assert!(((v - v_ref) / v_ref).abs() < 1e-9, "v={} ref={}", v, v_ref);
        assert!(((i - i_ref) / i_ref).abs() < 1e-9, "i={} ref={}", i, i_ref);
    }

    #[test]
    fn test_equal_time_constants_limit() {
        let equal = LIFParams { tau: 5.0, tau_syn: 5.0, ..LIFParams::default() };
        let near = LIFParams { tau: 5.0, tau_syn: 5.0 + 1e-9, ..LIFParams::default() };
        let a = ExactLif::new(&equal, DT).unwrap();
        let b = ExactLif::new(&near, DT).unwrap();
        assert!(a.current_coupling().is_finite());
        assert!((a.current_coupling() - b.current_coupling()).abs() < 1e-9);
        assert!((a.current_coupling() - (DT / 5.0) * (-DT / 5.0f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_coarse_step_with_slow_synapse() {
        let params = LIFParams { tau: 1.0, tau_syn: 5.0, ..LIFParams::default() };
        let dt: f64 = 1000.0;
        let model = ExactLif::new(&params, dt).unwrap();

        let two_exp = 5.0 / 4.0 * ((-dt / 5.0).exp() - (-dt / 1.0f64).exp());
        assert!(model.current_coupling().is_finite());
        assert!(model.current_coupling() > 0.0);
        assert_eq!(model.current_coupling(), two_exp);

        let (mut v, mut i) = (params.v_rest, 0.0);
        model.step(&mut v, &mut i);
        assert_eq!(v, params.v_rest);
        assert_eq!(i, 0.0);
    }

    #[test]
    fn test_coupling_forms_agree_across_switch() {
        let params = LIFParams::default();
        // x = dt * (tau_syn - tau) / (tau * tau_syn) = -dt / 10 here
        for dt in [0.005, 0.0099, 0.0101, 0.02, 0.1, 1.0] {
            let model = ExactLif::new(&params, dt).unwrap();
            let two_exp = 5.0 / (5.0 - 10.0) * ((-dt / 5.0f64).exp() - (-dt / 10.0f64).exp());
            let rel = (model.current_coupling() - two_exp).abs() / two_exp;
            assert!(rel < 1e-9, "dt={} coupling={} two_exp={}", dt, model.current_coupling(), two_exp);
        }
    }

    #[test]
    fn test_resting_state_is_fixed_point() {
        let params = LIFParams::default();
        for scheme in [Scheme::Exact, Scheme::ExponentialEuler] {
            let model = scheme.model(&params, DT).unwrap();
            let (mut v, mut i) = (params.v_rest, 0.0);
            model.step(&mut v, &mut i);
            assert_eq!(v, params.v_rest);
            assert_eq!(i, 0.0);
        }
    }

    #[test]
    fn test_exponential_euler_converges_to_exact() {
        let params = LIFParams::default();
        let error_at = |dt: f64| {
            let exact = ExactLif::new(&params, dt).unwrap();
            let euler = ExponentialEulerLif::new(&params, dt).unwrap();
            let (mut ve, mut ie) = (params.v_rest, 10.0);
            let (mut vx, mut ix) = (params.v_rest, 10.0);
            let steps = (5.0 / dt).round() as usize;
            for _ in 0..steps {
                exact.step(&mut ve, &mut ie);
                euler.step(&mut vx, &mut ix);
            }
            assert_eq!(ie, ix);
            (ve - vx).abs()
        };
        let coarse = error_at(0.1);
        let fine = error_at(0.01);
        assert!(coarse > 0.0);
        assert!(fine < coarse / 5.0, "coarse={} fine={}", coarse, fine);
    }

    #[test]
    fn test_invalid_setup() {
        let params = LIFParams::default();
        assert!(ExactLif::new(&params, 0.0).is_err());
        assert!(ExponentialEulerLif::new(&params, -0.1).is_err());

        let bad = LIFParams { tau_syn: -5.0, ..LIFParams::default() };
        assert!(matches!(
            ExactLif::new(&bad, DT),
            Err(RuntimeError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("exact".parse::<Scheme>().unwrap(), Scheme::Exact);
        assert_eq!("exponential-euler".parse::<Scheme>().unwrap(), Scheme::ExponentialEuler);
        assert!("euler".parse::<Scheme>().is_err());
    }

    #[test]
    fn test_integrator_updates_all_neurons() {
        let params = LIFParams::default();
        let integrator = Integrator::for_scheme(Scheme::Exact, &params, DT).unwrap();
        let mut state = NeuronState::new(3, &params);
        state.set(NeuronId::new(1), -55.0, 4.0);
        integrator.step(&mut state);

        assert_eq!(state.v(NeuronId::new(0)), params.v_rest);
        assert!(state.v(NeuronId::new(1)) < -55.0);
        assert!(state.i_syn(NeuronId::new(1)) < 4.0);
        assert_eq!(integrator.model().name(), "exact");
    }

    #[test]
    fn test_large_network_matches_per_neuron_update() {
        let params = LIFParams::default();
        let integrator = Integrator::for_scheme(Scheme::Exact, &params, DT).unwrap();
        let model = ExactLif::new(&params, DT).unwrap();

        let n = 10_000;
        let mut state = NeuronState::new(n, &params);
        for k in 0..n {
            state.set(NeuronId::new(k as u32), -65.0 + (k % 13) as f64, (k % 7) as f64);
        }
        let mut expected = state.clone();
        for (v, i) in expected.v.iter_mut().zip(expected.i_syn.iter_mut()) {
            model.step(v, i);
        }

        integrator.step(&mut state);
        assert_eq!(state, expected);
    }
}
