//! Lateral neuron layer
//!
//! A single pooled LN integrates the cubed mean ORN rate under its own
//! feedback inhibition. Its rectified response is low-passed by a fast (A)
//! and a slow (B) synaptic accumulator; those two traces are what the PN
//! layer sees.

use nalgebra::{DMatrix, RowDVector};
use olfsim_core::math::rectify;
use olfsim_core::ModelParams;

/// LN potential at t = 0
pub const LN_INITIAL_POTENTIAL: f64 = 300.0;
/// LN response at t = 0
pub const LN_INITIAL_RESPONSE: f64 = 1.0;
/// Accumulator value at t = 0
pub const LN_INITIAL_INHIBITION: f64 = 50.0;

/// Inhibition traces produced for one odor
#[derive(Clone, Debug, PartialEq)]
pub struct LnTraces {
    /// Fast accumulator, `1 × steps_all`
    pub inh_a: RowDVector<f64>,
    /// Slow accumulator, `1 × steps_all`
    pub inh_b: RowDVector<f64>,
}

/// Simulate the LN accumulators driven by `orn_t` (`G × steps_all`).
#[must_use]
pub fn sim_ln_layer(p: &ModelParams, orn_t: &DMatrix<f64>) -> LnTraces {
    let n = orn_t.ncols();
    let dt = p.time.dt;
    let ln = &p.ln;
    let drive_scale = p.orn.n_physical_gloms as f64 / orn_t.nrows() as f64 / 2.0;

    let mut inh_a = RowDVector::from_element(n, LN_INITIAL_INHIBITION);
    let mut inh_b = RowDVector::from_element(n, LN_INITIAL_INHIBITION);
    let mut potential = LN_INITIAL_POTENTIAL;
    let mut response = LN_INITIAL_RESPONSE;
    let mut inh_ln = 0.0;

    for t in 1..n {
        let d_a = -inh_a[t - 1] + response;
        let d_b = -inh_b[t - 1] + response;
        let d_pot = -potential + orn_t.column(t - 1).mean().powi(3) * drive_scale * inh_ln;

        inh_a[t] = inh_a[t - 1] + d_a * dt / ln.tau_ga;
        inh_b[t] = inh_b[t - 1] + d_b * dt / ln.tau_gb;
        inh_ln = ln.inhsc / (ln.inhadd + inh_a[t]);

        potential += d_pot * dt / ln.taum;
        response = rectify(potential - ln.thr);
    }

    LnTraces { inh_a, inh_b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olfsim_core::TimeGrid;

    fn params() -> ModelParams {
        let mut p = ModelParams::default();
        p.time = TimeGrid {
            pre_start: -0.5,
            start: -0.1,
            end: 0.2,
            stim_start: 0.0,
            stim_end: 0.1,
            dt: 0.5e-3,
        };
        p
    }

    #[test]
    fn test_initial_values() {
        let p = params();
        let orn = DMatrix::from_element(3, 10, 5.0);
        let ln = sim_ln_layer(&p, &orn);
        assert_eq!(ln.inh_a.len(), 10);
        assert!((ln.inh_a[0] - LN_INITIAL_INHIBITION).abs() < 1e-12);
        assert!((ln.inh_b[0] - LN_INITIAL_INHIBITION).abs() < 1e-12);
    }

    #[test]
    fn test_first_step_relaxes_toward_initial_response() {
        let p = params();
        let orn = DMatrix::from_element(3, 4, 5.0);
        let ln = sim_ln_layer(&p, &orn);
        let expected_a = 50.0 + (-50.0 + 1.0) * p.time.dt / p.ln.tau_ga;
        let expected_b = 50.0 + (-50.0 + 1.0) * p.time.dt / p.ln.tau_gb;
        assert!((ln.inh_a[1] - expected_a).abs() < 1e-12);
        assert!((ln.inh_b[1] - expected_b).abs() < 1e-12);
    }

    #[test]
    fn test_silent_input_decays_accumulators() {
        let p = params();
        let orn = DMatrix::zeros(3, p.time.steps_all());
        let ln = sim_ln_layer(&p, &orn);
        let last = ln.inh_a.len() - 1;
        // No drive: the LN falls below threshold and both traces decay
        assert!(ln.inh_a[last] < ln.inh_a[0]);
        assert!(ln.inh_b[last] < ln.inh_b[0]);
        assert!(ln.inh_a.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_stronger_input_more_inhibition() {
        let p = params();
        let n = p.time.steps_all();
        let weak = sim_ln_layer(&p, &DMatrix::from_element(3, n, 10.0));
        let strong = sim_ln_layer(&p, &DMatrix::from_element(3, n, 40.0));
        assert!(strong.inh_a[n - 1] >= weak.inh_a[n - 1]);
        assert!(strong.inh_b[n - 1] >= weak.inh_b[n - 1]);
    }
}
