//! Olfactory receptor neuron layer
//!
//! Each glomerulus sits at its spontaneous rate and is pushed by the odor's
//! delta while the stimulus window is open. The resulting step input is
//! EMA-smoothed and fed through a leaky integrator.

use nalgebra::DMatrix;
use olfsim_core::math::{smooth_exp, ORN_SMOOTHING_WINDOW};
use olfsim_core::{ModelParams, OrnData};

/// Simulate ORN rates for one odor, `G × steps_all`.
#[must_use]
pub fn sim_orn_layer(p: &ModelParams, data: &OrnData, odor: usize) -> DMatrix<f64> {
    let n = p.time.steps_all();
    let g = data.n_gloms();
    let spont = data.spont();
    let delta = data.delta().column(odor);
    let stim = p.time.stim_row();

    let mut orn_t = DMatrix::from_fn(g, n, |r, _| spont[r]);
    let mut odor_t = DMatrix::from_fn(g, n, |r, t| spont[r] + delta[r] * stim[t]);
    smooth_exp(&mut odor_t, ORN_SMOOTHING_WINDOW / p.time.dt);

    let mul = p.time.dt / p.orn.taum;
    for t in 1..n {
        for r in 0..g {
            orn_t[(r, t)] = orn_t[(r, t - 1)] * (1.0 - mul) + odor_t[(r, t)] * mul;
        }
    }
    orn_t
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;
    use olfsim_core::TimeGrid;

    fn params(delta: f64) -> (ModelParams, OrnData) {
        let mut p = ModelParams::default();
        p.time = TimeGrid {
            pre_start: -0.2,
            start: -0.1,
            end: 0.3,
            stim_start: 0.0,
            stim_end: 0.2,
            dt: 1e-3,
        };
        let data = OrnData::new(
            DVector::from_vec(vec![10.0, 4.0]),
            DMatrix::from_row_slice(2, 1, &[delta, -delta]),
        )
        .unwrap();
        (p, data)
    }

    #[test]
    fn test_flat_without_stimulus() {
        let (p, data) = params(0.0);
        let orn = sim_orn_layer(&p, &data, 0);
        assert_eq!(orn.shape(), (2, p.time.steps_all()));
        for t in 0..orn.ncols() {
            assert!((orn[(0, t)] - 10.0).abs() < 1e-9);
            assert!((orn[(1, t)] - 4.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_stimulus_drives_toward_spont_plus_delta() {
        let (p, data) = params(5.0);
        let orn = sim_orn_layer(&p, &data, 0);
        let before = p.time.stim_start_step() - 1;
        let late = p.time.stim_end_step() - 1;

        assert!((orn[(0, before)] - 10.0).abs() < 1e-9);
        // 200 ms of a 20 ms EMA plus 10 ms leak: essentially settled
        assert!((orn[(0, late)] - 15.0).abs() < 1e-3);
        assert!((orn[(1, late)] + 1.0).abs() < 1e-3);
        // After offset the rate decays back
        assert!(orn[(0, orn.ncols() - 1)] < 10.5);
    }
}
