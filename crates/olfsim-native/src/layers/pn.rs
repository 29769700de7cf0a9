//! Projection neuron layer
//!
//! Each PN follows its glomerulus's ORN deviation from spontaneous through a
//! saturating `tanh`, divisively gated by the LN accumulators, with additive
//! Gaussian noise. The spontaneous target is the ORN spontaneous rate scaled
//! by the same divisive form.
//!
//! ```text
//! dPN = -PN + spont_target + 200·tanh((ORN - spont + offset)·tanhsc/200·g) + ε
//! g   = inhsc / (inhadd + 0.25·inhA + 0.75·inhB)
//! PN  = max(0, PN + dPN·dt/taum)
//! ```

use nalgebra::{DMatrix, DVector, RowDVector};
use olfsim_core::math::rectify;
use olfsim_core::{ModelParams, OrnData};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{SimError, SimResult};

/// Saturation amplitude of the PN `tanh` nonlinearity
pub const PN_TANH_AMPLITUDE: f64 = 200.0;
/// Share of the fast LN accumulator in the PN gate
pub const PN_GATE_FAST_SHARE: f64 = 0.25;
/// Share of the slow LN accumulator in the PN gate
pub const PN_GATE_SLOW_SHARE: f64 = 0.75;

/// Noise distribution configured in `pn.noise`.
///
/// Rejects a negative or non-finite standard deviation.
pub fn pn_noise(p: &ModelParams) -> SimResult<Normal<f64>> {
    let sd = p.pn.noise.sd;
    if !(sd.is_finite() && sd >= 0.0) {
        return Err(SimError::Noise {
            reason: format!("standard deviation must be finite and non-negative, got {sd}"),
        });
    }
    Normal::new(p.pn.noise.mean, sd).map_err(|e| SimError::Noise {
        reason: e.to_string(),
    })
}

/// PN spontaneous target, `spont · inhsc / (Σ spont + inhadd)`.
#[must_use]
pub fn spont_target(p: &ModelParams, spont: &DVector<f64>) -> DVector<f64> {
    spont * (p.pn.inhsc / (spont.sum() + p.pn.inhadd))
}

/// Simulate PN rates for one odor, `G × steps_all`.
///
/// Noise is drawn from `rng` in a fixed order (time-major, then glomerulus),
/// so a given stream always yields the same trajectory.
pub fn sim_pn_layer<R: Rng + ?Sized>(
    p: &ModelParams,
    data: &OrnData,
    orn_t: &DMatrix<f64>,
    inh_a: &RowDVector<f64>,
    inh_b: &RowDVector<f64>,
    noise: &Normal<f64>,
    rng: &mut R,
) -> DMatrix<f64> {
    let pn = &p.pn;
    let n = orn_t.ncols();
    let g = orn_t.nrows();
    let spont = data.spont();
    let target = spont_target(p, spont);
    let step = p.time.dt / pn.taum;

    let mut pn_t = DMatrix::from_fn(g, n, |r, _| spont[r]);
    let mut inh_pn = 0.0;

    for t in 1..n {
        for r in 0..g {
            let orn_delta = orn_t[(r, t - 1)] - spont[r];
            let drive = PN_TANH_AMPLITUDE
                * ((orn_delta + pn.offset) * pn.tanhsc / PN_TANH_AMPLITUDE * inh_pn).tanh();
            let d_pn = -pn_t[(r, t - 1)] + target[r] + drive + noise.sample(rng);
            pn_t[(r, t)] = rectify(pn_t[(r, t - 1)] + d_pn * step);
        }
        inh_pn = pn.inhsc
            / (pn.inhadd + PN_GATE_FAST_SHARE * inh_a[t] + PN_GATE_SLOW_SHARE * inh_b[t]);
    }
    pn_t
}

#[cfg(test)]
mod tests {
    use super::*;
    use olfsim_core::TimeGrid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (ModelParams, OrnData) {
        let mut p = ModelParams::default();
        p.time = TimeGrid {
            pre_start: -0.3,
            start: -0.1,
            end: 0.2,
            stim_start: 0.0,
            stim_end: 0.1,
            dt: 0.5e-3,
        };
        let data = OrnData::new(
            DVector::from_vec(vec![8.0, 2.0, 5.0]),
            DMatrix::from_row_slice(3, 1, &[50.0, 0.0, -10.0]),
        )
        .unwrap();
        (p, data)
    }

    #[test]
    fn test_spont_target() {
        let (p, data) = setup();
        let target = spont_target(&p, data.spont());
        let scale = p.pn.inhsc / (15.0 + p.pn.inhadd);
        assert!((target[0] - 8.0 * scale).abs() < 1e-12);
        assert!((target[1] - 2.0 * scale).abs() < 1e-12);
    }

    #[test]
    fn test_first_step_without_gate() {
        // At t = 1 the gate is still 0, so the tanh term vanishes
        let (p, data) = setup();
        let n = p.time.steps_all();
        let orn = DMatrix::from_fn(3, n, |r, _| data.spont()[r]);
        let inh = RowDVector::from_element(n, 50.0);
        let noise = pn_noise(&p).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let pn = sim_pn_layer(&p, &data, &orn, &inh, &inh, &noise, &mut rng);
        let target = spont_target(&p, data.spont());
        let step = p.time.dt / p.pn.taum;
        for r in 0..3 {
            let expected = data.spont()[r] + (-data.spont()[r] + target[r]) * step;
            assert!((pn[(r, 1)] - expected.max(0.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_output_non_negative() {
        let (mut p, data) = setup();
        p.pn.noise.sd = 50.0;
        let n = p.time.steps_all();
        let orn = DMatrix::from_fn(3, n, |r, _| data.spont()[r]);
        let inh = RowDVector::from_element(n, 50.0);
        let noise = pn_noise(&p).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let pn = sim_pn_layer(&p, &data, &orn, &inh, &inh, &noise, &mut rng);
        assert!(pn.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_same_stream_same_trajectory() {
        let (mut p, data) = setup();
        p.pn.noise.sd = 3.0;
        let n = p.time.steps_all();
        let orn = DMatrix::from_fn(3, n, |r, _| data.spont()[r] + 1.0);
        let inh = RowDVector::from_element(n, 20.0);
        let noise = pn_noise(&p).unwrap();

        let a = sim_pn_layer(&p, &data, &orn, &inh, &inh, &noise, &mut ChaCha8Rng::seed_from_u64(9));
        let b = sim_pn_layer(&p, &data, &orn, &inh, &inh, &noise, &mut ChaCha8Rng::seed_from_u64(9));
        let c = sim_pn_layer(&p, &data, &orn, &inh, &inh, &noise, &mut ChaCha8Rng::seed_from_u64(10));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_excited_glomerulus_rises() {
        let (p, data) = setup();
        let n = p.time.steps_all();
        let on = p.time.stim_start_step();
        let orn = DMatrix::from_fn(3, n, |r, t| {
            data.spont()[r] + if t >= on { data.delta()[(r, 0)] } else { 0.0 }
        });
        let inh = RowDVector::from_element(n, 50.0);
        let noise = pn_noise(&p).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let pn = sim_pn_layer(&p, &data, &orn, &inh, &inh, &noise, &mut rng);
        let late = p.time.stim_end_step() - 1;
        assert!(pn[(0, late)] > pn[(0, on - 1)]);
        assert!(pn[(2, late)] < pn[(0, late)]);
    }

    #[test]
    fn test_negative_sd_rejected() {
        let (mut p, _) = setup();
        p.pn.noise.sd = -1.0;
        assert!(matches!(pn_noise(&p), Err(SimError::Noise { .. })));
        p.pn.noise.sd = f64::NAN;
        assert!(matches!(pn_noise(&p), Err(SimError::Noise { .. })));
        p.pn.noise.sd = 0.0;
        assert!(pn_noise(&p).is_ok());
    }
}
