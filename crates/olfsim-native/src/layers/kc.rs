//! Kenyon cell layer
//!
//! Leaky integrate-and-fire KCs driven by `w_pnkc · PN`, with global feedback
//! inhibition from a single APL neuron. KC spikes charge the APL synapse
//! current `Is`, which charges the APL potential `inh`, which is subtracted
//! from every KC's drive through `w_aplkc`.
//!
//! ```text
//!            w_pnkc               thr
//!   PN ───────────────► Vm ──────────────► spike ──┐
//!                        ▲                         │ w_kcapl·1e4
//!                        │ -w_aplkc·inh            ▼
//!                       inh ◄──────────────────── Is
//!                          apl_taum          tau_apl2kc
//! ```
//!
//! Integration starts at `start_step`; everything before stays zero.

use nalgebra::{DMatrix, DVector};
use olfsim_core::ModelParams;

use crate::state::KcCircuit;

/// Gain from summed KC spikes to APL synaptic current
pub const KC_TO_APL_GAIN: f64 = 1e4;

/// Per-worker KC output buffers, `N × steps_all` each
///
/// Reused across odors so a worker allocates once.
#[derive(Clone, Debug)]
pub struct KcScratch {
    /// Membrane potential
    pub vm: DMatrix<f64>,
    /// Spike indicator (0 or 1)
    pub spikes: DMatrix<f64>,
}

impl KcScratch {
    /// Zeroed buffers for `n_kc` cells over `steps` columns.
    #[must_use]
    pub fn new(n_kc: usize, steps: usize) -> Self {
        Self {
            vm: DMatrix::zeros(n_kc, steps),
            spikes: DMatrix::zeros(n_kc, steps),
        }
    }

    /// Buffers sized for `p`.
    #[must_use]
    pub fn for_params(p: &ModelParams) -> Self {
        Self::new(p.kc.n, p.time.steps_all())
    }

    fn reset(&mut self, n_kc: usize, steps: usize) {
        if self.vm.shape() == (n_kc, steps) {
            self.vm.fill(0.0);
            self.spikes.fill(0.0);
        } else {
            *self = Self::new(n_kc, steps);
        }
    }

    /// Maximum potential of each cell over the whole run.
    #[must_use]
    pub fn peak_voltages(&self) -> DVector<f64> {
        DVector::from_iterator(self.vm.nrows(), self.vm.row_iter().map(|r| r.max()))
    }

    /// Number of spikes fired by each cell.
    #[must_use]
    pub fn spike_counts(&self) -> DVector<f64> {
        DVector::from_iterator(self.spikes.nrows(), self.spikes.row_iter().map(|r| r.sum()))
    }

    /// 1 for each cell that fired at least once, else 0.
    #[must_use]
    pub fn responded(&self) -> DVector<f64> {
        self.spike_counts()
            .map(|c| if c > 0.0 { 1.0 } else { 0.0 })
    }
}

/// Simulate the KC layer for one odor into `out`.
///
/// `pn_t` must span the full grid (`G × steps_all`). `out` is overwritten.
pub fn sim_kc_layer(p: &ModelParams, kc: &KcCircuit, pn_t: &DMatrix<f64>, out: &mut KcScratch) {
    let n_kc = kc.w_pnkc.nrows();
    let steps = pn_t.ncols();
    out.reset(n_kc, steps);

    let dt = p.time.dt;
    let v_step = dt / p.kc.taum;
    let inh_step = dt / p.kc.apl_taum;
    let is_step = dt / p.kc.tau_apl2kc;

    let mut drive = DVector::zeros(n_kc);
    let mut inh = 0.0;
    let mut syn = 0.0;

    for t in (p.time.start_step() + 1)..steps {
        let fired: f64 = kc
            .w_kcapl
            .iter()
            .zip(out.spikes.column(t - 1).iter())
            .map(|(w, s)| w * s)
            .sum();
        let d_syn = -syn + fired * KC_TO_APL_GAIN;
        let d_inh = -inh + syn;

        drive.gemv(1.0, &kc.w_pnkc, &pn_t.column(t), 0.0);
        for i in 0..n_kc {
            let v_prev = out.vm[(i, t - 1)];
            let mut v = v_prev + (-v_prev + drive[i] - kc.w_aplkc[i] * inh) * v_step;
            if v > kc.thr[i] {
                out.spikes[(i, t)] = 1.0;
                v = 0.0;
            }
            out.vm[(i, t)] = v;
        }

        inh += d_inh * inh_step;
        syn += d_syn * is_step;
    }
}
