//! KC sparsity tuning
//!
//! Fits KC thresholds and APL weights so the fraction of responding
//! (KC, odor) pairs approaches `kc.sp_target`:
//!
//! 1. Thresholds are placed relative to each cell's spontaneous drive, at
//!    the peak-voltage quantile implied by twice the target sparsity.
//! 2. With APL feedback enabled, both APL weight vectors are shifted by a
//!    decaying learning-rate step until the measured sparsity is within
//!    `sp_acc · sp_target` of the target or the update budget runs out.
//!
//! A configured `kc.fixed_thr` skips both steps: thresholds take the fixed
//! value and the APL weights keep their initial `0` and `1/N`.
//!
//! Each tuning round is three phases. The leader (calling thread) updates
//! the weights, rayon workers simulate one sampled odor each against a shared
//! read-only circuit, and the leader reduces their results after the join.

use nalgebra::{DMatrix, DVector};
use olfsim_core::math::window_row_mean;
use olfsim_core::ModelParams;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::layers::{sim_kc_layer, KcScratch};
use crate::log::RunLogger;
use crate::state::{KcCircuit, KcVars};

/// Threshold that silences every KC while peak voltages are measured
pub const SILENT_THRESHOLD: f64 = 1e5;

/// Sparsity assumed before the first tuning round
pub const INITIAL_SPARSITY_ESTIMATE: f64 = 0.0789;

/// Outcome of one [`fit_sparseness`] call
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TuningReport {
    /// Weight updates performed (0 with APL disabled or a fixed threshold)
    pub iterations: usize,
    /// Last measured sparsity over the sampled odors, if tuning ran
    pub sparsity: Option<f64>,
    /// Whether the last measurement was within tolerance
    pub converged: bool,
}

/// Mean PN rate per glomerulus over the pre-stimulus window of `pn_t`.
#[must_use]
pub fn sample_pn_spont(p: &ModelParams, pn_t: &DMatrix<f64>) -> DVector<f64> {
    let (from, to) = p.time.spont_window();
    window_row_mean(pn_t, from, to)
}

/// Pick thresholds from peak voltages above spontaneous drive.
///
/// `peaks` is `N × tuning odors` and already has `2 · spont_in` subtracted.
/// The population-wide policy ranks all entries together; the homeostatic
/// policy ranks each cell's row on its own. Either way the chosen value sits
/// at rank `⌊2 · sp_target · count⌋` in descending order (clamped to the
/// last rank) and `2 · spont_in` is added back.
#[must_use]
pub fn choose_kc_thresh(p: &ModelParams, peaks: &DMatrix<f64>, spont_in: &DVector<f64>) -> DVector<f64> {
    let rank = |count: usize| -> usize {
        let r = (2.0 * p.kc.sp_target * count as f64).floor().max(0.0) as usize;
        r.min(count.saturating_sub(1))
    };
    let descending = |mut v: Vec<f64>| -> Vec<f64> {
        v.sort_by(|a, b| b.total_cmp(a));
        v
    };

    if p.kc.use_homeostatic_thrs {
        DVector::from_iterator(
            peaks.nrows(),
            peaks.row_iter().enumerate().map(|(i, row)| {
                let sorted = descending(row.iter().copied().collect());
                sorted.get(rank(sorted.len())).copied().unwrap_or(0.0) + 2.0 * spont_in[i]
            }),
        )
    } else {
        let sorted = descending(peaks.iter().copied().collect());
        let shared = sorted.get(rank(sorted.len())).copied().unwrap_or(0.0);
        spont_in.map(|s| shared + 2.0 * s)
    }
}

/// Shift both APL weight vectors by one tuning step.
///
/// Adds `delta` to every `w_aplkc` entry and `delta / N` to every `w_kcapl`
/// entry. Clamping at 0 happens only when the aggregate step is negative.
pub fn apply_apl_step(circuit: &mut KcCircuit, delta: f64) {
    let n_kc = circuit.w_kcapl.len() as f64;
    circuit.w_aplkc.add_scalar_mut(delta);
    circuit.w_kcapl.add_scalar_mut(delta / n_kc);
    if delta < 0.0 {
        circuit.clamp_apl_weights();
    }
}

/// Report for a fit that performed no weight updates
fn untuned() -> TuningReport {
    TuningReport {
        iterations: 0,
        sparsity: None,
        converged: false,
    }
}

/// Run the KC layer for each odor in `odors` and map the result per worker.
fn sim_odors<T, F>(p: &ModelParams, circuit: &KcCircuit, pn_sims: &[DMatrix<f64>], odors: &[usize], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&KcScratch) -> T + Sync,
{
    odors
        .par_iter()
        .map_init(
            || KcScratch::for_params(p),
            |scratch, &odor| {
                sim_kc_layer(p, circuit, &pn_sims[odor], scratch);
                f(scratch)
            },
        )
        .collect()
}

/// Fit thresholds and APL weights of `kc.circuit` to `p.kc.sp_target`.
///
/// Uses the PN series in `pn_sims` (full grid) and the connectivity already
/// stored in `kc.circuit.w_pnkc`. Stores the update count in
/// `kc.tuning_iters`.
pub fn fit_sparseness(
    p: &ModelParams,
    pn_sims: &[DMatrix<f64>],
    kc: &mut KcVars,
    log: &RunLogger,
) -> TuningReport {
    let n_kc = p.kc.n as f64;
    let target = p.kc.sp_target;
    let odors = p.tune_odors();

    kc.circuit.w_aplkc.fill(0.0);
    kc.circuit.w_kcapl.fill(1.0 / n_kc);

    if let Some(thr) = p.kc.fixed_thr {
        kc.circuit.thr.fill(thr);
        debug!(thr, "using fixed KC threshold");
        log.log(format!("FIXED threshold: {thr}"));
        log.blank();
        kc.tuning_iters = 0;
        return untuned();
    }

    let circuit = &mut kc.circuit;
    circuit.thr.fill(SILENT_THRESHOLD);
    let spont_in = &circuit.w_pnkc * sample_pn_spont(p, &pn_sims[0]);
    let spont_drive = &spont_in * 2.0;
    let cols = sim_odors(p, circuit, pn_sims, &odors, |s| s.peak_voltages() - &spont_drive);
    let peaks = DMatrix::from_columns(&cols);
    circuit.thr = choose_kc_thresh(p, &peaks, &spont_in);
    let policy = if p.kc.use_homeostatic_thrs { "homeostatic" } else { "population" };
    debug!(policy, mean_thr = circuit.thr.mean(), "chose KC thresholds");
    log.log(format!("{policy} thresholds chosen, mean {:.4}", circuit.thr.mean()));

    if !p.kc.enable_apl {
        kc.tuning_iters = 0;
        return untuned();
    }

    let w0 = 2.0 * (-target.ln()).ceil();
    circuit.w_aplkc.fill(w0);
    circuit.w_kcapl.fill(w0 / n_kc);

    let sampled: Vec<usize> = odors.iter().step_by(3).copied().collect();
    let tolerance = p.kc.sp_acc * target;
    let mut sp = INITIAL_SPARSITY_ESTIMATE;
    let mut count: usize = 1;

    log.log(format!("sparsity tuning: target {target}, tolerance {tolerance}, {} sampled odors", sampled.len()));

    loop {
        // Leader: weight update
        let lr = p.kc.sp_lr_coeff / (count as f64).sqrt();
        let delta = (sp - target) * lr / target;
        apply_apl_step(circuit, delta);
        count += 1;

        // Workers: one sampled odor each against the frozen circuit
        let responded = sim_odors(p, circuit, pn_sims, &sampled, KcScratch::responded);

        // Leader: reduce
        let total: f64 = responded.iter().map(|r| r.sum()).sum();
        sp = total / (responded.len() as f64 * n_kc);

        debug!(iteration = count - 1, sparsity = sp, delta, "tuning round");
        log.log(format!("  [{}] sp = {sp:.5}, delta = {delta:.5}", count - 1));

        if (sp - target).abs() <= tolerance || count > p.kc.max_iters {
            break;
        }
    }

    let iterations = count - 1;
    let converged = (sp - target).abs() <= tolerance;
    kc.tuning_iters = iterations;

    if converged {
        info!(iterations, sparsity = sp, "sparsity tuning converged");
    } else {
        warn!(iterations, sparsity = sp, target, "sparsity tuning hit iteration limit");
    }
    log.log(format!("tuning done after {iterations} updates, sp = {sp:.5}"));
    log.blank();

    TuningReport {
        iterations,
        sparsity: Some(sp),
        converged,
    }
}
