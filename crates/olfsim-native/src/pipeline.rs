//! Stage orchestration
//!
//! Runs the circuit in three stages plus an optional trim:
//!
//! ```text
//! run_orn_ln_sims ──► run_pn_sims ──► run_kc_sims(regen) ──► remove_all_pretime
//!   (per odor)          (per odor,       (connectivity,
//!                        own noise        tuning, final
//!                        stream)          per-odor run)
//! ```
//!
//! Every stage spreads odors over the rayon pool and returns once all odors
//! are done. Calling a stage before the one it depends on is an error.

use olfsim_core::ModelParams;
use rayon::prelude::*;
use tracing::{info, info_span};

use crate::connectivity::sample_wpnkc;
use crate::error::{SimError, SimResult};
use crate::layers::{pn_noise, sim_kc_layer, sim_ln_layer, sim_orn_layer, sim_pn_layer, KcScratch};
use crate::state::RunVars;
use crate::tuning::{fit_sparseness, TuningReport};

fn check_ready(rv: &RunVars, p: &ModelParams, stage: &'static str) -> SimResult<()> {
    rv.ensure_compatible(p)?;
    if rv.stages().trimmed {
        return Err(SimError::Trimmed { stage });
    }
    Ok(())
}

/// Simulate ORN rates and LN inhibition traces for every odor.
pub fn run_orn_ln_sims(p: &ModelParams, rv: &mut RunVars) -> SimResult<()> {
    check_ready(rv, p, "ORN/LN")?;
    let _span = info_span!("orn_ln", odors = p.n_odors()).entered();
    let data = p.data()?;

    let orn_sims = &mut rv.orn.sims;
    let inh_a = &mut rv.ln.inh_a;
    let inh_b = &mut rv.ln.inh_b;
    orn_sims
        .par_iter_mut()
        .zip(inh_a.par_iter_mut())
        .zip(inh_b.par_iter_mut())
        .enumerate()
        .for_each(|(odor, ((orn, a), b))| {
            *orn = sim_orn_layer(p, data, odor);
            let traces = sim_ln_layer(p, orn);
            *a = traces.inh_a;
            *b = traces.inh_b;
        });

    let stages = rv.stages_mut();
    stages.orn_ln = true;
    stages.pn = false;
    stages.kc = false;
    rv.log.log("ORN/LN simulation done");
    info!("ORN/LN simulation done");
    Ok(())
}

/// Simulate PN rates for every odor.
///
/// Each odor gets its own random stream, assigned in odor order, so the
/// output does not depend on worker scheduling.
pub fn run_pn_sims(p: &ModelParams, rv: &mut RunVars) -> SimResult<()> {
    check_ready(rv, p, "PN")?;
    if !rv.stages().orn_ln {
        return Err(SimError::StageNotReady {
            stage: "PN",
            requires: "ORN/LN",
        });
    }
    let _span = info_span!("pn", odors = p.n_odors()).entered();
    let data = p.data()?;
    let noise = pn_noise(p)?;
    let streams = rv.streams_mut().split(p.n_odors());

    let orn_sims = &rv.orn.sims;
    let inh_a = &rv.ln.inh_a;
    let inh_b = &rv.ln.inh_b;
    rv.pn
        .sims
        .par_iter_mut()
        .zip(streams.into_par_iter())
        .enumerate()
        .for_each(|(odor, (pn, mut rng))| {
            *pn = sim_pn_layer(p, data, &orn_sims[odor], &inh_a[odor], &inh_b[odor], &noise, &mut rng);
        });

    let stages = rv.stages_mut();
    stages.pn = true;
    stages.kc = false;
    rv.log.log("PN simulation done");
    info!("PN simulation done");
    Ok(())
}

/// Run the KC layer for every odor and store responses and spike counts.
///
/// With `regen`, first samples fresh PN → KC connectivity and refits
/// thresholds and APL weights; the returned report describes that fit.
/// Without it, the stored circuit is reused as is and `None` is returned.
pub fn run_kc_sims(p: &ModelParams, rv: &mut RunVars, regen: bool) -> SimResult<Option<TuningReport>> {
    check_ready(rv, p, "KC")?;
    if !rv.stages().pn {
        return Err(SimError::StageNotReady {
            stage: "KC",
            requires: "PN",
        });
    }
    let _span = info_span!("kc", odors = p.n_odors(), regen).entered();

    let report = if regen {
        // A rejected weight row must not consume a stream
        let weights = p.connectivity_weights()?;
        let mut rng = rv.streams_mut().next_stream();
        rv.kc.circuit.w_pnkc = sample_wpnkc(&weights, p.kc.n, p.kc.nclaws, &mut rng)?;
        rv.log.log("KC connectivity regenerated");
        Some(fit_sparseness(p, &rv.pn.sims, &mut rv.kc, &rv.log))
    } else {
        None
    };

    let circuit = &rv.kc.circuit;
    let pn_sims = &rv.pn.sims;
    let counts: Vec<_> = (0..p.n_odors())
        .into_par_iter()
        .map_init(
            || KcScratch::for_params(p),
            |scratch, odor| {
                sim_kc_layer(p, circuit, &pn_sims[odor], scratch);
                scratch.spike_counts()
            },
        )
        .collect();

    for (odor, c) in counts.iter().enumerate() {
        rv.kc.spike_counts.set_column(odor, c);
        rv.kc
            .responses
            .set_column(odor, &c.map(|n| if n > 0.0 { 1.0 } else { 0.0 }));
    }

    rv.stages_mut().kc = true;
    let rate = rv.kc.response_rate();
    rv.log.log(format!("KC simulation done, response rate {rate:.5}"));
    info!(response_rate = rate, tuning_iters = rv.kc.tuning_iters, "KC simulation done");
    Ok(report)
}

/// Run every stage in order with fresh connectivity.
pub fn run_all(p: &ModelParams, rv: &mut RunVars) -> SimResult<Option<TuningReport>> {
    run_orn_ln_sims(p, rv)?;
    run_pn_sims(p, rv)?;
    run_kc_sims(p, rv, true)
}

/// Drop the settling columns (`0..start_step`) from ORN, LN and PN series.
///
/// KC results are per odor and unaffected. Afterwards every series has
/// `steps_all - start_step` columns and no stage can run again on this state.
pub fn remove_all_pretime(p: &ModelParams, rv: &mut RunVars) -> SimResult<()> {
    check_ready(rv, p, "trim")?;
    let start = p.time.start_step();
    let steps = p.time.steps();

    rv.orn
        .sims
        .par_iter_mut()
        .chain(rv.pn.sims.par_iter_mut())
        .for_each(|m| *m = m.columns(start, steps).into_owned());
    rv.ln
        .inh_a
        .par_iter_mut()
        .chain(rv.ln.inh_b.par_iter_mut())
        .for_each(|r| *r = r.columns(start, steps).into_owned());

    rv.stages_mut().trimmed = true;
    rv.log.log(format!("removed {start} settling steps"));
    info!(removed = start, remaining = steps, "trimmed pre-settle time");
    Ok(())
}
