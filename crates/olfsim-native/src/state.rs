//! Run state
//!
//! [`RunVars`] owns every buffer a run produces, sized from the parameters at
//! construction. Stages fill it in order; per-odor slots are written by
//! exactly one worker each.

use nalgebra::{DMatrix, DVector, RowDVector};
use olfsim_core::ModelParams;
use serde::Serialize;
use tracing::info;

use crate::error::{SimError, SimResult};
use crate::log::RunLogger;
use crate::rng::StreamSource;

// ============================================================================
// Per-Layer State
// ============================================================================

/// ORN output
#[derive(Clone, Debug, Default)]
pub struct OrnVars {
    /// Rates per odor, `G × steps_all` (or `G × steps` after trimming)
    pub sims: Vec<DMatrix<f64>>,
}

/// LN output
#[derive(Clone, Debug, Default)]
pub struct LnVars {
    /// Fast inhibition trace per odor
    pub inh_a: Vec<RowDVector<f64>>,
    /// Slow inhibition trace per odor
    pub inh_b: Vec<RowDVector<f64>>,
}

/// PN output
#[derive(Clone, Debug, Default)]
pub struct PnVars {
    /// Rates per odor, `G × steps_all` (or `G × steps` after trimming)
    pub sims: Vec<DMatrix<f64>>,
}

/// Weights and thresholds the KC integrator reads
#[derive(Clone, Debug, PartialEq)]
pub struct KcCircuit {
    /// PN → KC claw counts, `N × G`
    pub w_pnkc: DMatrix<f64>,
    /// APL → KC weights, `N × 1`
    pub w_aplkc: DVector<f64>,
    /// KC → APL weights, `1 × N`
    pub w_kcapl: RowDVector<f64>,
    /// Spike thresholds, `N × 1`
    pub thr: DVector<f64>,
}

impl KcCircuit {
    /// All-zero circuit for `n_kc` cells and `n_gloms` glomeruli.
    #[must_use]
    pub fn zeros(n_kc: usize, n_gloms: usize) -> Self {
        Self {
            w_pnkc: DMatrix::zeros(n_kc, n_gloms),
            w_aplkc: DVector::zeros(n_kc),
            w_kcapl: RowDVector::zeros(n_kc),
            thr: DVector::zeros(n_kc),
        }
    }

    /// Clamp both APL weight vectors to be non-negative.
    pub fn clamp_apl_weights(&mut self) {
        self.w_aplkc.apply(|w| *w = w.max(0.0));
        self.w_kcapl.apply(|w| *w = w.max(0.0));
    }
}

/// KC circuit and results
#[derive(Clone, Debug)]
pub struct KcVars {
    /// Connectivity, APL weights and thresholds
    pub circuit: KcCircuit,
    /// 1 where a KC spiked at least once for an odor, `N × odors`
    pub responses: DMatrix<f64>,
    /// Spike count per KC and odor, `N × odors`
    pub spike_counts: DMatrix<f64>,
    /// Weight updates made by the last tuning run
    pub tuning_iters: usize,
}

impl KcVars {
    /// Zeroed state for `n_kc` cells, `n_gloms` glomeruli and `n_odors` odors.
    #[must_use]
    pub fn new(n_kc: usize, n_gloms: usize, n_odors: usize) -> Self {
        Self {
            circuit: KcCircuit::zeros(n_kc, n_gloms),
            responses: DMatrix::zeros(n_kc, n_odors),
            spike_counts: DMatrix::zeros(n_kc, n_odors),
            tuning_iters: 0,
        }
    }

    /// Fraction of (KC, odor) pairs that responded.
    #[must_use]
    pub fn response_rate(&self) -> f64 {
        if self.responses.is_empty() {
            0.0
        } else {
            self.responses.mean()
        }
    }
}

// ============================================================================
// Run Shape and Stages
// ============================================================================

/// Dimensions a run was allocated for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RunShape {
    /// Glomeruli
    pub n_gloms: usize,
    /// Odors
    pub n_odors: usize,
    /// Kenyon cells
    pub n_kc: usize,
    /// Time steps including settling
    pub steps_all: usize,
}

impl RunShape {
    /// Shape implied by `p`.
    #[must_use]
    pub fn of(p: &ModelParams) -> Self {
        Self {
            n_gloms: p.n_gloms(),
            n_odors: p.n_odors(),
            n_kc: p.kc.n,
            steps_all: p.time.steps_all(),
        }
    }
}

impl std::fmt::Display for RunShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} glomeruli, {} odors, {} KCs, {} steps",
            self.n_gloms, self.n_odors, self.n_kc, self.steps_all
        )
    }
}

/// Stages completed so far
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stages {
    /// ORN and LN series are filled
    pub orn_ln: bool,
    /// PN series are filled
    pub pn: bool,
    /// KC results are filled
    pub kc: bool,
    /// Pre-settle columns were removed
    pub trimmed: bool,
}

// ============================================================================
// Run Variables
// ============================================================================

/// Everything one run computes
///
/// Not `Clone`: the run log is tied to a single destination.
#[derive(Debug)]
pub struct RunVars {
    /// ORN output
    pub orn: OrnVars,
    /// LN output
    pub ln: LnVars,
    /// PN output
    pub pn: PnVars,
    /// KC circuit and results
    pub kc: KcVars,
    /// Run log
    pub log: RunLogger,
    shape: RunShape,
    streams: StreamSource,
    stages: Stages,
}

impl RunVars {
    /// Validate `p` and allocate every buffer.
    ///
    /// Draws a seed from entropy when `p.seed` is unset; read it back with
    /// [`RunVars::seed`].
    pub fn new(p: &ModelParams) -> SimResult<Self> {
        p.validate()?;
        let shape = RunShape::of(p);
        let streams = match p.seed {
            Some(seed) => StreamSource::new(seed),
            None => StreamSource::from_entropy(),
        };
        info!(%shape, seed = streams.seed(), "allocated run state");

        let series = || vec![DMatrix::zeros(shape.n_gloms, shape.steps_all); shape.n_odors];
        let trace = || vec![RowDVector::zeros(shape.steps_all); shape.n_odors];

        Ok(Self {
            orn: OrnVars { sims: series() },
            ln: LnVars {
                inh_a: trace(),
                inh_b: trace(),
            },
            pn: PnVars { sims: series() },
            kc: KcVars::new(shape.n_kc, shape.n_gloms, shape.n_odors),
            log: RunLogger::new(),
            shape,
            streams,
            stages: Stages::default(),
        })
    }

    /// Root seed of this run's random streams.
    #[inline]
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.streams.seed()
    }

    /// Dimensions this run was allocated for.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> RunShape {
        self.shape
    }

    /// Stages completed so far.
    #[inline]
    #[must_use]
    pub fn stages(&self) -> Stages {
        self.stages
    }

    pub(crate) fn stages_mut(&mut self) -> &mut Stages {
        &mut self.stages
    }

    pub(crate) fn streams_mut(&mut self) -> &mut StreamSource {
        &mut self.streams
    }

    /// Fail unless `p` describes the shape this run was built for.
    pub(crate) fn ensure_compatible(&self, p: &ModelParams) -> SimResult<()> {
        let got = RunShape::of(p);
        if got == self.shape {
            Ok(())
        } else {
            Err(SimError::StateMismatch {
                expected: self.shape.to_string(),
                got: got.to_string(),
            })
        }
    }
}
