//! Model parameters
//!
//! [`ModelParams`] holds every constant of the four-layer model plus the ORN
//! input data. It never holds anything produced by a simulation; that lives in
//! the run state of `olfsim-native`.
//!
//! # Example
//!
//! ```rust
//! use nalgebra::{DMatrix, DVector};
//! use olfsim_core::{ModelParams, OrnData};
//!
//! let mut p = ModelParams::default();
//! p.kc.n = 100;
//! p.kc.uniform_pns = true;
//! p.orn.data = Some(OrnData::new(
//!     DVector::from_vec(vec![10.0, 20.0]),
//!     DMatrix::from_row_slice(2, 1, &[50.0, 0.0]),
//! ).unwrap());
//!
//! assert!(p.validate().is_ok());
//! assert_eq!(p.n_gloms(), 2);
//! assert_eq!(p.n_odors(), 1);
//! ```

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::time::TimeGrid;

// ============================================================================
// Input Data
// ============================================================================

/// ORN firing-rate data: the model input.
///
/// Supplied by an external loader; glomerulus and odor counts of every other
/// matrix in the model derive from these shapes.
#[derive(Clone, Debug, PartialEq)]
pub struct OrnData {
    spont: DVector<f64>,
    delta: DMatrix<f64>,
}

impl OrnData {
    /// Wrap spontaneous rates (gloms × 1) and odor deltas (gloms × odors).
    pub fn new(spont: DVector<f64>, delta: DMatrix<f64>) -> ConfigResult<Self> {
        if spont.is_empty() {
            return Err(ConfigError::ShapeMismatch {
                what: "orn.spont",
                expected: "at least one glomerulus".into(),
                got: "0".into(),
            });
        }
        if delta.nrows() != spont.len() || delta.ncols() == 0 {
            return Err(ConfigError::ShapeMismatch {
                what: "orn.delta",
                expected: format!("{} x (>=1)", spont.len()),
                got: format!("{} x {}", delta.nrows(), delta.ncols()),
            });
        }
        Ok(Self { spont, delta })
    }

    /// Spontaneous firing rates, one per glomerulus.
    #[inline]
    #[must_use]
    pub fn spont(&self) -> &DVector<f64> {
        &self.spont
    }

    /// Odor-evoked rate changes, gloms × odors.
    #[inline]
    #[must_use]
    pub fn delta(&self) -> &DMatrix<f64> {
        &self.delta
    }

    /// Number of glomeruli.
    #[inline]
    #[must_use]
    pub fn n_gloms(&self) -> usize {
        self.spont.len()
    }

    /// Number of odors.
    #[inline]
    #[must_use]
    pub fn n_odors(&self) -> usize {
        self.delta.ncols()
    }
}

// ============================================================================
// Per-Layer Parameters
// ============================================================================

/// ORN layer parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrnParams {
    /// Membrane time constant (s)
    pub taum: f64,
    /// Glomerulus count of the physical system; scales LN input
    pub n_physical_gloms: usize,
    /// Input data; attached by the loader, never serialized
    #[serde(skip)]
    pub data: Option<OrnData>,
}

impl Default for OrnParams {
    fn default() -> Self {
        Self {
            taum: 0.01,
            n_physical_gloms: 51,
            data: None,
        }
    }
}

/// LN layer parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LnParams {
    /// Membrane time constant (s)
    pub taum: f64,
    /// Time constant of inhibition channel A (s)
    #[serde(rename = "tauGA")]
    pub tau_ga: f64,
    /// Time constant of inhibition channel B (s)
    #[serde(rename = "tauGB")]
    pub tau_gb: f64,
    /// Firing threshold
    pub thr: f64,
    /// Inhibition gain numerator
    pub inhsc: f64,
    /// Inhibition gain denominator offset
    pub inhadd: f64,
}

impl Default for LnParams {
    fn default() -> Self {
        Self {
            taum: 0.01,
            tau_ga: 0.1,
            tau_gb: 0.4,
            thr: 1.0,
            inhsc: 500.0,
            inhadd: 200.0,
        }
    }
}

/// Gaussian noise injected into the PN drive
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Mean
    pub mean: f64,
    /// Standard deviation
    pub sd: f64,
}

/// PN layer parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnParams {
    /// Membrane time constant (s)
    pub taum: f64,
    /// Offset added to the ORN deviation before the tanh
    pub offset: f64,
    /// Scale inside the tanh
    pub tanhsc: f64,
    /// Inhibition gain numerator
    pub inhsc: f64,
    /// Inhibition gain denominator offset
    pub inhadd: f64,
    /// Additive drive noise
    pub noise: NoiseParams,
}

impl Default for PnParams {
    fn default() -> Self {
        Self {
            taum: 0.01,
            offset: 2.9410,
            tanhsc: 5.3395,
            inhsc: 368.6631,
            inhadd: 31.4088,
            noise: NoiseParams::default(),
        }
    }
}

/// KC layer parameters, including sparsity-tuning targets
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KcParams {
    /// Number of KCs
    #[serde(rename = "N")]
    pub n: usize,
    /// Claws per KC
    pub nclaws: usize,
    /// Sample PN partners uniformly instead of from `cxn_distrib`
    pub uniform_pns: bool,
    /// Raw per-glomerulus connection weights; required unless `uniform_pns`
    pub cxn_distrib: Vec<f64>,
    /// Simulate APL feedback inhibition
    pub enable_apl: bool,
    /// Fixed firing threshold for every KC; skips threshold selection
    pub fixed_thr: Option<f64>,
    /// Per-KC instead of population-wide threshold selection
    pub use_homeostatic_thrs: bool,
    /// Target response sparsity
    pub sp_target: f64,
    /// Accepted deviation from the target, as a fraction of it
    pub sp_acc: f64,
    /// Learning-rate coefficient of the tuning step
    pub sp_lr_coeff: f64,
    /// Upper bound on tuning iterations (>= 1)
    pub max_iters: usize,
    /// Odor indices used for tuning; empty means all odors
    pub tune_from: Vec<usize>,
    /// Membrane time constant (s)
    pub taum: f64,
    /// APL membrane time constant (s)
    pub apl_taum: f64,
    /// APL -> KC synaptic time constant (s)
    pub tau_apl2kc: f64,
}

impl Default for KcParams {
    fn default() -> Self {
        Self {
            n: 2000,
            nclaws: 6,
            uniform_pns: false,
            cxn_distrib: Vec::new(),
            enable_apl: true,
            fixed_thr: None,
            use_homeostatic_thrs: false,
            sp_target: 0.1,
            sp_acc: 0.1,
            sp_lr_coeff: 10.0,
            max_iters: 10,
            tune_from: Vec::new(),
            taum: 0.01,
            apl_taum: 0.05,
            tau_apl2kc: 0.01,
        }
    }
}

// ============================================================================
// Model Parameters
// ============================================================================

/// Complete parameter bundle for one run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Time grid
    pub time: TimeGrid,
    /// ORN layer
    pub orn: OrnParams,
    /// LN layer
    pub ln: LnParams,
    /// PN layer
    pub pn: PnParams,
    /// KC layer
    pub kc: KcParams,
    /// Root seed for every random stream; drawn from entropy when unset
    pub seed: Option<u64>,
}

impl ModelParams {
    /// ORN input data, or an error if no loader has attached it.
    pub fn data(&self) -> ConfigResult<&OrnData> {
        self.orn.data.as_ref().ok_or(ConfigError::MissingInputData)
    }

    /// Number of glomeruli (0 before data is attached).
    #[must_use]
    pub fn n_gloms(&self) -> usize {
        self.orn.data.as_ref().map_or(0, OrnData::n_gloms)
    }

    /// Number of odors (0 before data is attached).
    #[must_use]
    pub fn n_odors(&self) -> usize {
        self.orn.data.as_ref().map_or(0, OrnData::n_odors)
    }

    /// Odors used for sparsity tuning: `kc.tune_from`, or all odors if empty.
    #[must_use]
    pub fn tune_odors(&self) -> Vec<usize> {
        if self.kc.tune_from.is_empty() {
            (0..self.n_odors()).collect()
        } else {
            self.kc.tune_from.clone()
        }
    }

    /// Weight row the PN->KC sampler draws from.
    ///
    /// All ones in uniform mode; otherwise the validated `kc.cxn_distrib`.
    pub fn connectivity_weights(&self) -> ConfigResult<Vec<f64>> {
        let n_gloms = self.data()?.n_gloms();
        if self.kc.uniform_pns {
            return Ok(vec![1.0; n_gloms]);
        }

        let w = &self.kc.cxn_distrib;
        if w.is_empty() {
            return Err(ConfigError::MissingConnectivityWeights);
        }
        if w.len() != n_gloms {
            return Err(ConfigError::ShapeMismatch {
                what: "kc.cxn_distrib",
                expected: format!("1 x {n_gloms}"),
                got: format!("1 x {}", w.len()),
            });
        }
        if let Some((index, &value)) = w
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ConfigError::InvalidConnectivityWeight { index, value });
        }
        if w.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::ZeroConnectivityWeights);
        }
        Ok(w.clone())
    }

    /// Check every invariant a simulation relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        self.time.validate()?;

        let positive = [
            ("orn.taum", self.orn.taum),
            ("ln.taum", self.ln.taum),
            ("ln.tauGA", self.ln.tau_ga),
            ("ln.tauGB", self.ln.tau_gb),
            ("pn.taum", self.pn.taum),
            ("kc.taum", self.kc.taum),
            ("kc.apl_taum", self.kc.apl_taum),
            ("kc.tau_apl2kc", self.kc.tau_apl2kc),
        ];
        for (parameter, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { parameter, value });
            }
        }

        if !(self.pn.noise.sd >= 0.0) || !self.pn.noise.sd.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "pn.noise.sd".into(),
                value: self.pn.noise.sd.to_string(),
                reason: "standard deviation must be finite and non-negative".into(),
            });
        }

        for (parameter, count) in [
            ("kc.N", self.kc.n),
            ("kc.nclaws", self.kc.nclaws),
            ("kc.max_iters", self.kc.max_iters),
            ("orn.n_physical_gloms", self.orn.n_physical_gloms),
        ] {
            if count == 0 {
                return Err(ConfigError::ZeroCount { parameter });
            }
        }

        let n_odors = self.data()?.n_odors();
        if let Some(&odor) = self.kc.tune_from.iter().find(|&&o| o >= n_odors) {
            return Err(ConfigError::OdorOutOfRange { odor, n_odors });
        }

        self.connectivity_weights()?;
        Ok(())
    }
}
