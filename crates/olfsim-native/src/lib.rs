//! Olfsim Native - parallel simulation of the olfactory circuit
//!
//! This crate runs the model described by `olfsim-core`:
//! - Forward-Euler integrators for the ORN, LN, PN and KC layers
//! - Weighted PN → KC connectivity sampling
//! - KC threshold and APL weight tuning toward a target sparsity
//! - Per-odor parallel orchestration on the rayon pool
//! - A per-run line log alongside `tracing` diagnostics
//!
//! # Modules
//!
//! - [`pipeline`]: Stage entry points
//! - [`layers`]: Layer integrators
//! - [`tuning`]: Sparsity tuning
//! - [`connectivity`]: PN → KC sampling
//! - [`state`]: Run state
//! - [`rng`]: Seeded random streams
//! - [`log`]: Run log
//!
//! # Example
//!
//! ```rust
//! use nalgebra::{DMatrix, DVector};
//! use olfsim_core::{ModelParams, OrnData, TimeGrid};
//! use olfsim_native::{run_all, RunVars};
//!
//! let mut p = ModelParams::default();
//! p.time = TimeGrid { pre_start: -0.2, start: -0.1, end: 0.1, stim_start: 0.0, stim_end: 0.05, dt: 1e-3 };
//! p.orn.data = Some(OrnData::new(
//!     DVector::from_vec(vec![5.0, 10.0]),
//!     DMatrix::from_row_slice(2, 3, &[40.0, 0.0, 10.0, 0.0, 60.0, 20.0]),
//! ).unwrap());
//! p.kc.n = 20;
//! p.kc.uniform_pns = true;
//! p.kc.max_iters = 3;
//! p.seed = Some(1);
//!
//! let mut rv = RunVars::new(&p).unwrap();
//! run_all(&p, &mut rv).unwrap();
//!
//! assert_eq!(rv.kc.responses.shape(), (20, 3));
//! assert!(rv.kc.tuning_iters <= 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::many_single_char_names)]

pub mod connectivity;
pub mod error;
pub mod layers;
pub mod log;
pub mod pipeline;
pub mod rng;
pub mod state;
pub mod tuning;

// Re-export key types
pub use error::{SimError, SimResult};
pub use log::RunLogger;
pub use pipeline::{remove_all_pretime, run_all, run_kc_sims, run_orn_ln_sims, run_pn_sims};
pub use rng::StreamSource;
pub use state::{KcCircuit, KcVars, LnVars, OrnVars, PnVars, RunShape, RunVars, Stages};
pub use tuning::{fit_sparseness, TuningReport};
