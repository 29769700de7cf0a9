//! Olfsim Core - parameters and numeric helpers for the olfactory circuit model
//!
//! This crate describes *what* is simulated: the four-layer circuit
//! (ORN → LN → PN → KC), its time grid, its constants and its input data.
//! The integrators, the sparsity tuning and the parallel orchestration live in
//! `olfsim-native`.
//!
//! # Modules
//!
//! - [`params`]: Parameter bundle and ORN input data
//! - [`time`]: Time grid and derived step indices
//! - [`access`]: Dotted-name parameter access for hosts
//! - [`error`]: Configuration errors
//! - [`math`]: Smoothing and rectification helpers
//!
//! # Example
//!
//! ```rust
//! use olfsim_core::ModelParams;
//!
//! let mut params = ModelParams::default();
//! params.set_param("kc.sp_target", "0.05").unwrap();
//!
//! assert_eq!(params.time.steps_all(), 5500);
//! assert_eq!(params.get_param("kc.sp_target").unwrap(), "0.05");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod access;
pub mod error;
pub mod math;
pub mod params;
pub mod time;

pub use access::PARAM_NAMES;
pub use error::{ConfigError, ConfigResult};
pub use params::{KcParams, LnParams, ModelParams, NoiseParams, OrnData, OrnParams, PnParams};
pub use time::TimeGrid;
