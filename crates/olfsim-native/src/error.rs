//! Simulation error types
//!
//! Configuration and call-order mistakes are errors. Numerical degeneracy and
//! an exhausted tuning budget are not: they show up in the returned state
//! (tuning iteration count, response matrices) instead.

use olfsim_core::ConfigError;
use thiserror::Error;

/// Errors raised by the simulation pipeline
#[derive(Error, Debug)]
pub enum SimError {
    /// Invalid or missing parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A stage was invoked before the stage it depends on
    #[error("Cannot run {stage}: {requires} results are not available yet")]
    StageNotReady {
        /// Stage that was invoked
        stage: &'static str,
        /// Stage whose output is missing
        requires: &'static str,
    },

    /// A stage that needs the settling period ran after it was trimmed away
    #[error("Cannot run {stage}: pre-settle time columns were already trimmed")]
    Trimmed {
        /// Stage that was invoked
        stage: &'static str,
    },

    /// Parameters do not match the shapes the run state was built with
    #[error("Run state was built for {expected}, parameters describe {got}")]
    StateMismatch {
        /// Shape the run state was allocated for
        expected: String,
        /// Shape implied by the parameters passed now
        got: String,
    },

    /// Noise distribution could not be constructed
    #[error("Invalid PN noise distribution: {reason}")]
    Noise {
        /// Reason reported by the distribution
        reason: String,
    },
}

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;
