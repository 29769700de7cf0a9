//! Configuration error types
//!
//! Every error here is raised before any simulation state is touched, so a
//! caller that sees one can fix the parameters and retry with the same state.

use thiserror::Error;

/// Errors raised while validating or editing [`ModelParams`](crate::ModelParams).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Time grid ordering `pre_start < start <= stim.start < stim.end <= end` violated
    #[error(
        "Invalid time grid: need pre_start < start <= stim_start < stim_end <= end \
         (got {pre_start}, {start}, {stim_start}, {stim_end}, {end})"
    )]
    InvalidTimeGrid {
        /// Settling start
        pre_start: f64,
        /// Run start
        start: f64,
        /// Stimulus onset
        stim_start: f64,
        /// Stimulus offset
        stim_end: f64,
        /// Run end
        end: f64,
    },

    /// Step size not strictly positive
    #[error("Time step must be positive, got {dt}")]
    NonPositiveStep {
        /// Offending step size
        dt: f64,
    },

    /// A time constant or other strictly positive scalar is not
    #[error("Parameter {parameter} must be positive, got {value}")]
    NonPositive {
        /// Dotted parameter name
        parameter: &'static str,
        /// Offending value
        value: f64,
    },

    /// Matrix or vector has the wrong shape
    #[error("Shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// What was being checked
        what: &'static str,
        /// Expected shape, human readable
        expected: String,
        /// Actual shape, human readable
        got: String,
    },

    /// Calibration data was never attached
    #[error("ORN input data missing: spontaneous rates and odor deltas must be loaded first")]
    MissingInputData,

    /// Weighted sampling requested without a weight row
    #[error("Weighted PN->KC sampling requested but no connectivity weights were supplied")]
    MissingConnectivityWeights,

    /// Weight row contains a negative or non-finite entry
    #[error("Connectivity weight {index} is invalid: {value}")]
    InvalidConnectivityWeight {
        /// Position in the weight row
        index: usize,
        /// Offending weight
        value: f64,
    },

    /// Weight row sums to zero, so the sampling distribution is undefined
    #[error("Connectivity weights sum to zero; at least one glomerulus needs positive weight")]
    ZeroConnectivityWeights,

    /// Tuning subset references an odor that does not exist
    #[error("Tuning odor index {odor} out of range (have {n_odors} odors)")]
    OdorOutOfRange {
        /// Offending index
        odor: usize,
        /// Number of odors in the input data
        n_odors: usize,
    },

    /// Count parameter that must be at least one
    #[error("Parameter {parameter} must be at least 1")]
    ZeroCount {
        /// Dotted parameter name
        parameter: &'static str,
    },

    /// Named accessor was given a name it does not know
    #[error("Unknown model parameter: {name}")]
    UnknownParameter {
        /// Name as supplied by the caller
        name: String,
    },

    /// Named accessor could not parse the supplied value
    #[error("Invalid value {value:?} for parameter {name}: {reason}")]
    InvalidValue {
        /// Dotted parameter name
        name: String,
        /// Raw value as supplied
        value: String,
        /// Parser message
        reason: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ConfigError::OdorOutOfRange { odor: 12, n_odors: 4 };
        assert_eq!(err.to_string(), "Tuning odor index 12 out of range (have 4 odors)");

        let err = ConfigError::UnknownParameter { name: "kc.bogus".into() };
        assert!(err.to_string().contains("kc.bogus"));
    }
}
