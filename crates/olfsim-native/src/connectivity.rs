//! PN → KC connectivity sampling
//!
//! Each Kenyon cell receives `nclaws` claws. Every claw picks one glomerulus,
//! with replacement, with probability proportional to that glomerulus's
//! weight. Picking the same glomerulus twice doubles the synapse.

use nalgebra::DMatrix;
use olfsim_core::{ConfigError, ConfigResult};
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;

/// Sample an `n_kc × weights.len()` matrix of claw counts.
///
/// Every row sums to `nclaws`.
pub fn sample_wpnkc<R: Rng + ?Sized>(
    weights: &[f64],
    n_kc: usize,
    nclaws: usize,
    rng: &mut R,
) -> ConfigResult<DMatrix<f64>> {
    let dist = WeightedIndex::new(weights).map_err(|e| match e {
        WeightedError::NoItem => ConfigError::MissingConnectivityWeights,
        WeightedError::AllWeightsZero => ConfigError::ZeroConnectivityWeights,
        WeightedError::InvalidWeight => {
            let (index, value) = weights
                .iter()
                .copied()
                .enumerate()
                .find(|(_, w)| !w.is_finite() || *w < 0.0)
                .unwrap_or((0, f64::NAN));
            ConfigError::InvalidConnectivityWeight { index, value }
        }
        _ => ConfigError::InvalidValue {
            name: "kc.cxn_distrib".into(),
            value: weights.len().to_string(),
            reason: "too many glomeruli".into(),
        },
    })?;

    let mut w = DMatrix::zeros(n_kc, weights.len());
    for kc in 0..n_kc {
        for _ in 0..nclaws {
            w[(kc, dist.sample(rng))] += 1.0;
        }
    }
    Ok(w)
}
