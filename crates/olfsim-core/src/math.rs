//! Numeric helpers shared by the layer integrators
//!
//! This module provides:
//! - Exponential moving-average smoothing of time series (columns = time)
//! - Half-wave rectification
//! - Windowed row means

use nalgebra::{DMatrix, DVector};

/// Smoothing window of the ORN odor input, in seconds.
///
/// Empirically tuned; it has no derivation and must be kept as is.
pub const ORN_SMOOTHING_WINDOW: f64 = 0.02;

/// Blend factor of an exponential moving average with window `wsize` steps.
///
/// Windows longer than one step map to `2 / (wsize + 1)`; shorter values are
/// taken as the blend factor itself.
#[inline]
#[must_use]
pub fn ema_factor(wsize: f64) -> f64 {
    if wsize > 1.0 {
        2.0 / (wsize + 1.0)
    } else {
        wsize
    }
}

/// Smooth every row of `series` in place with an exponential moving average
/// running along the columns.
///
/// `y[t] = α·x[t] + (1 − α)·y[t−1]`, with `y[0] = x[0]`.
pub fn smooth_exp(series: &mut DMatrix<f64>, wsize: f64) {
    let alpha = ema_factor(wsize);
    let rows = series.nrows();
    for t in 1..series.ncols() {
        for r in 0..rows {
            series[(r, t)] = alpha * series[(r, t)] + (1.0 - alpha) * series[(r, t - 1)];
        }
    }
}

/// `max(0, x)`
#[inline]
#[must_use]
pub fn rectify(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Per-row mean of columns `from..to`.
///
/// An empty window falls back to column `from` (clamped to the last column),
/// so the result is always defined for a non-empty matrix.
#[must_use]
pub fn window_row_mean(series: &DMatrix<f64>, from: usize, to: usize) -> DVector<f64> {
    if series.ncols() == 0 {
        return DVector::zeros(series.nrows());
    }
    if to <= from {
        let col = from.min(series.ncols() - 1);
        return series.column(col).into_owned();
    }
    let to = to.min(series.ncols());
    let width = (to - from) as f64;
    let mut out = DVector::zeros(series.nrows());
    for t in from..to {
        out += series.column(t);
    }
    out / width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_factor() {
        assert!((ema_factor(40.0) - 2.0 / 41.0).abs() < 1e-15);
        assert!((ema_factor(0.5) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_smooth_exp_step_response() {
        // A unit step smoothed with alpha = 0.5 approaches 1 geometrically
        let mut m = DMatrix::from_row_slice(1, 4, &[0.0, 1.0, 1.0, 1.0]);
        smooth_exp(&mut m, 0.5);
        let expected = [0.0, 0.5, 0.75, 0.875];
        for (t, e) in expected.iter().enumerate() {
            assert!((m[(0, t)] - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rectify() {
        assert_eq!(rectify(-3.0), 0.0);
        assert_eq!(rectify(2.5), 2.5);
    }

    #[test]
    fn test_window_row_mean() {
        let m = DMatrix::from_row_slice(2, 4, &[1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 6.0, 6.0]);
        let mean = window_row_mean(&m, 1, 3);
        assert!((mean[0] - 2.5).abs() < 1e-12);
        assert!((mean[1] - 3.0).abs() < 1e-12);

        let empty = window_row_mean(&m, 2, 2);
        assert!((empty[0] - 3.0).abs() < 1e-12);
    }
}
