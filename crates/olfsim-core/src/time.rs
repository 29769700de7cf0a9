//! Simulation time grid
//!
//! All step indices are relative to `pre_start`, the moment the ORN/LN/PN
//! layers begin settling. The KC layer only integrates from `start` onward.
//!
//! ```text
//!  pre_start        start     stim_start      stim_end       end
//!     |---settling----|----------|==============|-------------|
//!     0          start_step   stim_start_step  stim_end_step  steps_all
//! ```

use nalgebra::RowDVector;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Flat time-grid description (seconds)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeGrid {
    /// Start of the settling period for the ORN/LN/PN layers
    pub pre_start: f64,
    /// Start of the KC simulation
    pub start: f64,
    /// End of all simulation
    pub end: f64,
    /// Stimulus onset
    pub stim_start: f64,
    /// Stimulus offset
    pub stim_end: f64,
    /// Integration step
    pub dt: f64,
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self {
            pre_start: -2.0,
            start: -0.5,
            end: 0.75,
            stim_start: 0.0,
            stim_end: 0.5,
            dt: 0.5e-3,
        }
    }
}

impl TimeGrid {
    /// Check `pre_start < start <= stim_start < stim_end <= end` and `dt > 0`.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(ConfigError::NonPositiveStep { dt: self.dt });
        }
        let ordered = self.pre_start < self.start
            && self.start <= self.stim_start
            && self.stim_start < self.stim_end
            && self.stim_end <= self.end;
        if !ordered {
            return Err(ConfigError::InvalidTimeGrid {
                pre_start: self.pre_start,
                start: self.start,
                stim_start: self.stim_start,
                stim_end: self.stim_end,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Step index of time `t`, relative to `pre_start`.
    ///
    /// Rounded to the nearest step so that grid points which are exact in
    /// decimal (e.g. 2.75 / 0.0005) do not lose a step to binary round-off.
    #[inline]
    #[must_use]
    pub fn step_of(&self, t: f64) -> usize {
        let steps = ((t - self.pre_start) / self.dt).round();
        if steps <= 0.0 {
            0
        } else {
            steps as usize
        }
    }

    /// First step of the KC simulation.
    #[inline]
    #[must_use]
    pub fn start_step(&self) -> usize {
        self.step_of(self.start)
    }

    /// Total step count, settling included.
    #[inline]
    #[must_use]
    pub fn steps_all(&self) -> usize {
        self.step_of(self.end)
    }

    /// "Real" step count, `start` to `end`.
    ///
    /// Always equals `steps_all() - start_step()`.
    #[inline]
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps_all().saturating_sub(self.start_step())
    }

    /// First step with the stimulus present.
    #[inline]
    #[must_use]
    pub fn stim_start_step(&self) -> usize {
        self.step_of(self.stim_start)
    }

    /// First step after the stimulus is withdrawn.
    #[inline]
    #[must_use]
    pub fn stim_end_step(&self) -> usize {
        self.step_of(self.stim_end)
    }

    /// Row of length `steps_all()`: 1 while the stimulus is on, 0 otherwise.
    #[must_use]
    pub fn stim_row(&self) -> RowDVector<f64> {
        let n = self.steps_all();
        let on = self.stim_start_step().min(n)..self.stim_end_step().min(n);
        RowDVector::from_fn(n, |_, j| if on.contains(&j) { 1.0 } else { 0.0 })
    }

    /// Row of ones of length `steps_all()`.
    #[must_use]
    pub fn ones_row(&self) -> RowDVector<f64> {
        RowDVector::from_element(self.steps_all(), 1.0)
    }

    /// Pre-stimulus window used to estimate spontaneous PN output.
    ///
    /// Runs from halfway between `start` and `stim_start` up to `stim_start`.
    /// Returns a half-open `(from, to)` step range; it can be empty when the
    /// stimulus starts exactly at `start`.
    #[must_use]
    pub fn spont_window(&self) -> (usize, usize) {
        let lead = self.stim_start - self.start;
        let from = self.start_step() + (lead / (2.0 * self.dt)).round().max(0.0) as usize;
        let to = self.start_step() + (lead / self.dt).round().max(0.0) as usize;
        (from.min(self.steps_all()), to.min(self.steps_all()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_step_counts() {
        let t = TimeGrid::default();
        assert_eq!(t.steps_all(), 5500);
        assert_eq!(t.start_step(), 3000);
        assert_eq!(t.steps(), 2500);
        assert_eq!(t.stim_start_step(), 4000);
        assert_eq!(t.stim_end_step(), 5000);
    }

    #[test]
    fn test_stim_row_marks_stimulus() {
        let t = TimeGrid {
            pre_start: 0.0,
            start: 1.0,
            end: 10.0,
            stim_start: 3.0,
            stim_end: 5.0,
            dt: 1.0,
        };
        let row = t.stim_row();
        assert_eq!(row.len(), 10);
        let on: Vec<usize> = (0..10).filter(|&j| row[j] > 0.5).collect();
        assert_eq!(on, vec![3, 4]);
        assert!((t.ones_row().sum() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_grids() {
        let mut t = TimeGrid::default();
        t.dt = 0.0;
        assert!(matches!(t.validate(), Err(ConfigError::NonPositiveStep { .. })));

        let mut t = TimeGrid::default();
        t.stim_start = -1.0;
        assert!(matches!(t.validate(), Err(ConfigError::InvalidTimeGrid { .. })));

        assert!(TimeGrid::default().validate().is_ok());
    }

    #[test]
    fn test_spont_window() {
        let t = TimeGrid::default();
        // start_step 3000, lead 0.5 s = 1000 steps
        assert_eq!(t.spont_window(), (3500, 4000));

        let t = TimeGrid { stim_start: -0.5, ..TimeGrid::default() };
        let (from, to) = t.spont_window();
        assert_eq!(from, to);
    }

    #[test]
    fn test_spont_window_rounds_both_ends() {
        // 0.7 / (2 · 0.5e-3) evaluates to just under 700
        let t = TimeGrid { start: -0.7, ..TimeGrid::default() };
        assert_eq!(t.start_step(), 2600);
        assert_eq!(t.spont_window(), (3300, 4000));
        assert_eq!(t.spont_window().1, t.stim_start_step());
    }
}
