//! Contour level sets.
//!
//! SLA levels are a symmetric ladder `-max, -max + interval, ..., max` (ascending).
//! Q levels are `count` values evenly spaced on `[0, max]`, listed from `max` down to `0`.
use crate::eddy_errors::EddyError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContourLevels {
    /// `-max..=max` every `interval` (SLA diagnostic).
    Interval { max: f64, interval: f64 },
    /// `count` levels from `max` down to `0` (Q diagnostic).
    Count { max: f64, count: usize },
}

impl ContourLevels {
    pub(crate) fn validate(&self) -> Result<(), EddyError> {
        match *self {
            ContourLevels::Interval { max, interval } => {
                if !(max > 0.0 && max.is_finite()) {
                    return Err(EddyError::InvalidConfig(
                        "contour max must be > 0".into(),
                    ));
                }
                if !(interval > 0.0 && interval <= max) {
                    return Err(EddyError::InvalidConfig(
                        "contour interval must be in (0, max]".into(),
                    ));
                }
            }
            ContourLevels::Count { max, count } => {
                if !(max > 0.0 && max.is_finite()) {
                    return Err(EddyError::InvalidConfig(
                        "contour max must be > 0".into(),
                    ));
                }
                if count < 2 {
                    return Err(EddyError::InvalidConfig(
                        "contour level count must be >= 2".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Materialize the level values in their canonical order.
    ///
    /// Levels are computed as `start + k * step` rather than by accumulation so that
    /// the ladder stays exactly symmetric around zero.
    pub fn values(&self) -> Vec<f64> {
        match *self {
            ContourLevels::Interval { max, interval } => {
                let n = (2.0 * max / interval).round() as usize + 1;
                (0..n).map(|k| -max + k as f64 * interval).collect()
            }
            ContourLevels::Count { max, count } => {
                let step = max / (count - 1) as f64;
                (0..count).rev().map(|k| k as f64 * step).collect()
            }
        }
    }
}
