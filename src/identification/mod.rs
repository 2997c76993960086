//! # Per-frame eddy identification
//!
//! Turns the contours of one frame into [`EddyObservation`]s, one polarity at a time:
//!
//! 1. [`evaluator::evaluate`] decides whether a single contour encloses a plausible eddy,
//!    returning either the observation or an explicit [`Rejection`].
//! 2. [`collapser::collapse`] walks the levels from the strongest to the weakest (by
//!    default), evaluates the contours not already covered by an accepted eddy and
//!    guarantees that the accepted eddies are nearly disjoint.
//! 3. [`swirl`] computes the speed-based radius of an accepted eddy.
//!
//! Observations are immutable value records: they are created here and consumed by
//! [`crate::tracking::Tracker`].
use std::fmt;
use std::str::FromStr;

use hifitime::Epoch;

use crate::{
    config::{DiagnosticType, LevelOrder},
    contour::Contour,
    eddy_errors::EddyError,
};

pub mod collapser;
pub mod evaluator;
pub mod swirl;

pub use collapser::{collapse, CollapseReport};
pub use evaluator::{evaluate, EvaluationContext};

/// Sense of rotation of an eddy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Polarity {
    Anticyclonic,
    Cyclonic,
}

impl Polarity {
    pub const BOTH: [Polarity; 2] = [Polarity::Anticyclonic, Polarity::Cyclonic];

    /// Whether the eddy core is a maximum of the contoured field.
    ///
    /// SLA: anticyclones are highs and cyclones are lows. Q is positive-definite, both
    /// polarities are maxima.
    pub fn seeks_maximum(self, diagnostic: DiagnosticType) -> bool {
        match diagnostic {
            DiagnosticType::Sla => self == Polarity::Anticyclonic,
            DiagnosticType::Q => true,
        }
    }

    /// Whether the collapser visits levels from the highest down.
    pub fn visits_descending(self, diagnostic: DiagnosticType, order: LevelOrder) -> bool {
        match order {
            LevelOrder::StrongestFirst => self.seeks_maximum(diagnostic),
            LevelOrder::WeakestFirst => !self.seeks_maximum(diagnostic),
        }
    }

    /// Levels of `levels` reordered for the collapser.
    pub fn ordered_levels(
        self,
        diagnostic: DiagnosticType,
        order: LevelOrder,
        mut levels: Vec<f64>,
    ) -> Vec<f64> {
        if self.visits_descending(diagnostic, order) {
            levels.sort_by(|a, b| b.total_cmp(a));
        } else {
            levels.sort_by(|a, b| a.total_cmp(b));
        }
        levels
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Anticyclonic => f.write_str("Anticyclonic"),
            Polarity::Cyclonic => f.write_str("Cyclonic"),
        }
    }
}

impl FromStr for Polarity {
    type Err = EddyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anticyclonic" | "a" => Ok(Polarity::Anticyclonic),
            "cyclonic" | "c" => Ok(Polarity::Cyclonic),
            _ => Err(EddyError::ArchiveFormat(format!("unknown polarity '{s}'"))),
        }
    }
}

/// Snapshot of the field inside an eddy contour: flat pixel indices (increasing) and values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnclosedRegion {
    pub pixels: Vec<usize>,
    pub values: Vec<f64>,
}

impl EnclosedRegion {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pearson correlation of the values shared by `self` and `other` (same pixel index).
    ///
    /// `None` with fewer than two shared pixels or when either side is constant.
    pub fn correlation(&self, other: &EnclosedRegion) -> Option<f64> {
        let mut pairs = Vec::new();
        let (mut a, mut b) = (0, 0);
        while a < self.pixels.len() && b < other.pixels.len() {
            match self.pixels[a].cmp(&other.pixels[b]) {
                std::cmp::Ordering::Less => a += 1,
                std::cmp::Ordering::Greater => b += 1,
                std::cmp::Ordering::Equal => {
                    pairs.push((self.values[a], other.values[b]));
                    a += 1;
                    b += 1;
                }
            }
        }
        if pairs.len() < 2 {
            return None;
        }
        let n = pairs.len() as f64;
        let (mx, my) = pairs
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        let (mx, my) = (mx / n, my / n);
        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for (x, y) in &pairs {
            sxy += (x - mx) * (y - my);
            sxx += (x - mx) * (x - mx);
            syy += (y - my) * (y - my);
        }
        let denom = (sxx * syy).sqrt();
        (denom > 0.0).then(|| (sxy / denom).clamp(-1.0, 1.0))
    }
}

/// One detected eddy at one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct EddyObservation {
    pub epoch: Epoch,
    pub polarity: Polarity,
    pub center_lon: f64,
    pub center_lat: f64,
    /// `|extremum - level|`, in field units.
    pub amplitude: f64,
    /// Radius of the fitted circle (m).
    pub effective_radius: f64,
    /// Radius of the maximum mean rotational speed (m).
    pub speed_radius: f64,
    /// Maximum mean rotational speed (m/s); `NaN` when undefined.
    pub max_speed: f64,
    pub level: f64,
    pub contour: Contour,
    /// Kurian error of the fitted circle (%).
    pub shape_error: f64,
    pub region: EnclosedRegion,
}

/// Why a contour was not accepted as an eddy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Valid enclosed pixel count outside `[PIXMIN, PIXMAX]`.
    Size { pixels: usize },
    /// Kurian error above the configured bound (`inf` when no circle fits).
    Shape { error: f64 },
    /// Signed amplitude below `amp0`.
    Amplitude { amplitude: f64 },
    /// More than one interior extremum; a more restrictive level may split them.
    MultipleExtrema { count: usize },
    /// Rotation sense inconsistent with the polarity being searched (Q diagnostic).
    Polarity,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Size { pixels } => write!(f, "size ({pixels} pixels)"),
            Rejection::Shape { error } => write!(f, "shape (error {error:.1} %)"),
            Rejection::Amplitude { amplitude } => write!(f, "amplitude ({amplitude:.4})"),
            Rejection::MultipleExtrema { count } => write!(f, "multiple extrema ({count})"),
            Rejection::Polarity => f.write_str("polarity"),
        }
    }
}

#[cfg(test)]
mod identification_test {
    use super::*;

    #[test]
    fn test_ordered_levels() {
        let levels = vec![-1.0, 0.0, 1.0];
        let a = Polarity::Anticyclonic.ordered_levels(
            DiagnosticType::Sla,
            LevelOrder::StrongestFirst,
            levels.clone(),
        );
        assert_eq!(a, vec![1.0, 0.0, -1.0]);
        let c = Polarity::Cyclonic.ordered_levels(
            DiagnosticType::Sla,
            LevelOrder::StrongestFirst,
            levels.clone(),
        );
        assert_eq!(c, vec![-1.0, 0.0, 1.0]);
        let q = Polarity::Cyclonic.ordered_levels(
            DiagnosticType::Q,
            LevelOrder::WeakestFirst,
            levels,
        );
        assert_eq!(q, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_correlation_on_shared_pixels() {
        let a = EnclosedRegion {
            pixels: vec![1, 2, 3, 4],
            values: vec![1.0, 2.0, 3.0, 4.0],
        };
        let b = EnclosedRegion {
            pixels: vec![2, 3, 4, 9],
            values: vec![20.0, 30.0, 40.0, -5.0],
        };
        assert!((a.correlation(&b).unwrap() - 1.0).abs() < 1e-12);

        let c = EnclosedRegion {
            pixels: vec![4, 5],
            values: vec![1.0, 1.0],
        };
        assert_eq!(a.correlation(&c), None);
    }

    #[test]
    fn test_polarity_round_trip() {
        for p in Polarity::BOTH {
            assert_eq!(p.to_string().parse::<Polarity>().unwrap(), p);
        }
        assert!("clockwise".parse::<Polarity>().is_err());
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(Rejection::Size { pixels: 7 }.to_string(), "size (7 pixels)");
        assert_eq!(Rejection::Polarity.to_string(), "polarity");
    }
}
