//! # Run configuration
//!
//! This module defines [`EddyConfig`], the single validated configuration consumed by the
//! identification and tracking pipeline, and its builder [`EddyConfigBuilder`].
//!
//! ## Purpose
//!
//! An [`EddyConfig`] is built **once** at startup and then passed by reference to every
//! stage. It controls:
//!
//! - the geographic domain and its bounding box (the `Global` preset forces
//!   `lon ∈ [-100, 290]`, `lat ∈ [-80, 80]`),
//! - the inclusive date range of frames to process,
//! - the contoured diagnostic (`SLA` or `Q`) and its contour levels,
//! - the admissibility thresholds of a contour (radius bounds, minimum amplitude, shape error),
//! - the tracking parameters (time step, missed-frame budget, cost weights, ellipse scaling).
//!
//! All fatal configuration errors are reported by [`EddyConfigBuilder::build`], before any
//! frame is processed.
//!
//! ## Example
//!
//! ```rust
//! use eddytrack::config::{EddyConfig, Domain};
//! use eddytrack::time::parse_date;
//!
//! let config = EddyConfig::builder()
//!     .domain(Domain::Regional)
//!     .bounding_box(-60.0, -10.0, 20.0, 50.0)
//!     .date_range(parse_date("2014-01-01").unwrap(), parse_date("2014-12-31").unwrap())
//!     .radius_bounds(0.4, 4.461)
//!     .amp0(1.0)
//!     .build()
//!     .unwrap();
//!
//! println!("{config:#}");
//! ```
//!
//! ## See also
//!
//! * [`ContourLevels`] – level ladder generation.
//! * [`crate::pipeline::EddyTracker`] – consumer of the configuration.
use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use hifitime::Epoch;

use crate::{eddy_errors::EddyError, time::date_string};

pub mod domain;
pub mod levels;

pub use domain::{CenterMethod, DiagnosticType, Domain, LevelOrder, SmoothingKind};
pub use levels::ContourLevels;

/// Bounding box applied to the `Global` domain.
pub const GLOBAL_LON_RANGE: (f64, f64) = (-100.0, 290.0);
/// Latitude range applied to the `Global` domain.
pub const GLOBAL_LAT_RANGE: (f64, f64) = (-80.0, 80.0);

/// Weights of the composite association cost used by the tracker.
///
/// The cost of pairing a track with a candidate is
/// `distance * d_ellipse + amplitude * dA + radius * dR + correlation * (1 - r) / 2`
/// where `d_ellipse` is the normalized search-ellipse distance, `dA` and `dR` the relative
/// amplitude and radius differences, and `r` the Pearson correlation of the enclosed fields
/// over their shared pixels (only when shape correlation is enabled).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostWeights {
    pub distance: f64,
    pub amplitude: f64,
    pub radius: f64,
    pub correlation: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights {
            distance: 1.0,
            amplitude: 0.5,
            radius: 0.5,
            correlation: 0.0,
        }
    }
}

/// Inclusive bounds on the number of enclosed grid cells of an admissible contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub min: usize,
    pub max: usize,
}

impl PixelBounds {
    #[inline]
    pub fn contains(&self, n: usize) -> bool {
        self.min <= n && n <= self.max
    }
}

/// Validated configuration of an identification and tracking run.
///
/// Construct it with [`EddyConfig::builder`]; fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EddyConfig {
    pub(crate) domain: Domain,
    pub(crate) lon_range: (f64, f64),
    pub(crate) lat_range: (f64, f64),
    pub(crate) start_date: Epoch,
    pub(crate) end_date: Epoch,
    pub(crate) diagnostic: DiagnosticType,
    pub(crate) contour_levels: ContourLevels,
    pub(crate) radius_min: f64,
    pub(crate) radius_max: f64,
    pub(crate) amp0: f64,
    pub(crate) max_shape_error: f64,
    pub(crate) smoothing: Option<SmoothingKind>,
    pub(crate) days_between_records: f64,
    pub(crate) field_to_meters: f64,
    pub(crate) missed_frame_budget: usize,
    pub(crate) overlap_tolerance: f64,
    pub(crate) center_method: CenterMethod,
    pub(crate) level_order: LevelOrder,
    pub(crate) n_rays: usize,
    pub(crate) cost_weights: CostWeights,
    pub(crate) use_shape_correlation: bool,
    pub(crate) ellipse_latitude_scaling: bool,
    pub(crate) boundary_padding: usize,
}

impl EddyConfig {
    /// Create a builder initialised with the SLA defaults.
    pub fn builder() -> EddyConfigBuilder {
        EddyConfigBuilder::new()
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn lon_range(&self) -> (f64, f64) {
        self.lon_range
    }

    pub fn lat_range(&self) -> (f64, f64) {
        self.lat_range
    }

    pub fn start_date(&self) -> Epoch {
        self.start_date
    }

    pub fn end_date(&self) -> Epoch {
        self.end_date
    }

    pub fn diagnostic(&self) -> DiagnosticType {
        self.diagnostic
    }

    pub fn contour_levels(&self) -> ContourLevels {
        self.contour_levels
    }

    /// Level values in their canonical order (ascending for SLA, descending for Q).
    pub fn levels(&self) -> Vec<f64> {
        self.contour_levels.values()
    }

    pub fn radius_bounds(&self) -> (f64, f64) {
        (self.radius_min, self.radius_max)
    }

    pub fn amp0(&self) -> f64 {
        self.amp0
    }

    pub fn max_shape_error(&self) -> f64 {
        self.max_shape_error
    }

    pub fn smoothing(&self) -> Option<SmoothingKind> {
        self.smoothing
    }

    pub fn days_between_records(&self) -> f64 {
        self.days_between_records
    }

    pub fn field_to_meters(&self) -> f64 {
        self.field_to_meters
    }

    pub fn missed_frame_budget(&self) -> usize {
        self.missed_frame_budget
    }

    pub fn overlap_tolerance(&self) -> f64 {
        self.overlap_tolerance
    }

    pub fn center_method(&self) -> CenterMethod {
        self.center_method
    }

    pub fn level_order(&self) -> LevelOrder {
        self.level_order
    }

    pub fn n_rays(&self) -> usize {
        self.n_rays
    }

    pub fn cost_weights(&self) -> CostWeights {
        self.cost_weights
    }

    pub fn use_shape_correlation(&self) -> bool {
        self.use_shape_correlation
    }

    pub fn ellipse_latitude_scaling(&self) -> bool {
        self.ellipse_latitude_scaling
    }

    pub fn boundary_padding(&self) -> usize {
        self.boundary_padding
    }

    /// Pixel-count bounds for a grid of the given resolution (degrees per pixel).
    ///
    /// `PIX = round(π R² / resolution²)` with round-half-to-even, `R` in degrees.
    pub fn pixel_bounds(&self, resolution: f64) -> PixelBounds {
        let pix = |r: f64| {
            let p = (std::f64::consts::PI * r * r / (resolution * resolution)).round_ties_even();
            if p.is_finite() && p > 0.0 {
                p as usize
            } else {
                0
            }
        };
        PixelBounds {
            min: pix(self.radius_min),
            max: pix(self.radius_max),
        }
    }

    /// Whether `epoch` falls inside the inclusive date range.
    pub fn in_date_range(&self, epoch: Epoch) -> bool {
        self.start_date <= epoch && epoch <= self.end_date
    }
}

impl Default for EddyConfig {
    fn default() -> Self {
        EddyConfig {
            domain: Domain::Regional,
            lon_range: (-180.0, 180.0),
            lat_range: (-80.0, 80.0),
            start_date: Epoch::from_gregorian_utc_at_midnight(1950, 1, 1),
            end_date: Epoch::from_gregorian_utc_at_midnight(2100, 1, 1),
            diagnostic: DiagnosticType::Sla,
            contour_levels: ContourLevels::Interval {
                max: 100.0,
                interval: 1.0,
            },
            radius_min: 0.4,
            radius_max: 4.461,
            amp0: 1.0,
            max_shape_error: 55.0,
            smoothing: None,
            days_between_records: 1.0,
            field_to_meters: 0.01,
            missed_frame_budget: 0,
            overlap_tolerance: 0.05,
            center_method: CenterMethod::default(),
            level_order: LevelOrder::default(),
            n_rays: 16,
            cost_weights: CostWeights::default(),
            use_shape_correlation: false,
            ellipse_latitude_scaling: true,
            boundary_padding: 0,
        }
    }
}

/// Builder for [`EddyConfig`], with validation.
#[derive(Debug, Clone)]
pub struct EddyConfigBuilder {
    config: EddyConfig,
}

impl Default for EddyConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EddyConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EddyConfig::default(),
        }
    }

    pub fn domain(mut self, v: Domain) -> Self {
        self.config.domain = v;
        self
    }

    /// Longitude then latitude bounds, in degrees. Ignored by the `Global` domain.
    pub fn bounding_box(mut self, lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        self.config.lon_range = (lon_min, lon_max);
        self.config.lat_range = (lat_min, lat_max);
        self
    }

    /// Inclusive date range.
    pub fn date_range(mut self, start: Epoch, end: Epoch) -> Self {
        self.config.start_date = start;
        self.config.end_date = end;
        self
    }

    /// Select the diagnostic and reset the level ladder, `amp0` and the shape-error bound
    /// to that diagnostic's defaults. Call it before overriding any of those three.
    pub fn diagnostic(mut self, v: DiagnosticType) -> Self {
        self.config.diagnostic = v;
        match v {
            DiagnosticType::Sla => {
                self.config.contour_levels = ContourLevels::Interval {
                    max: 100.0,
                    interval: 1.0,
                };
                self.config.amp0 = 1.0;
                self.config.max_shape_error = 55.0;
            }
            DiagnosticType::Q => {
                self.config.contour_levels = ContourLevels::Count {
                    max: 1.0,
                    count: 21,
                };
                self.config.amp0 = 0.02;
                self.config.max_shape_error = 35.0;
            }
        }
        self
    }

    pub fn contour_levels(mut self, v: ContourLevels) -> Self {
        self.config.contour_levels = v;
        self
    }

    /// Minimum and maximum eddy radius, in degrees.
    pub fn radius_bounds(mut self, min: f64, max: f64) -> Self {
        self.config.radius_min = min;
        self.config.radius_max = max;
        self
    }

    pub fn amp0(mut self, v: f64) -> Self {
        self.config.amp0 = v;
        self
    }

    pub fn max_shape_error(mut self, v: f64) -> Self {
        self.config.max_shape_error = v;
        self
    }

    pub fn smoothing(mut self, v: Option<SmoothingKind>) -> Self {
        self.config.smoothing = v;
        self
    }

    pub fn days_between_records(mut self, v: f64) -> Self {
        self.config.days_between_records = v;
        self
    }

    pub fn field_to_meters(mut self, v: f64) -> Self {
        self.config.field_to_meters = v;
        self
    }

    pub fn missed_frame_budget(mut self, v: usize) -> Self {
        self.config.missed_frame_budget = v;
        self
    }

    pub fn overlap_tolerance(mut self, v: f64) -> Self {
        self.config.overlap_tolerance = v;
        self
    }

    pub fn center_method(mut self, v: CenterMethod) -> Self {
        self.config.center_method = v;
        self
    }

    pub fn level_order(mut self, v: LevelOrder) -> Self {
        self.config.level_order = v;
        self
    }

    pub fn n_rays(mut self, v: usize) -> Self {
        self.config.n_rays = v;
        self
    }

    pub fn cost_weights(mut self, v: CostWeights) -> Self {
        self.config.cost_weights = v;
        self
    }

    pub fn use_shape_correlation(mut self, v: bool) -> Self {
        self.config.use_shape_correlation = v;
        self
    }

    pub fn ellipse_latitude_scaling(mut self, v: bool) -> Self {
        self.config.ellipse_latitude_scaling = v;
        self
    }

    pub fn boundary_padding(mut self, v: usize) -> Self {
        self.config.boundary_padding = v;
        self
    }

    // ---- Numeric helpers for PartialOrd (handle NaN as invalid) ----

    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    #[inline]
    fn le(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
    }

    /// Finalize the builder and produce an [`EddyConfig`].
    ///
    /// Validation rules
    /// -----------------
    /// * `start_date <= end_date`, otherwise [`EddyError::InvalidDateRange`].
    /// * `lon_min < lon_max`, `lat_min < lat_max`, latitudes within `[-90, 90]`.
    /// * The level ladder matches the diagnostic (`Interval` for SLA, `Count` for Q) and is
    ///   itself valid.
    /// * `0 < radius_min <= radius_max`, `amp0 >= 0`, `max_shape_error > 0`.
    /// * `days_between_records > 0`, `field_to_meters > 0`.
    /// * `0 <= overlap_tolerance < 1`, `n_rays >= 1`, cost weights `>= 0`.
    ///
    /// Notes
    /// -----------------
    /// * The `Global` domain replaces the bounding box by
    ///   [`GLOBAL_LON_RANGE`] × [`GLOBAL_LAT_RANGE`].
    /// * A missed-frame budget of `0` closes a track on its first miss, like `1`.
    ///
    /// Return
    /// ----------
    /// * `Ok(EddyConfig)` when every rule holds, the first violated rule otherwise.
    pub fn build(mut self) -> Result<EddyConfig, EddyError> {
        if self.config.domain == Domain::Global {
            self.config.lon_range = GLOBAL_LON_RANGE;
            self.config.lat_range = GLOBAL_LAT_RANGE;
        }
        let c = &self.config;

        if c.start_date > c.end_date {
            return Err(EddyError::InvalidDateRange {
                start: date_string(c.start_date),
                end: date_string(c.end_date),
            });
        }

        let (lon_min, lon_max) = c.lon_range;
        let (lat_min, lat_max) = c.lat_range;
        if !(lon_min < lon_max) {
            return Err(EddyError::InvalidConfig(
                "require lon_min < lon_max".into(),
            ));
        }
        if !(lat_min < lat_max && Self::le(-90.0, lat_min) && Self::le(lat_max, 90.0)) {
            return Err(EddyError::InvalidConfig(
                "require -90 <= lat_min < lat_max <= 90".into(),
            ));
        }

        match (c.diagnostic, c.contour_levels) {
            (DiagnosticType::Sla, ContourLevels::Interval { .. })
            | (DiagnosticType::Q, ContourLevels::Count { .. }) => {}
            (DiagnosticType::Sla, _) => {
                return Err(EddyError::InvalidConfig(
                    "SLA diagnostic requires interval contour levels".into(),
                ))
            }
            (DiagnosticType::Q, _) => {
                return Err(EddyError::InvalidConfig(
                    "Q diagnostic requires counted contour levels".into(),
                ))
            }
        }
        c.contour_levels.validate()?;

        if !(Self::gt0(c.radius_min) && Self::le(c.radius_min, c.radius_max)) {
            return Err(EddyError::InvalidConfig(
                "require 0 < radius_min <= radius_max".into(),
            ));
        }
        if !Self::ge0(c.amp0) {
            return Err(EddyError::InvalidConfig("amp0 must be >= 0".into()));
        }
        if !Self::gt0(c.max_shape_error) {
            return Err(EddyError::InvalidConfig(
                "max_shape_error must be > 0".into(),
            ));
        }
        if !Self::gt0(c.days_between_records) {
            return Err(EddyError::InvalidConfig(
                "days_between_records must be > 0".into(),
            ));
        }
        if !Self::gt0(c.field_to_meters) {
            return Err(EddyError::InvalidConfig(
                "field_to_meters must be > 0".into(),
            ));
        }
        if !(Self::ge0(c.overlap_tolerance) && c.overlap_tolerance < 1.0) {
            return Err(EddyError::InvalidConfig(
                "overlap_tolerance must be in [0, 1)".into(),
            ));
        }
        if c.n_rays == 0 {
            return Err(EddyError::InvalidConfig("n_rays must be >= 1".into()));
        }
        let w = c.cost_weights;
        if ![w.distance, w.amplitude, w.radius, w.correlation]
            .into_iter()
            .all(Self::ge0)
        {
            return Err(EddyError::InvalidConfig(
                "cost weights must be >= 0".into(),
            ));
        }

        Ok(self.config)
    }
}

impl fmt::Display for EddyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels = match self.contour_levels {
            ContourLevels::Interval { max, interval } => format!("±{max} every {interval}"),
            ContourLevels::Count { max, count } => format!("{count} levels in [0, {max}]"),
        };
        let smoothing = self
            .smoothing
            .map_or_else(|| "none".to_string(), |s| s.to_string());

        if f.alternate() {
            const PARAM_COL: usize = 46;
            writeln!(f, "Eddy Identification & Tracking Configuration")?;
            writeln!(f, "--------------------------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Domain]")?;
            line!("domain              = {}", self.domain, "Geographic preset")?;
            line!(
                "lon                 = {:?}",
                self.lon_range,
                "Longitude bounds (deg)"
            )?;
            line!(
                "lat                 = {:?}",
                self.lat_range,
                "Latitude bounds (deg)"
            )?;
            line!(
                "dates               = {}",
                format!("{} .. {}", date_string(self.start_date), date_string(self.end_date)),
                "Inclusive date range"
            )?;

            writeln!(f, "[Identification]")?;
            line!("diagnostic          = {}", self.diagnostic, "Contoured field")?;
            line!("levels              = {}", levels, "Contour level ladder")?;
            line!(
                "radius              = {}",
                format!("{:.3} .. {:.3} deg", self.radius_min, self.radius_max),
                "Admissible radius bounds"
            )?;
            line!("amp0                = {}", self.amp0, "Minimum amplitude")?;
            line!(
                "max_shape_error     = {:.1} %",
                self.max_shape_error,
                "Kurian area error bound"
            )?;
            line!("smoothing           = {}", smoothing, "Pre-contouring filter")?;
            line!(
                "field_to_meters     = {}",
                self.field_to_meters,
                "Field unit to meters"
            )?;
            line!(
                "overlap_tolerance   = {:.3}",
                self.overlap_tolerance,
                "Max shared fraction between eddies"
            )?;
            line!(
                "center_method       = {:?}",
                self.center_method,
                "Eddy center estimate"
            )?;
            line!("level_order         = {:?}", self.level_order, "Collapse order")?;
            line!("n_rays              = {}", self.n_rays, "Speed-radius rays")?;
            line!(
                "boundary_padding    = {}",
                self.boundary_padding,
                "Stripped border cells"
            )?;

            writeln!(f, "[Tracking]")?;
            line!(
                "days_between_records = {}",
                self.days_between_records,
                "Time step (d)"
            )?;
            line!(
                "missed_frame_budget = {}",
                self.missed_frame_budget,
                "Misses before closure"
            )?;
            line!(
                "cost_weights        = {}",
                format!(
                    "d={} a={} r={} c={}",
                    self.cost_weights.distance,
                    self.cost_weights.amplitude,
                    self.cost_weights.radius,
                    self.cost_weights.correlation
                ),
                "Association cost weights"
            )?;
            line!(
                "shape_correlation   = {}",
                self.use_shape_correlation,
                "Enclosed-field correlation term"
            )?;
            line!(
                "latitude_scaling    = {}",
                self.ellipse_latitude_scaling,
                "Metric search ellipse"
            )?;
            Ok(())
        } else {
            write!(
                f,
                "EddyConfig(domain={}, diag={}, levels={}, R=[{}, {}] deg, amp0={}, shape<={}%, dt={} d, budget={})",
                self.domain,
                self.diagnostic,
                levels,
                self.radius_min,
                self.radius_max,
                self.amp0,
                self.max_shape_error,
                self.days_between_records,
                self.missed_frame_budget,
            )
        }
    }
}
