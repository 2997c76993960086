//! # Gridded scalar fields
//!
//! [`GridField`] wraps one frame of a 2D scalar field (SLA, Q, ...) on a longitude/latitude
//! grid and exposes everything the identification stage needs from it:
//!
//! - masking of land / invalid cells ([`GridField::apply_mask`]),
//! - geostrophic velocity derivation ([`velocity`]),
//! - nearest and bilinear interpolation ([`interpolation`]),
//! - a one-shot smoothing cache driven by a pluggable [`filter::FieldFilter`].
//!
//! Layout
//! -----------------
//! Values are stored in a [`DMatrix<f64>`] of shape `(nx, ny)` indexed `(i_lon, j_lat)`.
//! The longitude and latitude axes are strictly increasing and may be non-uniform.
//! Cells are centered on their axis coordinates. Invalid cells hold `NaN` once masked.
//!
//! Flat pixel indices follow the column-major storage of `nalgebra`: `k = i + j * nx`.
//!
//! See also
//! ------------
//! * [`crate::contour::extraction`] – marching squares over a [`GridField`].
//! * [`crate::identification::evaluator`] – consumer of the interpolation and velocity API.
use nalgebra::DMatrix;
use tracing::debug;

use crate::eddy_errors::EddyError;

pub mod filter;
pub mod interpolation;
pub mod velocity;

pub use filter::FieldFilter;
pub use interpolation::InterpMethod;
pub use velocity::VelocityField;

/// One frame of a scalar field on a geographic grid.
#[derive(Debug, Clone)]
pub struct GridField {
    lon: Vec<f64>,
    lat: Vec<f64>,
    values: DMatrix<f64>,
    mask: DMatrix<bool>,
    fill_value: f64,
    resolution: f64,
    periodic: bool,
    filtered: bool,
}

fn strictly_increasing(axis: &[f64]) -> bool {
    !axis.is_empty()
        && axis.iter().all(|x| x.is_finite())
        && axis.windows(2).all(|w| w[0] < w[1])
}

fn mean_step(axis: &[f64]) -> Option<f64> {
    (axis.len() > 1).then(|| (axis[axis.len() - 1] - axis[0]) / (axis.len() - 1) as f64)
}

impl GridField {
    /// Build a grid and mask its values.
    ///
    /// Arguments
    /// -----------------
    /// * `lon`: longitude axis (degrees, strictly increasing, length `nx`).
    /// * `lat`: latitude axis (degrees, strictly increasing, length `ny`).
    /// * `values`: raw field of shape `(nx, ny)`.
    /// * `mask`: `true` on land / invalid cells, same shape as `values`.
    /// * `fill_value`: sentinel marking missing data in `values`.
    ///
    /// Return
    /// ----------
    /// * The grid with every masked, non-finite or fill-valued cell set to `NaN`.
    /// * [`EddyError::InvalidAxis`] or [`EddyError::ShapeMismatch`] on inconsistent inputs.
    pub fn new(
        lon: Vec<f64>,
        lat: Vec<f64>,
        values: DMatrix<f64>,
        mask: DMatrix<bool>,
        fill_value: f64,
    ) -> Result<Self, EddyError> {
        if !strictly_increasing(&lon) {
            return Err(EddyError::InvalidAxis("lon"));
        }
        if !strictly_increasing(&lat) {
            return Err(EddyError::InvalidAxis("lat"));
        }
        let expected = (lon.len(), lat.len());
        if values.shape() != expected {
            return Err(EddyError::ShapeMismatch {
                expected,
                found: values.shape(),
            });
        }
        if mask.shape() != expected {
            return Err(EddyError::ShapeMismatch {
                expected,
                found: mask.shape(),
            });
        }

        let dlon = mean_step(&lon);
        let dlat = mean_step(&lat);
        let resolution = match (dlon, dlat) {
            (Some(a), Some(b)) => (a * b).sqrt(),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => 1.0,
        };
        let periodic = dlon.is_some_and(|d| {
            let span = lon[lon.len() - 1] - lon[0] + d;
            (span - 360.0).abs() < 0.5 * d
        });

        let mut grid = GridField {
            lon,
            lat,
            values: DMatrix::zeros(expected.0, expected.1),
            mask,
            fill_value,
            resolution,
            periodic,
            filtered: false,
        };
        grid.values = grid.apply_mask(&values);
        debug!(
            nx = expected.0,
            ny = expected.1,
            resolution,
            periodic,
            "grid field built"
        );
        Ok(grid)
    }

    /// Return a copy of `field` where every masked, non-finite or fill-valued cell is `NaN`.
    ///
    /// `field` must have the grid shape; extra rows or columns are ignored and missing
    /// ones are treated as invalid.
    pub fn apply_mask(&self, field: &DMatrix<f64>) -> DMatrix<f64> {
        let (nx, ny) = self.shape();
        DMatrix::from_fn(nx, ny, |i, j| {
            let masked = self.mask[(i, j)];
            match field.get((i, j)) {
                Some(&v) if !masked && v.is_finite() && v != self.fill_value => v,
                _ => f64::NAN,
            }
        })
    }

    /// Run `filter` once on the masked field and cache the result in place.
    ///
    /// Subsequent calls are no-ops. Cells that were invalid before filtering stay invalid.
    pub fn apply_filter(&mut self, filter: &dyn FieldFilter) -> Result<(), EddyError> {
        if self.filtered {
            return Ok(());
        }
        let out = filter.filter(&self.values, self);
        if out.shape() != self.shape() {
            return Err(EddyError::FilterShape(out.shape()));
        }
        let mut masked = self.apply_mask(&out);
        masked
            .iter_mut()
            .zip(self.values.iter())
            .filter(|(_, old)| old.is_nan())
            .for_each(|(new, _)| *new = f64::NAN);
        self.values = masked;
        self.filtered = true;
        debug!(kind = %filter.kind(), "field filter applied");
        Ok(())
    }

    /// Whether a filter has already been applied to this grid.
    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Masked field values (`NaN` on invalid cells).
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn mask(&self) -> &DMatrix<bool> {
        &self.mask
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    /// Mean grid spacing in degrees per pixel, `sqrt(dlon * dlat)`.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Whether the longitude axis covers the full circle.
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.lon.len()
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.lat.len()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nx(), self.ny())
    }

    #[inline]
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    #[inline]
    pub fn is_valid(&self, i: usize, j: usize) -> bool {
        !self.values[(i, j)].is_nan()
    }

    /// Flat index of cell `(i, j)`.
    #[inline]
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        i + j * self.nx()
    }

    /// Inverse of [`GridField::flat_index`].
    #[inline]
    pub fn unflatten(&self, k: usize) -> (usize, usize) {
        (k % self.nx(), k / self.nx())
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}
