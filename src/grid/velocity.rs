//! Geostrophic velocity derived from a sea-surface-height field.
//!
//! With `η` the field in meters, `f = 2Ω sin(φ)` and `g` the gravity:
//!
//! ```text
//! u = -g/f ∂η/∂y        v = g/f ∂η/∂x
//! dx = R cos(φ) dλ      dy = R dφ
//! ```
//!
//! Derivatives use central differences in the interior and one-sided differences at the
//! edges; on periodic grids the longitude derivative wraps around the seam. Any `NaN` in a
//! stencil yields `NaN`, and so does `|f| < CORIOLIS_MIN` near the equator.
//!
//! The relative vorticity `ζ = ∂v/∂x - ∂u/∂y` and the eddy kinetic energy `½(u² + v²)` are
//! derived in the same pass.
use nalgebra::DMatrix;

use crate::constants::{
    coriolis, wrap_lon_delta, CORIOLIS_MIN, EARTH_RADIUS, EPS, GRAVITY, RADEG,
};

use super::GridField;

/// Velocity diagnostics of one frame, all of the grid shape.
#[derive(Debug, Clone)]
pub struct VelocityField {
    /// Zonal velocity (m/s).
    pub u: DMatrix<f64>,
    /// Meridional velocity (m/s).
    pub v: DMatrix<f64>,
    /// `sqrt(u² + v²)` (m/s).
    pub speed: DMatrix<f64>,
    /// Relative vorticity (1/s).
    pub vorticity: DMatrix<f64>,
    /// Eddy kinetic energy per unit mass (m²/s²).
    pub eke: DMatrix<f64>,
}

impl GridField {
    /// Neighbour pair and metric length (m) of the zonal stencil at `(i, j)`.
    fn zonal_stencil(&self, i: usize, j: usize) -> Option<(usize, usize, f64)> {
        let nx = self.nx();
        if nx < 2 {
            return None;
        }
        let lon = self.lon();
        let (a, b) = if self.is_periodic() {
            ((i + nx - 1) % nx, (i + 1) % nx)
        } else if i == 0 {
            (0, 1)
        } else if i == nx - 1 {
            (nx - 2, nx - 1)
        } else {
            (i - 1, i + 1)
        };
        let mut dlon = lon[b] - lon[a];
        if self.is_periodic() {
            dlon = wrap_lon_delta(dlon);
            if dlon <= 0.0 {
                dlon += 360.0;
            }
        }
        let dx = EARTH_RADIUS * (self.lat()[j] * RADEG).cos() * dlon * RADEG;
        (dx.abs() > EPS).then_some((a, b, dx))
    }

    /// Neighbour pair and metric length (m) of the meridional stencil at row `j`.
    fn meridional_stencil(&self, j: usize) -> Option<(usize, usize, f64)> {
        let ny = self.ny();
        if ny < 2 {
            return None;
        }
        let (a, b) = if j == 0 {
            (0, 1)
        } else if j == ny - 1 {
            (ny - 2, ny - 1)
        } else {
            (j - 1, j + 1)
        };
        Some((a, b, EARTH_RADIUS * (self.lat()[b] - self.lat()[a]) * RADEG))
    }

    /// `∂field/∂x` in field units per meter.
    pub fn d_dx(&self, field: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(self.nx(), self.ny(), |i, j| {
            self.zonal_stencil(i, j)
                .map_or(f64::NAN, |(a, b, dx)| (field[(b, j)] - field[(a, j)]) / dx)
        })
    }

    /// `∂field/∂y` in field units per meter.
    pub fn d_dy(&self, field: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(self.nx(), self.ny(), |i, j| {
            self.meridional_stencil(j)
                .map_or(f64::NAN, |(a, b, dy)| (field[(i, b)] - field[(i, a)]) / dy)
        })
    }

    /// Derive the geostrophic velocity of the masked field.
    ///
    /// Arguments
    /// -----------------
    /// * `scale_to_meters`: factor converting field units to meters (`0.01` for centimeters).
    ///
    /// Return
    /// ----------
    /// * A [`VelocityField`]; undefined cells are `NaN`, this never fails.
    pub fn derive_velocity(&self, scale_to_meters: f64) -> VelocityField {
        let eta = self.values() * scale_to_meters;
        let deta_dx = self.d_dx(&eta);
        let deta_dy = self.d_dy(&eta);

        let g_over_f: Vec<f64> = self
            .lat()
            .iter()
            .map(|&lat| {
                let f = coriolis(lat);
                if f.abs() < CORIOLIS_MIN {
                    f64::NAN
                } else {
                    GRAVITY / f
                }
            })
            .collect();

        let u = DMatrix::from_fn(self.nx(), self.ny(), |i, j| -g_over_f[j] * deta_dy[(i, j)]);
        let v = DMatrix::from_fn(self.nx(), self.ny(), |i, j| g_over_f[j] * deta_dx[(i, j)]);
        let speed = u.zip_map(&v, |a, b| a.hypot(b));
        let eke = u.zip_map(&v, |a, b| 0.5 * (a * a + b * b));
        let vorticity = self.d_dx(&v) - self.d_dy(&u);

        VelocityField {
            u,
            v,
            speed,
            vorticity,
            eke,
        }
    }
}
