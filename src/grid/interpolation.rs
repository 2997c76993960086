//! Point interpolation on a [`GridField`].
//!
//! Cells are centered on the axis coordinates. Axes may be non-uniform: a query position is
//! first converted into a *fractional index* by locating its bracketing axis interval, and
//! positions outside the axis are extrapolated with the spacing of the edge interval.
//!
//! * [`InterpMethod::Nearest`] rounds the fractional index half-to-even. The query must
//!   fall within the half-cell extended bounds of the grid and the selected cell must be
//!   valid, otherwise the result is `NaN`.
//! * [`InterpMethod::Bilinear`] needs the query inside the axis hull and all four
//!   surrounding cells valid, otherwise the result is `NaN` (even where `Nearest` succeeds).
//!
//! On periodic grids the longitude is first folded onto `[lon[0], lon[0] + 360)` and the
//! interval between the last and the first column is used across the seam.
use nalgebra::DMatrix;

use super::GridField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpMethod {
    Nearest,
    #[default]
    Bilinear,
}

/// Fractional index of `x` on a strictly increasing, non-periodic axis.
fn fractional_index(axis: &[f64], x: f64, fallback_step: f64) -> f64 {
    let n = axis.len();
    if n == 1 {
        return (x - axis[0]) / fallback_step;
    }
    let k = axis.partition_point(|&a| a <= x).saturating_sub(1).min(n - 2);
    k as f64 + (x - axis[k]) / (axis[k + 1] - axis[k])
}

/// Nearest cell index from a fractional index, `None` outside `[0, n)`.
fn nearest_index(fi: f64, n: usize) -> Option<usize> {
    let r = fi.round_ties_even();
    (r >= 0.0 && r < n as f64).then_some(r as usize)
}

/// Lower bracketing index and weight of the upper neighbour, `None` outside the hull.
fn bracket(fi: f64, n: usize) -> Option<(usize, f64)> {
    if n < 2 || !(fi >= 0.0 && fi <= (n - 1) as f64) {
        return None;
    }
    let k = (fi.floor() as usize).min(n - 2);
    Some((k, fi - k as f64))
}

impl GridField {
    /// Fractional longitude index; on periodic grids the result lies in `[0, nx)`.
    pub(crate) fn lon_fractional_index(&self, lon: f64) -> f64 {
        let axis = self.lon();
        if !self.is_periodic() {
            return fractional_index(axis, lon, self.resolution());
        }
        let first = axis[0];
        let last = axis[axis.len() - 1];
        let folded = first + (lon - first).rem_euclid(360.0);
        if folded <= last {
            fractional_index(axis, folded, self.resolution())
        } else {
            (axis.len() - 1) as f64 + (folded - last) / (first + 360.0 - last)
        }
    }

    /// Fractional latitude index.
    pub(crate) fn lat_fractional_index(&self, lat: f64) -> f64 {
        fractional_index(self.lat(), lat, self.resolution())
    }

    /// Cell containing the position `(lon, lat)` for the `Nearest` rule, if any.
    pub fn nearest_cell(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        if !(lon.is_finite() && lat.is_finite()) {
            return None;
        }
        let fi = self.lon_fractional_index(lon);
        let i = if self.is_periodic() {
            Some(fi.round_ties_even() as usize % self.nx())
        } else {
            nearest_index(fi, self.nx())
        }?;
        let j = nearest_index(self.lat_fractional_index(lat), self.ny())?;
        Some((i, j))
    }

    /// Interpolate `field` (grid shaped, `NaN` on invalid cells) at `(lon, lat)`.
    ///
    /// Arguments
    /// -----------------
    /// * `field`: a grid-shaped field, typically [`GridField::values`] or a velocity component.
    /// * `lon`, `lat`: query position in degrees.
    /// * `method`: [`InterpMethod::Nearest`] or [`InterpMethod::Bilinear`].
    ///
    /// Return
    /// ----------
    /// * The interpolated value, or `NaN` when the position is outside the valid region.
    pub fn interpolate(&self, field: &DMatrix<f64>, lon: f64, lat: f64, method: InterpMethod) -> f64 {
        if !(lon.is_finite() && lat.is_finite()) {
            return f64::NAN;
        }
        match method {
            InterpMethod::Nearest => match self.nearest_cell(lon, lat) {
                Some((i, j)) if !self.mask()[(i, j)] => field[(i, j)],
                _ => f64::NAN,
            },
            InterpMethod::Bilinear => self.bilinear(field, lon, lat),
        }
    }

    /// Interpolate the grid's own masked values.
    #[inline]
    pub fn interpolate_value(&self, lon: f64, lat: f64, method: InterpMethod) -> f64 {
        self.interpolate(self.values(), lon, lat, method)
    }

    fn bilinear(&self, field: &DMatrix<f64>, lon: f64, lat: f64) -> f64 {
        let fi = self.lon_fractional_index(lon);
        let (i0, i1, tx) = if self.is_periodic() && fi > (self.nx() - 1) as f64 {
            (self.nx() - 1, 0, fi - (self.nx() - 1) as f64)
        } else {
            match bracket(fi, self.nx()) {
                Some((k, t)) => (k, k + 1, t),
                None => return f64::NAN,
            }
        };
        let Some((j0, ty)) = bracket(self.lat_fractional_index(lat), self.ny()) else {
            return f64::NAN;
        };
        let j1 = j0 + 1;

        let corners = [
            (i0, j0, (1.0 - tx) * (1.0 - ty)),
            (i0, j1, (1.0 - tx) * ty),
            (i1, j0, tx * (1.0 - ty)),
            (i1, j1, tx * ty),
        ];
        let mut acc = 0.0;
        for (i, j, w) in corners {
            let v = field[(i, j)];
            if self.mask()[(i, j)] || v.is_nan() {
                return f64::NAN;
            }
            acc += w * v;
        }
        acc
    }
}

#[cfg(test)]
mod interpolation_test {
    use super::*;

    fn fixture() -> GridField {
        // z[i_lon][j_lat] = ((0, 1), (2, 3))
        let values = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        GridField::new(
            vec![0.0, 20.0],
            vec![0.0, 10.0],
            values,
            DMatrix::from_element(2, 2, false),
            f64::NAN,
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_fixture() {
        let g = fixture();
        assert_eq!(g.interpolate_value(10.0, 5.0, InterpMethod::Nearest), 0.0);
        assert_eq!(g.interpolate_value(15.0, 5.0, InterpMethod::Nearest), 2.0);
        assert_eq!(g.interpolate_value(25.0, 5.0, InterpMethod::Nearest), 2.0);
        assert!(g.interpolate_value(25.0, 16.0, InterpMethod::Nearest).is_nan());
        assert!(g.interpolate_value(55.0, 25.0, InterpMethod::Nearest).is_nan());
    }

    #[test]
    fn test_bilinear_fixture() {
        let g = fixture();
        assert_eq!(g.interpolate_value(10.0, 5.0, InterpMethod::Bilinear), 1.5);
        assert_eq!(g.interpolate_value(15.0, 5.0, InterpMethod::Bilinear), 2.0);
        assert!(g.interpolate_value(25.0, 5.0, InterpMethod::Bilinear).is_nan());
    }

    #[test]
    fn test_bilinear_needs_four_valid_corners() {
        let values = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let mut mask = DMatrix::from_element(2, 2, false);
        mask[(1, 1)] = true;
        let g = GridField::new(vec![0.0, 20.0], vec![0.0, 10.0], values, mask, f64::NAN).unwrap();
        assert!(g.interpolate_value(1.0, 1.0, InterpMethod::Bilinear).is_nan());
        assert_eq!(g.interpolate_value(1.0, 1.0, InterpMethod::Nearest), 0.0);
    }

    #[test]
    fn test_non_uniform_axis() {
        let values = DMatrix::from_fn(3, 2, |i, _| [0.0, 1.0, 5.0][i]);
        let g = GridField::new(
            vec![0.0, 1.0, 3.0],
            vec![0.0, 1.0],
            values,
            DMatrix::from_element(3, 2, false),
            f64::NAN,
        )
        .unwrap();
        assert_eq!(g.interpolate_value(2.0, 0.5, InterpMethod::Bilinear), 3.0);
        assert_eq!(g.interpolate_value(2.5, 0.5, InterpMethod::Nearest), 5.0);
    }

    #[test]
    fn test_periodic_seam() {
        let lon: Vec<f64> = (0..4).map(|i| i as f64 * 90.0).collect();
        let values = DMatrix::from_fn(4, 2, |i, _| i as f64);
        let g = GridField::new(
            lon,
            vec![0.0, 1.0],
            values,
            DMatrix::from_element(4, 2, false),
            f64::NAN,
        )
        .unwrap();
        assert!(g.is_periodic());
        // halfway between lon 270 (value 3) and lon 360 == 0 (value 0)
        assert_eq!(g.interpolate_value(315.0, 0.5, InterpMethod::Bilinear), 1.5);
        assert_eq!(g.interpolate_value(-45.0, 0.5, InterpMethod::Bilinear), 1.5);
        assert_eq!(g.interpolate_value(350.0, 0.0, InterpMethod::Nearest), 0.0);
    }
}
