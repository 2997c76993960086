//! # Closed contours
//!
//! A [`Contour`] is a closed polygon of the field at one level, produced by
//! [`extraction::extract`]. Vertices are stored as two parallel vectors `lon` / `lat`
//! whose first and last entries are equal.
//!
//! Longitudes along a contour are continuous: a contour crossing the seam of a periodic
//! grid may carry values beyond the axis range (e.g. `360.4`), and every grid lookup folds
//! them back.
//!
//! Derived quantities
//! -----------------
//! * [`Contour::mean_coordinates`] – vertex mean, closing duplicate excluded.
//! * [`Contour::fit_circle`] – least-squares circle and Kurian area error.
//! * [`Contour::pixels_in`] – grid cells whose center lies inside the polygon.
//! * [`Contour::bbox_slice`] – index window of the grid covering the polygon.
use crate::grid::GridField;

pub mod extraction;
pub mod geometry;

use geometry::{
    contains_point, fit_circle_ls, polygon_disc_intersection, signed_area, LocalProjection, Point,
};

/// Least-squares circle fitted to a contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    pub center_lon: f64,
    pub center_lat: f64,
    /// Radius in meters.
    pub radius: f64,
    /// Kurian area error in percent: `100 (A_contour + A_circle - 2 A_∩) / A_circle`.
    pub error: f64,
}

/// Half-open window of grid indices.
///
/// `i_end` may exceed `nx` on periodic grids; [`IndexWindow::lon_indices`] folds the
/// indices back onto the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    pub i_start: usize,
    pub i_end: usize,
    pub j_start: usize,
    pub j_end: usize,
    nx: usize,
}

impl IndexWindow {
    pub fn lon_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (self.i_start..self.i_end).map(move |i| i % self.nx)
    }

    pub fn lat_indices(&self) -> std::ops::Range<usize> {
        self.j_start..self.j_end
    }

    pub fn wraps(&self) -> bool {
        self.i_end > self.nx
    }

    pub fn is_empty(&self) -> bool {
        self.i_start >= self.i_end || self.j_start >= self.j_end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    level: f64,
    lon: Vec<f64>,
    lat: Vec<f64>,
}

impl Contour {
    /// Build a contour from its vertices, closing the ring if needed.
    pub fn new(level: f64, vertices: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let (mut lon, mut lat): (Vec<f64>, Vec<f64>) = vertices.into_iter().unzip();
        if let (Some(&lo), Some(&la)) = (lon.first(), lat.first()) {
            if lon.last() != Some(&lo) || lat.last() != Some(&la) || lon.len() == 1 {
                lon.push(lo);
                lat.push(la);
            }
        }
        Contour { level, lon, lat }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Number of vertices, closing vertex included.
    pub fn len(&self) -> usize {
        self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lon.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.len() > 1 && self.lon.first() == self.lon.last() && self.lat.first() == self.lat.last()
    }

    /// Vertices without the closing duplicate.
    pub fn ring(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let n = self.len().saturating_sub(1);
        self.lon[..n].iter().copied().zip(self.lat[..n].iter().copied())
    }

    /// Mean `(lon, lat)` of the vertices, closing vertex excluded.
    pub fn mean_coordinates(&self) -> (f64, f64) {
        let n = self.len().saturating_sub(1).max(1) as f64;
        let (slon, slat) = self
            .ring()
            .fold((0.0, 0.0), |(a, b), (lo, la)| (a + lo, b + la));
        (slon / n, slat / n)
    }

    /// Longitude / latitude extent `(lon_min, lon_max, lat_min, lat_max)`.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let fold = |v: &[f64]| {
            v.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
        };
        let (lon_min, lon_max) = fold(&self.lon);
        let (lat_min, lat_max) = fold(&self.lat);
        (lon_min, lon_max, lat_min, lat_max)
    }

    fn projected_ring(&self, proj: &LocalProjection) -> Vec<Point> {
        self.ring().map(|(lo, la)| proj.forward(lo, la)).collect()
    }

    /// Polygon area in square meters.
    pub fn area(&self) -> f64 {
        let (lon0, lat0) = self.mean_coordinates();
        signed_area(&self.projected_ring(&LocalProjection::new(lon0, lat0))).abs()
    }

    /// Fit a circle to the vertices by least squares.
    ///
    /// The vertices are projected on a local plane centered on
    /// [`Contour::mean_coordinates`]. The returned center is expressed back in degrees and
    /// the radius in meters. The error is the Kurian area mismatch between polygon and
    /// circle relative to the circle area, in percent.
    ///
    /// Return
    /// ----------
    /// * `None` for degenerate contours (fewer than three distinct, non-collinear vertices).
    pub fn fit_circle(&self) -> Option<CircleFit> {
        let (lon0, lat0) = self.mean_coordinates();
        let proj = LocalProjection::new(lon0, lat0);
        let ring = self.projected_ring(&proj);

        let (xc, yc, r) = fit_circle_ls(&ring)?;
        let (center_lon, center_lat) = proj.inverse(xc, yc);

        let poly_area = signed_area(&ring).abs();
        let circle_area = std::f64::consts::PI * r * r;
        let inter = polygon_disc_intersection(&ring, (xc, yc), r);
        let error = 100.0 * (poly_area + circle_area - 2.0 * inter) / circle_area;

        Some(CircleFit {
            center_lon,
            center_lat,
            radius: r,
            error: error.max(0.0),
        })
    }

    /// Index window of `grid` covering the contour extent.
    ///
    /// The window spans `floor(min)..ceil(max) + 1` in fractional index space, clamped to the
    /// axes. On periodic grids the longitude start is folded into `[0, nx)` and the end may
    /// run past `nx`.
    pub fn bbox_slice(&self, grid: &GridField) -> IndexWindow {
        let nx = grid.nx();
        let (lon_min, lon_max, lat_min, lat_max) = self.extent();
        let clamp = |x: f64, n: usize| x.clamp(0.0, n as f64) as usize;

        let (i_start, i_end) = if grid.is_periodic() {
            let start = grid.lon_fractional_index(lon_min).floor();
            let width = lon_max - lon_min;
            let span_end = grid.lon_fractional_index(lon_max);
            let mut end = span_end;
            if end < start || width >= 180.0 {
                end += nx as f64;
            }
            let start = clamp(start, nx);
            let end = (end.ceil() as usize + 1).min(start + nx);
            (start, end)
        } else {
            (
                clamp(grid.lon_fractional_index(lon_min).floor(), nx),
                clamp(grid.lon_fractional_index(lon_max).ceil() + 1.0, nx),
            )
        };
        let ny = grid.ny();
        IndexWindow {
            i_start,
            i_end,
            j_start: clamp(grid.lat_fractional_index(lat_min).floor(), ny),
            j_end: clamp(grid.lat_fractional_index(lat_max).ceil() + 1.0, ny),
            nx,
        }
    }

    /// Flat indices (see [`GridField::flat_index`]) of the grid cells whose center lies
    /// inside the contour, in increasing order. Masked cells are included.
    pub fn pixels_in(&self, grid: &GridField) -> Vec<usize> {
        let ring: Vec<Point> = self.ring().collect();
        if ring.len() < 3 {
            return Vec::new();
        }
        let window = self.bbox_slice(grid);
        let (lon_min, lon_max, _, _) = self.extent();
        let mid = 0.5 * (lon_min + lon_max);

        let mut pixels = Vec::new();
        for j in window.lat_indices() {
            let lat = grid.lat()[j];
            for i in window.lon_indices() {
                let mut lon = grid.lon()[i];
                if grid.is_periodic() {
                    lon += 360.0 * ((mid - lon) / 360.0).round();
                }
                if contains_point(&ring, (lon, lat)) {
                    pixels.push(grid.flat_index(i, j));
                }
            }
        }
        pixels.sort_unstable();
        pixels.dedup();
        pixels
    }
}
