//! Planar polygon geometry used by [`super::Contour`].
//!
//! Contours are projected onto a local equirectangular plane (meters) around a reference
//! point before any metric computation:
//!
//! ```text
//! x = R cos(φ0) (λ - λ0)      y = R (φ - φ0)
//! ```
//!
//! Polygons are given as open vertex rings (the closing duplicate removed).
use nalgebra::{Matrix3, Vector3};

use crate::constants::{wrap_lon_delta, EARTH_RADIUS, RADEG};

pub type Point = (f64, f64);

/// Local tangent-plane projection centered on `(lon0, lat0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    pub lon0: f64,
    pub lat0: f64,
    cos_lat0: f64,
}

impl LocalProjection {
    pub fn new(lon0: f64, lat0: f64) -> Self {
        LocalProjection {
            lon0,
            lat0,
            cos_lat0: (lat0 * RADEG).cos(),
        }
    }

    /// Degrees to meters.
    #[inline]
    pub fn forward(&self, lon: f64, lat: f64) -> Point {
        (
            EARTH_RADIUS * self.cos_lat0 * wrap_lon_delta(lon - self.lon0) * RADEG,
            EARTH_RADIUS * (lat - self.lat0) * RADEG,
        )
    }

    /// Meters to degrees; longitudes are continuous around `lon0`.
    #[inline]
    pub fn inverse(&self, x: f64, y: f64) -> Point {
        (
            self.lon0 + x / (EARTH_RADIUS * self.cos_lat0) / RADEG,
            self.lat0 + y / EARTH_RADIUS / RADEG,
        )
    }
}

#[inline]
fn cross(a: Point, b: Point) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

#[inline]
fn dot(a: Point, b: Point) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

#[inline]
fn sub(a: Point, b: Point) -> Point {
    (a.0 - b.0, a.1 - b.1)
}

/// Signed shoelace area (positive for counter-clockwise rings).
pub fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    0.5 * (0..n).map(|k| cross(ring[k], ring[(k + 1) % n])).sum::<f64>()
}

/// Even-odd point-in-polygon test.
pub fn contains_point(ring: &[Point], p: Point) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > p.1) != (yj > p.1) && p.0 < (xj - xi) * (p.1 - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    cross(sub(b, a), sub(c, a))
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Whether segments `[a, b]` and `[c, d]` share at least one point.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    if ((o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0))
        && ((o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0))
    {
        return true;
    }
    (o1 == 0.0 && on_segment(a, b, c))
        || (o2 == 0.0 && on_segment(a, b, d))
        || (o3 == 0.0 && on_segment(c, d, a))
        || (o4 == 0.0 && on_segment(c, d, b))
}

/// Drop zero-length edges of an open ring, the wrap-around one included.
///
/// Vertices closer than `eps` on both axes are merged into the first of them.
pub fn drop_repeated_vertices(ring: &mut Vec<Point>, eps: f64) {
    let same = |a: &Point, b: &Point| (a.0 - b.0).abs() <= eps && (a.1 - b.1).abs() <= eps;
    ring.dedup_by(|b, a| same(&*a, &*b));
    while ring.len() > 1 && same(&ring[0], &ring[ring.len() - 1]) {
        ring.pop();
    }
}

/// Whether two non-adjacent edges of the ring intersect.
///
/// Edges are swept by increasing `x_min` so only pairs with overlapping `x` extents are
/// tested.
pub fn is_self_intersecting(ring: &[Point]) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }
    let mut edges: Vec<(usize, f64, f64)> = (0..n)
        .map(|k| {
            let (a, b) = (ring[k], ring[(k + 1) % n]);
            (k, a.0.min(b.0), a.0.max(b.0))
        })
        .collect();
    edges.sort_by(|l, r| l.1.total_cmp(&r.1));

    for (pos, &(k, _, xmax)) in edges.iter().enumerate() {
        for &(m, xmin_other, _) in &edges[pos + 1..] {
            if xmin_other > xmax {
                break;
            }
            let adjacent = k.abs_diff(m) == 1 || k.abs_diff(m) == n - 1;
            if adjacent {
                continue;
            }
            if segments_intersect(ring[k], ring[(k + 1) % n], ring[m], ring[(m + 1) % n]) {
                return true;
            }
        }
    }
    false
}

/// Algebraic least-squares circle through `points`: returns `(xc, yc, r)`.
///
/// Minimises `Σ (x² + y² + D x + E y + F)²` through its 3×3 normal equations.
/// `None` when the system is singular (fewer than three non-collinear points).
pub fn fit_circle_ls(points: &[Point]) -> Option<(f64, f64, f64)> {
    if points.len() < 3 {
        return None;
    }
    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for &(x, y) in points {
        let row = Vector3::new(x, y, 1.0);
        let rhs = -(x * x + y * y);
        ata += row * row.transpose();
        atb += row * rhs;
    }
    let inv = ata.try_inverse()?;
    let sol = inv * atb;
    let (xc, yc) = (-sol[0] / 2.0, -sol[1] / 2.0);
    let r2 = xc * xc + yc * yc - sol[2];
    (r2 > 0.0 && r2.is_finite()).then(|| (xc, yc, r2.sqrt()))
}

/// Signed area of the intersection between triangle `(O, a, b)` and the disc of radius `r`
/// centered at the origin `O`.
fn triangle_disc_area(a: Point, b: Point, r: f64) -> f64 {
    let sector = |u: Point, v: Point| 0.5 * r * r * cross(u, v).atan2(dot(u, v));

    let d = sub(b, a);
    let qa = dot(d, d);
    if qa == 0.0 {
        return 0.0;
    }
    let qb = 2.0 * dot(a, d);
    let qc = dot(a, a) - r * r;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc <= 0.0 {
        return sector(a, b);
    }
    let s = disc.sqrt();
    let t1 = (-qb - s) / (2.0 * qa);
    let t2 = (-qb + s) / (2.0 * qa);
    if t2 <= 0.0 || t1 >= 1.0 {
        return sector(a, b);
    }
    let at = |t: f64| (a.0 + t * d.0, a.1 + t * d.1);
    let p1 = at(t1.max(0.0));
    let p2 = at(t2.min(1.0));
    sector(a, p1) + 0.5 * cross(p1, p2) + sector(p2, b)
}

/// Area of the intersection between a simple polygon and a disc.
pub fn polygon_disc_intersection(ring: &[Point], center: Point, r: f64) -> f64 {
    let n = ring.len();
    let local: Vec<Point> = ring.iter().map(|&p| sub(p, center)).collect();
    let total: f64 = (0..n)
        .map(|k| triangle_disc_area(local[k], local[(k + 1) % n], r))
        .sum();
    total.abs()
}
