//! Speed-based radius of an eddy.
//!
//! From the eddy center, `n_rays` rays are cast at evenly spaced azimuths. Along them the
//! rotational speed is sampled by bilinear interpolation at radii `r_m = m · Δr`
//! (`Δr` = half a pixel, `m = 1, 2, ...`) up to the effective radius. For each radius the
//! finite samples are averaged over the rays; the radius of the largest mean is the speed
//! radius and that mean the maximum speed.
//!
//! When no sample is finite (near-equatorial eddies, masked surroundings) the speed radius
//! falls back to the effective radius and the maximum speed is `NaN`.
use crate::{
    constants::{Meter, MeterPerSecond, DPI, METERS_PER_DEGREE},
    contour::geometry::LocalProjection,
    grid::{GridField, InterpMethod},
};

/// Speed radius and maximum mean speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwirlProfile {
    pub speed_radius: Meter,
    pub max_speed: MeterPerSecond,
}

/// Sample the speed profile around `(center_lon, center_lat)`.
///
/// Arguments
/// -----------------
/// * `grid`: the frame, providing geometry and mask.
/// * `speed`: grid-shaped speed field (m/s).
/// * `center_lon`, `center_lat`: eddy center (degrees).
/// * `effective_radius`: outer sampling radius (m).
/// * `n_rays`: number of azimuths.
pub fn speed_profile(
    grid: &GridField,
    speed: &nalgebra::DMatrix<f64>,
    center_lon: f64,
    center_lat: f64,
    effective_radius: Meter,
    n_rays: usize,
) -> SwirlProfile {
    let fallback = SwirlProfile {
        speed_radius: effective_radius,
        max_speed: f64::NAN,
    };
    let step = 0.5 * grid.resolution() * METERS_PER_DEGREE;
    if !(step > 0.0 && effective_radius.is_finite()) || n_rays == 0 {
        return fallback;
    }

    let proj = LocalProjection::new(center_lon, center_lat);
    let directions: Vec<(f64, f64)> = (0..n_rays)
        .map(|k| {
            let theta = DPI * k as f64 / n_rays as f64;
            (theta.cos(), theta.sin())
        })
        .collect();

    let n_steps = (effective_radius / step).floor() as usize;
    let mut best: Option<SwirlProfile> = None;
    for m in 1..=n_steps {
        let r = m as f64 * step;
        let (sum, count) = directions
            .iter()
            .map(|&(c, s)| {
                let (lon, lat) = proj.inverse(r * c, r * s);
                grid.interpolate(speed, lon, lat, InterpMethod::Bilinear)
            })
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(acc, n), v| (acc + v, n + 1));
        if count == 0 {
            continue;
        }
        let mean = sum / count as f64;
        if best.map_or(true, |b| mean > b.max_speed) {
            best = Some(SwirlProfile {
                speed_radius: r,
                max_speed: mean,
            });
        }
    }
    best.unwrap_or(fallback)
}
