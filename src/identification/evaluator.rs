//! # Contour admissibility
//!
//! [`evaluate`] applies the eddy tests to one contour, in order, stopping at the first
//! failure:
//!
//! 1. **Size** – the number of valid enclosed pixels lies in `[PIXMIN, PIXMAX]`
//!    (see [`crate::config::EddyConfig::pixel_bounds`]).
//! 2. **Shape** – the Kurian error of the least-squares circle is at most
//!    `max_shape_error`.
//! 3. **Amplitude** – the signed distance from the level to the interior extremum
//!    (maximum or minimum depending on the polarity) is at least `amp0`.
//! 4. **Single extremum** – the enclosed set holds exactly one local extremum over
//!    8-neighbourhoods restricted to the set. Equal values are ordered by pixel index so
//!    that a plateau counts once.
//! 5. **Polarity** (Q diagnostic) – the mean relative vorticity, signed by the hemisphere,
//!    matches the polarity being searched.
//!
//! On success the center, amplitude, effective radius and speed profile are filled in.
//!
//! See also
//! ------------
//! * [`super::collapser::collapse`] – drives the evaluator across levels.
//! * [`super::swirl::speed_profile`] – speed radius and maximum speed.
use std::cmp::Ordering;

use hifitime::Epoch;

use crate::{
    config::{CenterMethod, DiagnosticType, EddyConfig, PixelBounds},
    constants::{coriolis, wrap_lon_delta},
    contour::Contour,
    grid::{GridField, VelocityField},
};

use super::{swirl::speed_profile, EddyObservation, EnclosedRegion, Polarity, Rejection};

/// Everything an evaluation needs besides the contour; shared by all contours of one frame
/// and polarity.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub grid: &'a GridField,
    pub velocity: &'a VelocityField,
    pub config: &'a EddyConfig,
    pub polarity: Polarity,
    pub epoch: Epoch,
    pub pixel_bounds: PixelBounds,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        grid: &'a GridField,
        velocity: &'a VelocityField,
        config: &'a EddyConfig,
        polarity: Polarity,
        epoch: Epoch,
    ) -> Self {
        EvaluationContext {
            grid,
            velocity,
            config,
            polarity,
            epoch,
            pixel_bounds: config.pixel_bounds(grid.resolution()),
        }
    }

    #[inline]
    fn seeks_maximum(&self) -> bool {
        self.polarity.seeks_maximum(self.config.diagnostic())
    }

    /// Valid cells enclosed by `contour`, as increasing flat indices.
    pub fn enclosed_pixels(&self, contour: &Contour) -> Vec<usize> {
        let mut pixels = contour.pixels_in(self.grid);
        pixels.retain(|&k| {
            let (i, j) = self.grid.unflatten(k);
            self.grid.is_valid(i, j)
        });
        pixels
    }
}

/// Evaluate one contour.
///
/// Return
/// ----------
/// * `Ok(EddyObservation)` when every test passes.
/// * `Err(Rejection)` naming the first failed test.
pub fn evaluate(contour: &Contour, ctx: &EvaluationContext) -> Result<EddyObservation, Rejection> {
    let pixels = ctx.enclosed_pixels(contour);
    evaluate_pixels(contour, pixels, ctx)
}

/// Same as [`evaluate`] with the valid enclosed pixels already computed.
pub fn evaluate_pixels(
    contour: &Contour,
    pixels: Vec<usize>,
    ctx: &EvaluationContext,
) -> Result<EddyObservation, Rejection> {
    let grid = ctx.grid;
    let config = ctx.config;
    let level = contour.level();

    // 1. size
    if !ctx.pixel_bounds.contains(pixels.len()) {
        return Err(Rejection::Size {
            pixels: pixels.len(),
        });
    }

    // 2. shape
    let fit = contour.fit_circle().ok_or(Rejection::Shape {
        error: f64::INFINITY,
    })?;
    if !(fit.error <= config.max_shape_error()) {
        return Err(Rejection::Shape { error: fit.error });
    }

    // 3. amplitude
    let values: Vec<f64> = pixels
        .iter()
        .map(|&k| {
            let (i, j) = grid.unflatten(k);
            grid.value(i, j)
        })
        .collect();
    let maximum = ctx.seeks_maximum();
    let extremum = if maximum {
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    } else {
        values.iter().copied().fold(f64::INFINITY, f64::min)
    };
    let signed_amplitude = if maximum {
        extremum - level
    } else {
        level - extremum
    };
    if !(signed_amplitude >= config.amp0()) {
        return Err(Rejection::Amplitude {
            amplitude: signed_amplitude,
        });
    }

    // 4. single extremum
    let count = count_extrema(grid, &pixels, maximum);
    if count != 1 {
        return Err(Rejection::MultipleExtrema { count });
    }

    // 5. rotation sense for Q
    if config.diagnostic() == DiagnosticType::Q {
        let rotation = rotation_polarity(ctx, &pixels, fit.center_lat);
        if rotation != Some(ctx.polarity) {
            return Err(Rejection::Polarity);
        }
    }

    let (center_lon, center_lat) = match config.center_method() {
        CenterMethod::FittedCircle => (fit.center_lon, fit.center_lat),
        CenterMethod::AnomalyWeighted => {
            anomaly_centroid(grid, &pixels, &values, level, fit.center_lon)
                .unwrap_or((fit.center_lon, fit.center_lat))
        }
    };

    let swirl = speed_profile(
        grid,
        &ctx.velocity.speed,
        center_lon,
        center_lat,
        fit.radius,
        config.n_rays(),
    );

    Ok(EddyObservation {
        epoch: ctx.epoch,
        polarity: ctx.polarity,
        center_lon,
        center_lat,
        amplitude: (extremum - level).abs(),
        effective_radius: fit.radius,
        speed_radius: swirl.speed_radius,
        max_speed: swirl.max_speed,
        level,
        contour: contour.clone(),
        shape_error: fit.error,
        region: EnclosedRegion { pixels, values },
    })
}

/// Number of local extrema of the enclosed set.
///
/// A pixel is an extremum when it beats every enclosed 8-neighbour; ties go to the lower
/// pixel index.
fn count_extrema(grid: &GridField, pixels: &[usize], maximum: bool) -> usize {
    let (nx, ny) = grid.shape();
    let beats = |a: usize, b: usize| -> bool {
        let (ia, ja) = grid.unflatten(a);
        let (ib, jb) = grid.unflatten(b);
        let (va, vb) = (grid.value(ia, ja), grid.value(ib, jb));
        let ord = if maximum {
            va.total_cmp(&vb)
        } else {
            vb.total_cmp(&va)
        };
        match ord {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => a < b,
        }
    };

    pixels
        .iter()
        .filter(|&&k| {
            let (i, j) = grid.unflatten(k);
            (-1i64..=1)
                .flat_map(|di| (-1i64..=1).map(move |dj| (di, dj)))
                .filter(|&d| d != (0, 0))
                .filter_map(|(di, dj)| {
                    let jj = j as i64 + dj;
                    if jj < 0 || jj >= ny as i64 {
                        return None;
                    }
                    let ii = i as i64 + di;
                    let ii = if grid.is_periodic() {
                        ii.rem_euclid(nx as i64)
                    } else if ii < 0 || ii >= nx as i64 {
                        return None;
                    } else {
                        ii
                    };
                    Some(grid.flat_index(ii as usize, jj as usize))
                })
                .filter(|n| pixels.binary_search(n).is_ok())
                .all(|n| beats(k, n))
        })
        .count()
}

/// Polarity implied by the mean relative vorticity of the enclosed pixels.
fn rotation_polarity(ctx: &EvaluationContext, pixels: &[usize], lat: f64) -> Option<Polarity> {
    let (sum, n) = pixels
        .iter()
        .map(|&k| {
            let (i, j) = ctx.grid.unflatten(k);
            ctx.velocity.vorticity[(i, j)]
        })
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    let f = coriolis(lat);
    if n == 0 || f == 0.0 {
        return None;
    }
    let signed = (sum / n as f64) * f.signum();
    match signed.partial_cmp(&0.0)? {
        Ordering::Greater => Some(Polarity::Cyclonic),
        Ordering::Less => Some(Polarity::Anticyclonic),
        Ordering::Equal => None,
    }
}

/// Centroid of the pixels weighted by `|value - level|`, longitudes taken around `lon_ref`.
fn anomaly_centroid(
    grid: &GridField,
    pixels: &[usize],
    values: &[f64],
    level: f64,
    lon_ref: f64,
) -> Option<(f64, f64)> {
    let (mut sw, mut slon, mut slat) = (0.0, 0.0, 0.0);
    for (&k, &v) in pixels.iter().zip(values) {
        let (i, j) = grid.unflatten(k);
        let w = (v - level).abs();
        slon += w * (lon_ref + wrap_lon_delta(grid.lon()[i] - lon_ref));
        slat += w * grid.lat()[j];
        sw += w;
    }
    (sw > 0.0).then(|| (slon / sw, slat / sw))
}

#[cfg(test)]
mod evaluator_test {
    use super::*;
    use crate::constants::RADEG;
    use crate::contour::extraction::extract;
    use nalgebra::DMatrix;

    fn epoch() -> Epoch {
        Epoch::from_mjd_utc(58_000.0)
    }

    /// Gaussian eddies of amplitude `amp` (cm) and width `sigma` (deg of latitude), isotropic
    /// in meters, on a 0.25° grid.
    fn field(eddies: &[(f64, f64, f64)], sigma: f64) -> GridField {
        let lon: Vec<f64> = (0..41).map(|i| i as f64 * 0.25).collect();
        let lat: Vec<f64> = (0..41).map(|j| 30.0 + j as f64 * 0.25).collect();
        let values = DMatrix::from_fn(41, 41, |i, j| {
            eddies
                .iter()
                .map(|&(cx, cy, amp)| {
                    let dx = (lon[i] - cx) * (cy * RADEG).cos();
                    let d2 = dx * dx + (lat[j] - cy).powi(2);
                    amp * (-d2 / (2.0 * sigma * sigma)).exp()
                })
                .sum()
        });
        GridField::new(lon, lat, values, DMatrix::from_element(41, 41, false), f64::NAN).unwrap()
    }

    fn config() -> EddyConfig {
        EddyConfig::builder()
            .radius_bounds(0.3, 3.0)
            .amp0(1.0)
            .build()
            .unwrap()
    }

    fn first_contour(grid: &GridField, level: f64) -> Contour {
        let (_, mut contours) = extract(grid, [level], 0).next().unwrap();
        contours.remove(0)
    }

    #[test]
    fn test_accepts_gaussian_high() {
        let g = field(&[(5.0, 35.0, 15.0)], 0.8);
        let vel = g.derive_velocity(0.01);
        let cfg = config();
        let ctx = EvaluationContext::new(&g, &vel, &cfg, Polarity::Anticyclonic, epoch());
        let c = first_contour(&g, 5.0);
        let eddy = evaluate(&c, &ctx).unwrap();
        assert!((eddy.center_lon - 5.0).abs() < 0.05);
        assert!((eddy.center_lat - 35.0).abs() < 0.05);
        assert!((eddy.amplitude - 10.0).abs() < 0.5);
        assert!(eddy.shape_error < 5.0);
        assert!(eddy.max_speed > 0.0);
        assert!(eddy.speed_radius <= eddy.effective_radius);
        assert_eq!(eddy.region.len(), eddy.region.values.len());
    }

    #[test]
    fn test_low_rejected_for_anticyclones() {
        let g = field(&[(5.0, 35.0, -15.0)], 0.8);
        let vel = g.derive_velocity(0.01);
        let cfg = config();
        let c = first_contour(&g, -5.0);
        let anti = EvaluationContext::new(&g, &vel, &cfg, Polarity::Anticyclonic, epoch());
        assert!(matches!(evaluate(&c, &anti), Err(Rejection::Amplitude { .. })));
        let cyc = EvaluationContext::new(&g, &vel, &cfg, Polarity::Cyclonic, epoch());
        assert!(evaluate(&c, &cyc).is_ok());
    }

    #[test]
    fn test_two_peaks_are_multiple_extrema() {
        let g = field(&[(4.0, 35.0, 15.0), (6.0, 35.0, 15.0)], 0.6);
        let vel = g.derive_velocity(0.01);
        let cfg = EddyConfig::builder()
            .radius_bounds(0.3, 3.0)
            .max_shape_error(90.0)
            .build()
            .unwrap();
        let ctx = EvaluationContext::new(&g, &vel, &cfg, Polarity::Anticyclonic, epoch());
        let c = first_contour(&g, 3.0);
        assert_eq!(
            evaluate(&c, &ctx).unwrap_err(),
            Rejection::MultipleExtrema { count: 2 }
        );
    }

    #[test]
    fn test_small_contour_is_size_rejection() {
        let g = field(&[(5.0, 35.0, 15.0)], 0.8);
        let vel = g.derive_velocity(0.01);
        let cfg = EddyConfig::builder()
            .radius_bounds(1.5, 3.0)
            .build()
            .unwrap();
        let ctx = EvaluationContext::new(&g, &vel, &cfg, Polarity::Anticyclonic, epoch());
        let c = first_contour(&g, 12.0);
        assert!(matches!(evaluate(&c, &ctx), Err(Rejection::Size { .. })));
    }

    #[test]
    fn test_weak_contour_is_amplitude_rejection() {
        let g = field(&[(5.0, 35.0, 15.0)], 0.8);
        let vel = g.derive_velocity(0.01);
        let cfg = EddyConfig::builder()
            .radius_bounds(0.3, 3.0)
            .amp0(20.0)
            .build()
            .unwrap();
        let ctx = EvaluationContext::new(&g, &vel, &cfg, Polarity::Anticyclonic, epoch());
        let c = first_contour(&g, 5.0);
        match evaluate(&c, &ctx) {
            Err(Rejection::Amplitude { amplitude }) => assert!((amplitude - 10.0).abs() < 0.5),
            other => panic!("unexpected {other:?}"),
        }
    }

    fn q_config() -> EddyConfig {
        EddyConfig::builder()
            .diagnostic(DiagnosticType::Q)
            .radius_bounds(0.3, 3.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_q_high_with_anticyclonic_rotation_is_accepted() {
        // northern hemisphere: a high of the field turns clockwise
        let g = field(&[(5.0, 35.0, 1.0)], 0.8);
        let vel = g.derive_velocity(1.0);
        let cfg = q_config();
        let ctx = EvaluationContext::new(&g, &vel, &cfg, Polarity::Anticyclonic, epoch());
        let eddy = evaluate(&first_contour(&g, 0.35), &ctx).unwrap();
        assert_eq!(eddy.polarity, Polarity::Anticyclonic);
        assert!((eddy.center_lon - 5.0).abs() < 0.05);
        assert!((eddy.amplitude - 0.65).abs() < 0.05);
    }

    #[test]
    fn test_q_rotation_mismatch_is_polarity_rejection() {
        let g = field(&[(5.0, 35.0, 1.0)], 0.8);
        let vel = g.derive_velocity(1.0);
        let cfg = q_config();
        let ctx = EvaluationContext::new(&g, &vel, &cfg, Polarity::Cyclonic, epoch());
        assert_eq!(
            evaluate(&first_contour(&g, 0.35), &ctx),
            Err(Rejection::Polarity)
        );
    }

    #[test]
    fn test_anomaly_weighted_center() {
        let g = field(&[(5.0, 35.0, 15.0)], 0.8);
        let vel = g.derive_velocity(0.01);
        let cfg = EddyConfig::builder()
            .radius_bounds(0.3, 3.0)
            .center_method(CenterMethod::AnomalyWeighted)
            .build()
            .unwrap();
        let ctx = EvaluationContext::new(&g, &vel, &cfg, Polarity::Anticyclonic, epoch());
        let eddy = evaluate(&first_contour(&g, 5.0), &ctx).unwrap();
        assert!((eddy.center_lon - 5.0).abs() < 1e-9);
        assert!((eddy.center_lat - 35.0).abs() < 1e-9);
    }
}
