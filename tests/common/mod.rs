#![allow(dead_code)]

use eddytrack::{
    config::EddyConfig,
    constants::RADEG,
    grid::GridField,
    pipeline::{FrameTime, RawFrame},
};
use hifitime::Epoch;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One Gaussian anomaly: center (degrees), amplitude (field units), e-folding scale (degrees).
#[derive(Debug, Clone, Copy)]
pub struct Bump {
    pub lon: f64,
    pub lat: f64,
    pub amplitude: f64,
    pub sigma: f64,
}

impl Bump {
    pub fn new(lon: f64, lat: f64, amplitude: f64) -> Self {
        Bump {
            lon,
            lat,
            amplitude,
            sigma: 0.6,
        }
    }

    /// Isotropic in meters: the zonal distance is scaled by `cos(lat)`.
    pub fn at(&self, lon: f64, lat: f64) -> f64 {
        let dx = (lon - self.lon) * (self.lat * RADEG).cos();
        let d2 = dx * dx + (lat - self.lat).powi(2);
        self.amplitude * (-d2 / (2.0 * self.sigma * self.sigma)).exp()
    }
}

pub fn base_epoch() -> Epoch {
    Epoch::from_mjd_utc(58_000.0)
}

pub fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|k| start + k as f64 * step).collect()
}

/// Regional test box: 0..15 E, 30..40 N at 0.25 degree.
pub fn regional_axes() -> (Vec<f64>, Vec<f64>) {
    (axis(0.0, 0.25, 61), axis(30.0, 0.25, 41))
}

pub fn field(lon: &[f64], lat: &[f64], bumps: &[Bump]) -> DMatrix<f64> {
    DMatrix::from_fn(lon.len(), lat.len(), |i, j| {
        bumps.iter().map(|b| b.at(lon[i], lat[j])).sum()
    })
}

/// Add uniform noise in `[-amplitude, amplitude]` from a seeded generator.
pub fn add_noise(values: &mut DMatrix<f64>, amplitude: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for v in values.iter_mut() {
        *v += rng.random_range(-amplitude..=amplitude);
    }
}

pub fn grid(bumps: &[Bump]) -> GridField {
    let (lon, lat) = regional_axes();
    let values = field(&lon, &lat, bumps);
    let mask = DMatrix::from_element(lon.len(), lat.len(), false);
    GridField::new(lon, lat, values, mask, f64::NAN).unwrap()
}

/// Frame `day` days after [`base_epoch`] on the regional box.
pub fn frame(day: f64, bumps: &[Bump]) -> RawFrame {
    let (lon, lat) = regional_axes();
    let values = field(&lon, &lat, bumps);
    RawFrame::new(
        lon,
        lat,
        values,
        FrameTime::DaysSince {
            base: base_epoch(),
            days: day,
        },
    )
}

/// Config matched to the synthetic eddies: 20 cm bumps of 0.6 degree scale.
pub fn config() -> EddyConfig {
    EddyConfig::builder()
        .radius_bounds(0.3, 3.0)
        .max_shape_error(70.0)
        .build()
        .unwrap()
}
