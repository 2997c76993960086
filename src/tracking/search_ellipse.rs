//! # Search ellipse
//!
//! Where a track may have moved between two observations. The ellipse is centered on the
//! last known position, with distinct eastern and western semi-axes and one meridional
//! semi-axis, all in meters.
//!
//! Sizing
//! -----------------
//! Each domain preset gives base semi-axes reached after `reference_days`. For an elapsed
//! time `days` the semi-axes are scaled by `days / reference_days` and capped.
//!
//! On the `Global` domain the western semi-axis follows the westward drift of long
//! baroclinic Rossby waves, `c = β Rd²` with `Rd = min(c1 / |f|, sqrt(c1 / 2β))`:
//! `west = max(east, rossby_factor · c · days)`, capped as well.
//!
//! Distances are measured on the local tangent plane. With latitude scaling the zonal
//! distance is `R cos(φ0) Δλ` (true meters); without it `R Δλ`, i.e. the ellipse keeps a
//! fixed extent in degrees of longitude.
//!
//! Every region is computed from its inputs alone; regions share no state.
use crate::{
    config::Domain,
    constants::{
        beta, coriolis, wrap_lon_delta, Days, Degree, Meter, BAROCLINIC_WAVE_SPEED, EARTH_RADIUS,
        RADEG, SECONDS_PER_DAY,
    },
};

/// Semi-axes and scaling of one domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsePreset {
    /// Eastern semi-axis reached after `reference_days` (m).
    pub east: Meter,
    /// Western semi-axis reached after `reference_days` (m).
    pub west: Meter,
    /// Northern and southern semi-axis reached after `reference_days` (m).
    pub meridional: Meter,
    pub reference_days: Days,
    /// Upper bound of every semi-axis (m).
    pub cap: Meter,
    /// Multiplier of the Rossby drift on the western side; `None` keeps the preset `west`.
    pub rossby_factor: Option<f64>,
}

impl EllipsePreset {
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Global => EllipsePreset {
                east: 150_000.0,
                west: 150_000.0,
                meridional: 150_000.0,
                reference_days: 7.0,
                cap: 500_000.0,
                rossby_factor: Some(1.75),
            },
            Domain::Regional => EllipsePreset {
                east: 150_000.0,
                west: 150_000.0,
                meridional: 150_000.0,
                reference_days: 7.0,
                cap: 500_000.0,
                rossby_factor: None,
            },
            Domain::MedSea => EllipsePreset {
                east: 100_000.0,
                west: 100_000.0,
                meridional: 100_000.0,
                reference_days: 7.0,
                cap: 300_000.0,
                rossby_factor: None,
            },
            Domain::BlackSea => EllipsePreset {
                east: 75_000.0,
                west: 75_000.0,
                meridional: 75_000.0,
                reference_days: 7.0,
                cap: 200_000.0,
                rossby_factor: None,
            },
        }
    }
}

/// Westward phase speed (m/s) of long baroclinic Rossby waves at `lat`.
pub fn rossby_drift_speed(lat: Degree) -> f64 {
    let b = beta(lat);
    if b <= 0.0 {
        return 0.0;
    }
    let f = coriolis(lat).abs();
    let equatorial = (BAROCLINIC_WAVE_SPEED / (2.0 * b)).sqrt();
    let rd = if f > 0.0 {
        (BAROCLINIC_WAVE_SPEED / f).min(equatorial)
    } else {
        equatorial
    };
    b * rd * rd
}

/// Inclusion region around one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRegion {
    pub center_lon: Degree,
    pub center_lat: Degree,
    pub east: Meter,
    pub west: Meter,
    pub meridional: Meter,
    zonal_scale: f64,
}

impl SearchRegion {
    /// Ellipse metric: `≤ 1` inside, `NaN` for non-finite positions.
    pub fn normalized_distance(&self, lon: Degree, lat: Degree) -> f64 {
        let dx = EARTH_RADIUS * self.zonal_scale * wrap_lon_delta(lon - self.center_lon) * RADEG;
        let dy = EARTH_RADIUS * (lat - self.center_lat) * RADEG;
        let a = if dx >= 0.0 { self.east } else { self.west };
        ((dx / a).powi(2) + (dy / self.meridional).powi(2)).sqrt()
    }

    /// Whether `(lon, lat)` lies inside the ellipse (boundary included).
    #[inline]
    pub fn contains(&self, lon: Degree, lat: Degree) -> bool {
        self.normalized_distance(lon, lat) <= 1.0
    }
}

/// Region factory for one domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchEllipse {
    preset: EllipsePreset,
    latitude_scaled: bool,
}

impl SearchEllipse {
    pub fn new(domain: Domain, latitude_scaled: bool) -> Self {
        Self::from_preset(EllipsePreset::for_domain(domain), latitude_scaled)
    }

    pub fn from_preset(preset: EllipsePreset, latitude_scaled: bool) -> Self {
        SearchEllipse {
            preset,
            latitude_scaled,
        }
    }

    pub fn preset(&self) -> &EllipsePreset {
        &self.preset
    }

    /// Region reachable from `(lon, lat)` after `days` days.
    pub fn region_for(&self, lon: Degree, lat: Degree, days: Days) -> SearchRegion {
        let p = &self.preset;
        let scale = days.max(0.0) / p.reference_days;
        let east = (p.east * scale).min(p.cap);
        let meridional = (p.meridional * scale).min(p.cap);
        let west = match p.rossby_factor {
            Some(k) => {
                let drift = k * rossby_drift_speed(lat) * days.max(0.0) * SECONDS_PER_DAY;
                drift.max(east).min(p.cap)
            }
            None => (p.west * scale).min(p.cap),
        };
        SearchRegion {
            center_lon: lon,
            center_lat: lat,
            east,
            west,
            meridional,
            zonal_scale: if self.latitude_scaled {
                (lat * RADEG).cos()
            } else {
                1.0
            },
        }
    }
}

/// Region of `center` on `domain` after `days`, with latitude scaling.
pub fn region_for(center: (Degree, Degree), domain: Domain, days: Days) -> SearchRegion {
    SearchEllipse::new(domain, true).region_for(center.0, center.1, days)
}
