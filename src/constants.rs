//! # Constants and type definitions for eddytrack
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - Geophysical constants (gravity, Earth rotation and radius)
//! - Unit conversions (degrees ↔ radians, days ↔ seconds)
//! - Core type aliases used across the crate
//! - Thresholds guarding the geostrophic balance near the equator

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Standard gravity in m/s²
pub const GRAVITY: f64 = 9.81;

/// Earth angular velocity in rad/s
pub const EARTH_OMEGA: f64 = 7.292_115e-5;

/// Mean Earth radius in meters
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Meters spanned by one degree of latitude
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS * RADEG;

/// Smallest |f| (s⁻¹) for which the geostrophic balance is evaluated.
///
/// Reached at roughly 0.4° of latitude; closer to the equator velocities are `NaN`.
pub const CORIOLIS_MIN: f64 = 1.0e-6;

/// Numerical epsilon used for floating-point comparisons
pub const EPS: f64 = 1e-9;

/// Gravity wave speed of the first baroclinic mode (m/s), used for the
/// Rossby radius of deformation `Rd = c1 / |f|`.
pub const BAROCLINIC_WAVE_SPEED: f64 = 2.8;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in meters
pub type Meter = f64;
/// Speed in meters per second
pub type MeterPerSecond = f64;
/// Duration in days
pub type Days = f64;

/// Coriolis parameter `f = 2Ω sin(φ)` at latitude `lat` (degrees).
#[inline]
pub fn coriolis(lat: Degree) -> f64 {
    2.0 * EARTH_OMEGA * (lat * RADEG).sin()
}

/// Meridional gradient of the Coriolis parameter `β = 2Ω cos(φ) / R`.
#[inline]
pub fn beta(lat: Degree) -> f64 {
    2.0 * EARTH_OMEGA * (lat * RADEG).cos() / EARTH_RADIUS
}

/// Great-circle distance in meters between two (lon, lat) positions in degrees (haversine).
pub fn haversine(lon1: Degree, lat1: Degree, lon2: Degree, lat2: Degree) -> Meter {
    let dlat = (lat2 - lat1) * RADEG;
    let dlon = (lon2 - lon1) * RADEG;
    let a = (dlat / 2.0).sin().powi(2)
        + (lat1 * RADEG).cos() * (lat2 * RADEG).cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Wrap a longitude difference into `[-180, 180)`.
#[inline]
pub fn wrap_lon_delta(dlon: Degree) -> Degree {
    (dlon + 180.0).rem_euclid(360.0) - 180.0
}
