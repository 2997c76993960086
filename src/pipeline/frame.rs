//! # Input frames
//!
//! A [`GridFrame`] is one gridded snapshot handed to the pipeline: axes, values, mask,
//! fill value and a timestamp. Readers of concrete file formats implement the trait;
//! [`RawFrame`] is the in-memory implementation.
//!
//! Timestamps come in three forms ([`FrameTime`]): a ready epoch, a number of days after
//! a product base epoch, or the product name only, from which the date is parsed
//! (`..._h_YYYYMMDD_...` or `..._qd_YYYYMMDD_...`).
//!
//! Before identification the frame is cut to the configured bounding box with
//! [`crop_to_bounds`]. Longitudes are shifted by whole turns into
//! `[lon_min, lon_min + 360)`, so a `-100..290` window keeps a whole 0..360 product,
//! starting at 260 E.
use hifitime::Epoch;
use itertools::Itertools;
use nalgebra::DMatrix;
use ordered_float::OrderedFloat;

use crate::{
    eddy_errors::EddyError,
    grid::GridField,
    time::{epoch_from_days, parse_source_date},
};

/// How a frame knows its date.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameTime {
    Epoch(Epoch),
    DaysSince { base: Epoch, days: f64 },
    SourceName(String),
}

impl FrameTime {
    pub fn resolve(&self) -> Result<Epoch, EddyError> {
        match self {
            FrameTime::Epoch(e) => Ok(*e),
            FrameTime::DaysSince { base, days } => epoch_from_days(*base, *days),
            FrameTime::SourceName(name) => parse_source_date(name),
        }
    }
}

/// One gridded snapshot.
pub trait GridFrame {
    fn lon(&self) -> &[f64];
    fn lat(&self) -> &[f64];
    /// Values of shape `(nx, ny)`.
    fn values(&self) -> &DMatrix<f64>;
    /// `true` on land or invalid cells.
    fn mask(&self) -> &DMatrix<bool>;
    fn fill_value(&self) -> f64;
    fn timestamp(&self) -> Result<Epoch, EddyError>;

    /// Grid restricted to the longitude and latitude windows.
    fn to_grid(
        &self,
        lon_range: (f64, f64),
        lat_range: (f64, f64),
    ) -> Result<GridField, EddyError> {
        crop_to_bounds(
            self.lon(),
            self.lat(),
            self.values(),
            self.mask(),
            self.fill_value(),
            lon_range,
            lat_range,
        )
    }
}

/// In-memory frame.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub values: DMatrix<f64>,
    pub mask: DMatrix<bool>,
    pub fill_value: f64,
    pub time: FrameTime,
}

impl RawFrame {
    /// Frame without land, with a `NaN` fill value.
    pub fn new(lon: Vec<f64>, lat: Vec<f64>, values: DMatrix<f64>, time: FrameTime) -> Self {
        let mask = DMatrix::from_element(values.nrows(), values.ncols(), false);
        RawFrame {
            lon,
            lat,
            values,
            mask,
            fill_value: f64::NAN,
            time,
        }
    }

    pub fn with_mask(mut self, mask: DMatrix<bool>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }
}

impl GridFrame for RawFrame {
    fn lon(&self) -> &[f64] {
        &self.lon
    }

    fn lat(&self) -> &[f64] {
        &self.lat
    }

    fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    fn mask(&self) -> &DMatrix<bool> {
        &self.mask
    }

    fn fill_value(&self) -> f64 {
        self.fill_value
    }

    fn timestamp(&self) -> Result<Epoch, EddyError> {
        self.time.resolve()
    }
}

/// Cut a grid to `[lon_min, lon_max] × [lat_min, lat_max]`.
///
/// Return
/// ----------
/// * The cropped [`GridField`]; [`EddyError::InvalidAxis`] when a window selects nothing,
///   [`EddyError::ShapeMismatch`] when values or mask do not match the axes.
pub fn crop_to_bounds(
    lon: &[f64],
    lat: &[f64],
    values: &DMatrix<f64>,
    mask: &DMatrix<bool>,
    fill_value: f64,
    (lon_min, lon_max): (f64, f64),
    (lat_min, lat_max): (f64, f64),
) -> Result<GridField, EddyError> {
    let expected = (lon.len(), lat.len());
    for found in [values.shape(), mask.shape()] {
        if found != expected {
            return Err(EddyError::ShapeMismatch { expected, found });
        }
    }

    let columns: Vec<(usize, f64)> = lon
        .iter()
        .enumerate()
        .filter_map(|(i, &x)| {
            let shifted = lon_min + (x - lon_min).rem_euclid(360.0);
            (shifted <= lon_max).then_some((i, shifted))
        })
        .sorted_by_key(|&(_, x)| OrderedFloat(x))
        .dedup_by(|a, b| a.1 == b.1)
        .collect();
    let rows: Vec<usize> = (0..lat.len())
        .filter(|&j| lat[j] >= lat_min && lat[j] <= lat_max)
        .collect();

    let (nx, ny) = (columns.len(), rows.len());
    let cropped_values = DMatrix::from_fn(nx, ny, |a, b| values[(columns[a].0, rows[b])]);
    let cropped_mask = DMatrix::from_fn(nx, ny, |a, b| mask[(columns[a].0, rows[b])]);
    GridField::new(
        columns.iter().map(|&(_, x)| x).collect(),
        rows.iter().map(|&j| lat[j]).collect(),
        cropped_values,
        cropped_mask,
        fill_value,
    )
}

#[cfg(test)]
mod frame_test {
    use super::*;

    fn frame(lon: Vec<f64>) -> RawFrame {
        let lat: Vec<f64> = (0..5).map(|j| -2.0 + j as f64).collect();
        let nx = lon.len();
        let values = DMatrix::from_fn(nx, 5, |i, j| (10 * i + j) as f64);
        RawFrame::new(lon, lat, values, FrameTime::SourceName("dt_h_20140106_x.nc".into()))
    }

    #[test]
    fn test_frame_time_forms() {
        let base = Epoch::from_mjd_utc(58_000.0);
        assert_eq!(FrameTime::Epoch(base).resolve().unwrap(), base);
        let later = FrameTime::DaysSince { base, days: 2.0 }.resolve().unwrap();
        assert_eq!(later, Epoch::from_mjd_utc(58_002.0));
        assert!(matches!(
            FrameTime::SourceName("no date".into()).resolve(),
            Err(EddyError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            FrameTime::DaysSince { base, days: f64::NAN }.resolve(),
            Err(EddyError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_crop_regional_window() {
        let f = frame((0..10).map(|i| i as f64).collect());
        let g = f.to_grid((2.0, 5.0), (-1.0, 1.0)).unwrap();
        assert_eq!(g.lon(), &[2.0, 3.0, 4.0, 5.0]);
        assert_eq!(g.lat(), &[-1.0, 0.0, 1.0]);
        assert_eq!(g.value(0, 0), 21.0);
        assert!(f.timestamp().is_ok());
    }

    #[test]
    fn test_crop_rotates_global_product() {
        // 0..360 product seen through a -100..290 window
        let f = frame((0..36).map(|i| i as f64 * 10.0).collect());
        let g = f.to_grid((-100.0, 290.0), (-80.0, 80.0)).unwrap();
        assert_eq!(g.nx(), 36);
        assert_eq!(g.lon()[0], -100.0);
        assert_eq!(g.lon()[35], 250.0);
        // -100 is the 260 E column
        assert_eq!(g.value(0, 0), 260.0);
        assert!(g.is_periodic());
    }

    #[test]
    fn test_empty_window_is_an_error() {
        let f = frame((0..10).map(|i| i as f64).collect());
        assert!(matches!(
            f.to_grid((50.0, 60.0), (-1.0, 1.0)),
            Err(EddyError::InvalidAxis("lon"))
        ));
    }
}
