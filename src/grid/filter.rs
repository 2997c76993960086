//! Pluggable smoothing applied before contouring.
//!
//! The Gaussian and Hanning kernels themselves live outside this crate. Any implementation
//! only has to honour the [`FieldFilter`] contract:
//!
//! * the input is the masked field, invalid cells hold `NaN`;
//! * the output has the same `(nx, ny)` shape;
//! * the grid re-applies its mask to the output, so values written on invalid cells are
//!   discarded.
//!
//! A filter returning a different shape makes [`GridField::apply_filter`] fail with
//! [`crate::eddy_errors::EddyError::FilterShape`].
use nalgebra::DMatrix;

use crate::config::SmoothingKind;

use super::GridField;

pub trait FieldFilter {
    /// Which smoothing this filter implements; used to check it against the configuration.
    fn kind(&self) -> SmoothingKind;

    /// Smooth `field`, the masked values of `grid`.
    fn filter(&self, field: &DMatrix<f64>, grid: &GridField) -> DMatrix<f64>;
}

#[cfg(test)]
mod filter_test {
    use super::*;

    /// Replaces every value by the mean of its valid 4-neighbours.
    struct Cross;

    impl FieldFilter for Cross {
        fn kind(&self) -> SmoothingKind {
            SmoothingKind::Hanning
        }

        fn filter(&self, field: &DMatrix<f64>, _grid: &GridField) -> DMatrix<f64> {
            let (nx, ny) = field.shape();
            DMatrix::from_fn(nx, ny, |i, j| {
                let mut sum = field[(i, j)];
                let mut n = 1.0;
                let neighbours = [
                    (i.wrapping_sub(1), j),
                    (i + 1, j),
                    (i, j.wrapping_sub(1)),
                    (i, j + 1),
                ];
                for (a, b) in neighbours {
                    if let Some(v) = field.get((a, b)).filter(|v| !v.is_nan()) {
                        sum += v;
                        n += 1.0;
                    }
                }
                sum / n
            })
        }
    }

    struct WrongShape;

    impl FieldFilter for WrongShape {
        fn kind(&self) -> SmoothingKind {
            SmoothingKind::Gaussian
        }

        fn filter(&self, _field: &DMatrix<f64>, _grid: &GridField) -> DMatrix<f64> {
            DMatrix::zeros(1, 1)
        }
    }

    fn grid() -> GridField {
        let mut values = DMatrix::zeros(3, 3);
        values[(1, 1)] = 4.0;
        let mut mask = DMatrix::from_element(3, 3, false);
        mask[(0, 0)] = true;
        GridField::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0, 2.0],
            values,
            mask,
            f64::NAN,
        )
        .unwrap()
    }

    #[test]
    fn test_filter_runs_once() {
        let mut g = grid();
        g.apply_filter(&Cross).unwrap();
        assert!(g.is_filtered());
        assert_eq!(g.value(1, 1), 0.8);
        assert_eq!(g.value(1, 0), 4.0 / 3.0);
        assert!(!g.is_valid(0, 0));

        // cached: a second run leaves values untouched
        g.apply_filter(&Cross).unwrap();
        assert_eq!(g.value(1, 1), 0.8);
    }

    #[test]
    fn test_filter_shape_is_checked() {
        let mut g = grid();
        assert_eq!(
            g.apply_filter(&WrongShape),
            Err(crate::eddy_errors::EddyError::FilterShape((1, 1)))
        );
        assert!(!g.is_filtered());
    }
}
