//! # Frame pipeline
//!
//! [`EddyTracker`] drives the whole process over a sequence of [`GridFrame`]s:
//!
//! ```text
//! frame ─▶ GridField (crop, mask, filter) ─▶ velocity ─▶ contours of every level
//!       ─▶ for each polarity: levels in visiting order ─▶ collapse ─▶ eddies
//!       ─▶ Tracker::step (per polarity) ─▶ closed tracks ─▶ TrackArchive
//! ```
//!
//! Frames are processed one after the other. A frame whose timestamp cannot be resolved,
//! or whose grid is inconsistent, is logged and skipped. Frames outside the configured
//! date range are skipped silently. A frame without any valid cell, or whose
//! identification fails (e.g. a filter returning the wrong shape), yields no eddy but still
//! advances the trackers, so tracks keep counting misses.
//!
//! At the end of the input, or when cancellation is requested between two frames, every
//! active track is closed and written, then the archive is flushed.
//!
//! Cooperative cancellation
//! -----------------
//! ```rust,ignore
//! let stop = Arc::new(AtomicBool::new(false));
//! let summary = tracker.run_with_cancel(frames, &mut archive, || stop.load(Ordering::Relaxed))?;
//! ```
use hifitime::Epoch;
use itertools::{Either, Itertools};
use tracing::{debug, info, info_span, warn};

use crate::{
    config::EddyConfig,
    contour::extraction::extract,
    eddy_errors::EddyError,
    grid::{FieldFilter, GridField},
    identification::{collapse, CollapseReport, EddyObservation, EvaluationContext, Polarity},
    time::date_string,
    tracking::{TrackArchive, Tracker},
};

pub mod frame;
pub mod frame_timer;

pub use frame::{crop_to_bounds, FrameTime, GridFrame, RawFrame};
pub use frame_timer::{fmt_dur, FrameTimer};

/// Eddies of one frame, by polarity.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEddies {
    pub epoch: Epoch,
    pub anticyclonic: Vec<EddyObservation>,
    pub cyclonic: Vec<EddyObservation>,
    pub anticyclonic_report: CollapseReport,
    pub cyclonic_report: CollapseReport,
}

impl FrameEddies {
    fn empty(epoch: Epoch) -> Self {
        FrameEddies {
            epoch,
            anticyclonic: Vec::new(),
            cyclonic: Vec::new(),
            anticyclonic_report: CollapseReport::default(),
            cyclonic_report: CollapseReport::default(),
        }
    }

    pub fn get(&self, polarity: Polarity) -> &[EddyObservation] {
        match polarity {
            Polarity::Anticyclonic => &self.anticyclonic,
            Polarity::Cyclonic => &self.cyclonic,
        }
    }

    pub fn report(&self, polarity: Polarity) -> &CollapseReport {
        match polarity {
            Polarity::Anticyclonic => &self.anticyclonic_report,
            Polarity::Cyclonic => &self.cyclonic_report,
        }
    }

    pub fn len(&self) -> usize {
        self.anticyclonic.len() + self.cyclonic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&mut self, polarity: Polarity) -> Vec<EddyObservation> {
        match polarity {
            Polarity::Anticyclonic => std::mem::take(&mut self.anticyclonic),
            Polarity::Cyclonic => std::mem::take(&mut self.cyclonic),
        }
    }
}

/// Counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: usize,
    /// Frames with an unreadable timestamp or grid.
    pub frames_skipped: usize,
    pub frames_out_of_range: usize,
    /// Frames whose identification failed; they count as frames without eddy.
    pub frames_failed: usize,
    pub eddies_detected: usize,
    pub tracks_written: usize,
    pub cancelled: bool,
}

/// Identification and tracking over a sequence of frames.
pub struct EddyTracker {
    config: EddyConfig,
    filter: Option<Box<dyn FieldFilter>>,
}

impl EddyTracker {
    pub fn new(config: EddyConfig) -> Self {
        EddyTracker {
            config,
            filter: None,
        }
    }

    /// Install the smoothing filter used when smoothing is enabled.
    pub fn with_filter(mut self, filter: Box<dyn FieldFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn config(&self) -> &EddyConfig {
        &self.config
    }

    /// Filter to apply, if smoothing is enabled.
    fn active_filter(&self) -> Result<Option<&dyn FieldFilter>, EddyError> {
        let Some(kind) = self.config.smoothing() else {
            return Ok(None);
        };
        let filter = self.filter.as_deref().ok_or(EddyError::MissingFilter)?;
        if filter.kind() != kind {
            return Err(EddyError::InvalidConfig(format!(
                "smoothing is {kind} but the installed filter is {}",
                filter.kind()
            )));
        }
        Ok(Some(filter))
    }

    /// Identify the eddies of one frame.
    ///
    /// Return
    /// ----------
    /// * Eddies of both polarities; errors on an unresolvable timestamp, an inconsistent
    ///   grid, a missing or mismatched filter.
    pub fn identify_frame<F: GridFrame + ?Sized>(&self, frame: &F) -> Result<FrameEddies, EddyError> {
        let epoch = frame.timestamp()?;
        let grid = frame.to_grid(self.config.lon_range(), self.config.lat_range())?;
        self.identify_grid(grid, epoch)
    }

    /// Identify the eddies of an already built grid.
    pub fn identify_grid(&self, mut grid: GridField, epoch: Epoch) -> Result<FrameEddies, EddyError> {
        let filter = self.active_filter()?;
        if grid.valid_count() == 0 {
            debug!(date = %date_string(epoch), "frame without valid cell");
            return Ok(FrameEddies::empty(epoch));
        }
        if let Some(filter) = filter {
            grid.apply_filter(filter)?;
        }
        let velocity = grid.derive_velocity(self.config.field_to_meters());

        // contours are shared by both polarities, ascending by level
        let mut levels = self.config.levels();
        levels.sort_by(f64::total_cmp);
        let contours = extract(&grid, levels, self.config.boundary_padding()).collect_vec();

        let mut eddies = FrameEddies::empty(epoch);
        for polarity in Polarity::BOTH {
            let ctx = EvaluationContext::new(&grid, &velocity, &self.config, polarity, epoch);
            let visiting = if polarity
                .visits_descending(self.config.diagnostic(), self.config.level_order())
            {
                Either::Left(contours.iter().rev())
            } else {
                Either::Right(contours.iter())
            };
            let (found, report) = collapse(visiting.map(|(level, c)| (*level, c)), &ctx);
            match polarity {
                Polarity::Anticyclonic => {
                    eddies.anticyclonic = found;
                    eddies.anticyclonic_report = report;
                }
                Polarity::Cyclonic => {
                    eddies.cyclonic = found;
                    eddies.cyclonic_report = report;
                }
            }
        }
        Ok(eddies)
    }

    /// Identify and track every frame, writing closed tracks to `archive`.
    pub fn run<F, I, A>(&self, frames: I, archive: &mut A) -> Result<RunSummary, EddyError>
    where
        F: GridFrame,
        I: IntoIterator<Item = F>,
        A: TrackArchive + ?Sized,
    {
        self.run_with_cancel(frames, archive, || false)
    }

    /// Same as [`Self::run`], polling `should_cancel` before each frame.
    ///
    /// On cancellation the frames already processed are fully persisted: active tracks
    /// are closed, written and the archive is flushed.
    pub fn run_with_cancel<F, I, A, C>(
        &self,
        frames: I,
        archive: &mut A,
        mut should_cancel: C,
    ) -> Result<RunSummary, EddyError>
    where
        F: GridFrame,
        I: IntoIterator<Item = F>,
        A: TrackArchive + ?Sized,
        C: FnMut() -> bool,
    {
        let span = info_span!("eddy_run", domain = %self.config.domain(), diagnostic = %self.config.diagnostic());
        let _guard = span.enter();

        self.active_filter()?;
        info!(config = %self.config, "starting eddy tracking");

        let mut trackers = Polarity::BOTH.map(|p| Tracker::new(p, &self.config));
        let mut summary = RunSummary::default();
        let mut timer = FrameTimer::new(0.2);
        let mut pixel_range_logged = false;

        #[cfg(feature = "progress")]
        let progress = frame_timer::FrameProgress::new();

        for (index, frame) in frames.into_iter().enumerate() {
            if should_cancel() {
                summary.cancelled = true;
                #[cfg(feature = "progress")]
                progress.interrupted();
                info!(frame = index, "cancellation requested");
                break;
            }
            timer.start_frame();

            let epoch = match frame.timestamp() {
                Ok(epoch) => epoch,
                Err(e) => {
                    warn!(frame = index, error = %e, "skipping frame");
                    summary.frames_skipped += 1;
                    continue;
                }
            };
            if !self.config.in_date_range(epoch) {
                summary.frames_out_of_range += 1;
                continue;
            }
            let grid = match frame.to_grid(self.config.lon_range(), self.config.lat_range()) {
                Ok(grid) => grid,
                Err(e) => {
                    warn!(frame = index, date = %date_string(epoch), error = %e, "skipping frame");
                    summary.frames_skipped += 1;
                    continue;
                }
            };
            if !pixel_range_logged {
                let bounds = self.config.pixel_bounds(grid.resolution());
                info!(pixmin = bounds.min, pixmax = bounds.max, "pixel range");
                pixel_range_logged = true;
            }

            let mut eddies = match self.identify_grid(grid, epoch) {
                Ok(eddies) => eddies,
                Err(e) => {
                    warn!(frame = index, date = %date_string(epoch), error = %e, "identification failed");
                    summary.frames_failed += 1;
                    FrameEddies::empty(epoch)
                }
            };
            summary.eddies_detected += eddies.len();
            info!(
                frame = index,
                date = %date_string(epoch),
                anticyclonic = eddies.anticyclonic.len(),
                cyclonic = eddies.cyclonic.len(),
                "frame identified"
            );

            for tracker in trackers.iter_mut() {
                let observations = eddies.take(tracker.polarity());
                for track in tracker.step(index, epoch, observations) {
                    archive.write_track(&track)?;
                    summary.tracks_written += 1;
                }
            }
            summary.frames_processed += 1;

            let last = timer.finish_frame();
            #[cfg(feature = "progress")]
            progress.frame_done(last, timer.recent());
            debug!(frame = index, duration = %fmt_dur(last), "frame done");
        }

        for tracker in trackers.iter_mut() {
            for track in tracker.finish() {
                archive.write_track(&track)?;
                summary.tracks_written += 1;
            }
        }
        archive.flush()?;

        #[cfg(feature = "progress")]
        progress.finish();
        info!(
            processed = summary.frames_processed,
            skipped = summary.frames_skipped,
            out_of_range = summary.frames_out_of_range,
            failed = summary.frames_failed,
            tracks = summary.tracks_written,
            cancelled = summary.cancelled,
            mean_frame = %fmt_dur(timer.mean()),
            slowest_frame = %fmt_dur(timer.slowest()),
            "eddy tracking done"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod pipeline_test {
    use super::*;
    use crate::{
        config::SmoothingKind,
        constants::RADEG,
        tracking::Track,
    };
    use nalgebra::DMatrix;
    use std::cell::Cell;

    struct Identity(SmoothingKind);

    impl FieldFilter for Identity {
        fn kind(&self) -> SmoothingKind {
            self.0
        }

        fn filter(&self, field: &DMatrix<f64>, _grid: &GridField) -> DMatrix<f64> {
            field.clone()
        }
    }

    /// Returns a wrong shape on its `fail_on`-th call (0-based), the input otherwise.
    struct FailingOnce {
        calls: Cell<usize>,
        fail_on: usize,
    }

    impl FieldFilter for FailingOnce {
        fn kind(&self) -> SmoothingKind {
            SmoothingKind::Gaussian
        }

        fn filter(&self, field: &DMatrix<f64>, _grid: &GridField) -> DMatrix<f64> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call == self.fail_on {
                DMatrix::zeros(1, 1)
            } else {
                field.clone()
            }
        }
    }

    fn frame(day: f64, cx: f64) -> RawFrame {
        let lon: Vec<f64> = (0..61).map(|i| i as f64 * 0.25).collect();
        let lat: Vec<f64> = (0..41).map(|j| 30.0 + j as f64 * 0.25).collect();
        let values = DMatrix::from_fn(61, 41, |i, j| {
            let dx = (lon[i] - cx) * (35.0 * RADEG).cos();
            let d2 = dx * dx + (lat[j] - 35.0).powi(2);
            20.0 * (-d2 / (2.0 * 0.6 * 0.6)).exp()
        });
        RawFrame::new(
            lon,
            lat,
            values,
            FrameTime::DaysSince {
                base: Epoch::from_mjd_utc(58_000.0),
                days: day,
            },
        )
    }

    fn config() -> EddyConfig {
        EddyConfig::builder()
            .radius_bounds(0.3, 3.0)
            .max_shape_error(70.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_identify_frame_finds_anticyclone() {
        let t = EddyTracker::new(config());
        let eddies = t.identify_frame(&frame(0.0, 7.0)).unwrap();
        assert_eq!(eddies.anticyclonic.len(), 1);
        assert!(eddies.cyclonic.is_empty());
        assert_eq!(eddies.get(Polarity::Anticyclonic).len(), 1);
    }

    #[test]
    fn test_shared_contours_match_per_polarity_extraction() {
        let cfg = config();
        let mut f = frame(0.0, 5.0);
        let (lon, lat) = (f.lon.clone(), f.lat.clone());
        f.values += DMatrix::from_fn(61, 41, |i, j| {
            let dx = (lon[i] - 11.0) * (36.0 * RADEG).cos();
            let d2 = dx * dx + (lat[j] - 36.0).powi(2);
            -15.0 * (-d2 / (2.0 * 0.6 * 0.6)).exp()
        });
        let eddies = EddyTracker::new(cfg.clone()).identify_frame(&f).unwrap();
        assert_eq!(eddies.anticyclonic.len(), 1);
        assert_eq!(eddies.cyclonic.len(), 1);

        let grid = f.to_grid(cfg.lon_range(), cfg.lat_range()).unwrap();
        let vel = grid.derive_velocity(cfg.field_to_meters());
        for polarity in Polarity::BOTH {
            let ctx = EvaluationContext::new(&grid, &vel, &cfg, polarity, eddies.epoch);
            let levels = polarity.ordered_levels(cfg.diagnostic(), cfg.level_order(), cfg.levels());
            let (alone, report) = collapse(extract(&grid, levels, 0), &ctx);
            assert_eq!(eddies.get(polarity), alone.as_slice());
            assert_eq!(eddies.report(polarity), &report);
        }
    }

    #[test]
    fn test_failed_identification_counts_as_missed_frame() {
        let cfg = EddyConfig::builder()
            .radius_bounds(0.3, 3.0)
            .max_shape_error(70.0)
            .smoothing(Some(SmoothingKind::Gaussian))
            .missed_frame_budget(2)
            .build()
            .unwrap();
        let filter = FailingOnce {
            calls: Cell::new(0),
            fail_on: 1,
        };
        let t = EddyTracker::new(cfg).with_filter(Box::new(filter));
        let frames = (0..3).map(|d| frame(d as f64, 7.0 + 0.05 * d as f64));
        let mut archive: Vec<Track> = Vec::new();
        let summary = t.run(frames, &mut archive).unwrap();

        assert_eq!(summary.frames_failed, 1);
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(archive.len(), 1);
        let frames_seen: Vec<usize> = archive[0].points().iter().map(|p| p.frame).collect();
        assert_eq!(frames_seen, vec![0, 2]);
    }

    #[test]
    fn test_missing_filter_is_reported_before_any_frame() {
        let cfg = EddyConfig::builder()
            .smoothing(Some(SmoothingKind::Gaussian))
            .build()
            .unwrap();
        let t = EddyTracker::new(cfg.clone());
        let mut archive: Vec<Track> = Vec::new();
        assert_eq!(
            t.run(vec![frame(0.0, 7.0)], &mut archive),
            Err(EddyError::MissingFilter)
        );

        let wrong = EddyTracker::new(cfg.clone()).with_filter(Box::new(Identity(SmoothingKind::Hanning)));
        assert!(matches!(
            wrong.identify_frame(&frame(0.0, 7.0)),
            Err(EddyError::InvalidConfig(_))
        ));

        let ok = EddyTracker::new(cfg).with_filter(Box::new(Identity(SmoothingKind::Gaussian)));
        assert!(ok.identify_frame(&frame(0.0, 7.0)).is_ok());
    }

    #[test]
    fn test_bad_timestamp_is_skipped() {
        let t = EddyTracker::new(config());
        let mut bad = frame(1.0, 7.1);
        bad.time = FrameTime::SourceName("no date here".into());
        let mut archive: Vec<Track> = Vec::new();
        let summary = t
            .run(vec![frame(0.0, 7.0), bad, frame(1.0, 7.1)], &mut archive)
            .unwrap();
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].len(), 2);
        assert_eq!(archive[0].points()[1].frame, 2);
    }

    #[test]
    fn test_cancel_flushes_processed_frames() {
        let t = EddyTracker::new(config());
        let frames = (0..5).map(|d| frame(d as f64, 7.0 + 0.05 * d as f64));
        let mut archive: Vec<Track> = Vec::new();
        let mut polls = 0;
        let summary = t
            .run_with_cancel(frames, &mut archive, || {
                polls += 1;
                polls > 3
            })
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].len(), 3);
        assert!(!archive[0].is_live());
    }
}
