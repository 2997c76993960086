//! # Level collapsing
//!
//! Nested contours at successive levels describe the same structure several times.
//! [`collapse`] keeps one eddy per structure:
//!
//! * levels are consumed in the order they are given (the pipeline orders them with
//!   [`super::Polarity::ordered_levels`], strongest first by default);
//! * a contour whose valid pixels overlap an already accepted eddy by more than
//!   `overlap_tolerance` of the smaller pixel set is skipped as a nested duplicate;
//! * otherwise it is evaluated; accepted eddies claim their pixels.
//!
//! A contour rejected for multiple extrema claims nothing, so the sub-structures it
//! contains can still be accepted at a more restrictive level visited later (weakest
//! first) or already were (strongest first).
//!
//! Invariant: any two returned eddies share at most `overlap_tolerance` of the smaller of
//! their pixel sets.
use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::contour::Contour;

use super::{
    evaluator::{evaluate_pixels, EvaluationContext},
    EddyObservation, Rejection,
};

/// Outcome counters of one collapse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollapseReport {
    pub levels: usize,
    pub contours: usize,
    pub skipped_overlap: usize,
    pub accepted: usize,
    pub rejected_size: usize,
    pub rejected_shape: usize,
    pub rejected_amplitude: usize,
    pub rejected_multiple_extrema: usize,
    pub rejected_polarity: usize,
}

impl CollapseReport {
    fn record(&mut self, rejection: &Rejection) {
        match rejection {
            Rejection::Size { .. } => self.rejected_size += 1,
            Rejection::Shape { .. } => self.rejected_shape += 1,
            Rejection::Amplitude { .. } => self.rejected_amplitude += 1,
            Rejection::MultipleExtrema { .. } => self.rejected_multiple_extrema += 1,
            Rejection::Polarity => self.rejected_polarity += 1,
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejected_size
            + self.rejected_shape
            + self.rejected_amplitude
            + self.rejected_multiple_extrema
            + self.rejected_polarity
    }
}

/// Pixel ownership of the accepted eddies.
#[derive(Default)]
struct Claims {
    owners: AHashMap<usize, SmallVec<[u32; 2]>>,
    sizes: Vec<usize>,
}

impl Claims {
    /// Whether `pixels` overlaps any claimed eddy by more than `tolerance`.
    fn overlaps(&self, pixels: &[usize], tolerance: f64) -> bool {
        let mut shared: AHashMap<u32, usize> = AHashMap::new();
        for p in pixels {
            if let Some(owners) = self.owners.get(p) {
                for &o in owners {
                    *shared.entry(o).or_default() += 1;
                }
            }
        }
        shared.into_iter().any(|(owner, n)| {
            let smaller = pixels.len().min(self.sizes[owner as usize]).max(1);
            n as f64 / smaller as f64 > tolerance
        })
    }

    fn claim(&mut self, pixels: &[usize]) {
        let id = self.sizes.len() as u32;
        self.sizes.push(pixels.len());
        for &p in pixels {
            self.owners.entry(p).or_default().push(id);
        }
    }
}

/// Collapse the contours of one frame and one polarity into eddies.
///
/// Arguments
/// -----------------
/// * `levels`: `(level, contours)` pairs in visiting order, either a
///   [`crate::contour::extraction::LevelContours`] or borrowed contours shared between
///   polarities.
/// * `ctx`: evaluation context of the frame and polarity.
///
/// Return
/// ----------
/// * The accepted eddies, in acceptance order, and the outcome counters.
pub fn collapse<I, C>(levels: I, ctx: &EvaluationContext) -> (Vec<EddyObservation>, CollapseReport)
where
    I: IntoIterator<Item = (f64, C)>,
    C: AsRef<[Contour]>,
{
    let tolerance = ctx.config.overlap_tolerance();
    let mut claims = Claims::default();
    let mut eddies = Vec::new();
    let mut report = CollapseReport::default();

    for (_, contours) in levels {
        report.levels += 1;
        for contour in contours.as_ref() {
            report.contours += 1;
            let pixels = ctx.enclosed_pixels(contour);
            if claims.overlaps(&pixels, tolerance) {
                report.skipped_overlap += 1;
                continue;
            }
            match evaluate_pixels(contour, pixels, ctx) {
                Ok(eddy) => {
                    claims.claim(&eddy.region.pixels);
                    eddies.push(eddy);
                    report.accepted += 1;
                }
                Err(rejection) => report.record(&rejection),
            }
        }
    }

    debug!(
        polarity = %ctx.polarity,
        accepted = report.accepted,
        overlap = report.skipped_overlap,
        size = report.rejected_size,
        shape = report.rejected_shape,
        amplitude = report.rejected_amplitude,
        multiple_extrema = report.rejected_multiple_extrema,
        polarity_mismatch = report.rejected_polarity,
        "levels collapsed"
    );
    (eddies, report)
}
