//! Frame timing.
//!
//! [`FrameTimer`] accumulates the wall-clock duration of every processed frame. It reports
//! the run mean (total time over frames), the slowest frame and a smoothed recent duration
//! `recent ← α·dt + (1-α)·recent`, `α ∈ (0, 1]`, seeded by the first frame.
//!
//! With the `progress` feature, [`FrameProgress`] drives an `indicatif` spinner showing the
//! last and recent frame durations.
use std::time::{Duration, Instant};

pub struct FrameTimer {
    started: Instant,
    total: Duration,
    slowest: Duration,
    recent: Option<Duration>,
    alpha: f64,
    frames: u32,
}

impl FrameTimer {
    /// `alpha` is clamped into `(0, 1]`.
    pub fn new(alpha: f64) -> Self {
        FrameTimer {
            started: Instant::now(),
            total: Duration::ZERO,
            slowest: Duration::ZERO,
            recent: None,
            alpha: alpha.clamp(f64::MIN_POSITIVE, 1.0),
            frames: 0,
        }
    }

    /// Start timing a new frame.
    pub fn start_frame(&mut self) {
        self.started = Instant::now();
    }

    /// Stop timing the current frame, record it and return its duration.
    pub fn finish_frame(&mut self) -> Duration {
        let dt = self.started.elapsed();
        self.record(dt);
        dt
    }

    /// Record one frame duration.
    pub fn record(&mut self, dt: Duration) {
        self.frames += 1;
        self.total += dt;
        self.slowest = self.slowest.max(dt);
        self.recent = Some(match self.recent {
            None => dt,
            Some(prev) => dt.mul_f64(self.alpha) + prev.mul_f64(1.0 - self.alpha),
        });
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    /// Mean frame duration over the run; zero before the first frame.
    pub fn mean(&self) -> Duration {
        self.total.checked_div(self.frames).unwrap_or_default()
    }

    /// Smoothed duration of the latest frames.
    pub fn recent(&self) -> Duration {
        self.recent.unwrap_or_default()
    }

    pub fn slowest(&self) -> Duration {
        self.slowest
    }
}

/// Short human-readable duration: `"253µs"`, `"42ms"`, `"3.14s"` or `"2m05s"`.
pub fn fmt_dur(d: Duration) -> String {
    match d.as_micros() {
        us @ 0..=999 => format!("{us}µs"),
        us @ 1_000..=999_999 => format!("{}ms", us / 1_000),
        _ if d.as_secs() < 60 => format!("{:.2}s", d.as_secs_f64()),
        _ => format!("{}m{:02}s", d.as_secs() / 60, d.as_secs() % 60),
    }
}

#[cfg(feature = "progress")]
pub use progress::FrameProgress;

#[cfg(feature = "progress")]
mod progress {
    use std::time::Duration;

    use indicatif::{ProgressBar, ProgressStyle};

    use super::fmt_dur;

    /// Progress bar over an input of unknown length.
    pub struct FrameProgress {
        pb: ProgressBar,
    }

    impl FrameProgress {
        pub fn new() -> Self {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::with_template("{spinner} {pos} frames | {per_sec} | {msg}")
            {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(200));
            FrameProgress { pb }
        }

        pub fn frame_done(&self, last: Duration, recent: Duration) {
            self.pb
                .set_message(format!("last: {}, recent: {}", fmt_dur(last), fmt_dur(recent)));
            self.pb.inc(1);
        }

        pub fn interrupted(&self) {
            self.pb.set_message("Interrupted");
        }

        pub fn finish(&self) {
            self.pb.disable_steady_tick();
            self.pb.finish_and_clear();
        }
    }

    impl Default for FrameProgress {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(test)]
mod frame_timer_test {
    use super::*;

    fn close(a: Duration, b: Duration) -> bool {
        a.as_nanos().abs_diff(b.as_nanos()) <= 1_000
    }

    #[test]
    fn test_fmt_dur_scales() {
        assert_eq!(fmt_dur(Duration::from_micros(253)), "253µs");
        assert_eq!(fmt_dur(Duration::from_millis(42)), "42ms");
        assert_eq!(fmt_dur(Duration::from_millis(3140)), "3.14s");
        assert_eq!(fmt_dur(Duration::from_secs(125)), "2m05s");
    }

    #[test]
    fn test_mean_is_total_over_frames() {
        let mut t = FrameTimer::new(0.5);
        assert_eq!(t.mean(), Duration::ZERO);
        assert_eq!(t.recent(), Duration::ZERO);
        for ms in [10, 30, 50] {
            t.record(Duration::from_millis(ms));
        }
        assert_eq!(t.frames(), 3);
        assert_eq!(t.total(), Duration::from_millis(90));
        assert_eq!(t.mean(), Duration::from_millis(30));
        assert_eq!(t.slowest(), Duration::from_millis(50));
        // 10 -> 20 -> 35
        assert!(close(t.recent(), Duration::from_millis(35)), "{:?}", t.recent());
    }

    #[test]
    fn test_first_frame_seeds_recent() {
        let mut t = FrameTimer::new(0.2);
        t.start_frame();
        let dt = t.finish_frame();
        assert_eq!(t.frames(), 1);
        assert_eq!(t.recent(), dt);
        assert_eq!(t.mean(), dt);
    }
}
