//! # Tabular display for tracks
//!
//! Borrowing renderers to print a slice of [`Track`]s as a table with `{}`.
//!
//! Two layouts are available:
//!
//! - **Summary** (compact, fixed-width), one line per track:
//!   `Id | Polarity | Obs | Start | End | Age [d] | Displ. [km] | Path [km] | Max amp.`
//! - **Detailed** (uses `comfy-table`), one row per observation:
//!   `Id | Polarity | Frame | Date | Lon | Lat | Amp. | R_eff [km] | R_spd [km] | V_max [m/s]`
//!
//! ```rust,ignore
//! use eddytrack::tracking::TracksDisplayExt;
//!
//! println!("{}", tracks.show().sorted());
//! println!("{}", tracks.table_detailed().with_coordinate_precision(2));
//! ```
use std::fmt;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};

use crate::time::date_string;

use super::tracker::Track;

enum TableMode {
    Summary,
    Detailed,
}

/// Display adaptor rendering borrowed tracks as a table.
///
/// Sorting
/// -----------------
/// * [`Self::sorted`] prints tracks by decreasing length, then by polarity and id.
pub struct TracksDisplay<'a> {
    tracks: &'a [Track],
    mode: TableMode,
    coord_prec: usize,
    sorted: bool,
}

struct TrackSummary {
    id: u64,
    polarity: String,
    n_obs: usize,
    start: String,
    end: String,
    age: f64,
    displacement_km: f64,
    path_km: f64,
    max_amplitude: f64,
}

impl<'a> TracksDisplay<'a> {
    pub fn new(tracks: &'a [Track]) -> Self {
        Self {
            tracks,
            mode: TableMode::Summary,
            coord_prec: 3,
            sorted: false,
        }
    }

    /// Switch to the per-observation layout.
    pub fn detailed(mut self, yes: bool) -> Self {
        self.mode = if yes {
            TableMode::Detailed
        } else {
            TableMode::Summary
        };
        self
    }

    /// Fractional digits of longitudes and latitudes.
    pub fn with_coordinate_precision(mut self, p: usize) -> Self {
        self.coord_prec = p;
        self
    }

    pub fn sorted(mut self) -> Self {
        self.sorted = true;
        self
    }

    fn track_iter(&self) -> Box<dyn Iterator<Item = &Track> + '_> {
        if self.sorted {
            let mut order: Vec<&Track> = self.tracks.iter().collect();
            order.sort_by(|a, b| {
                b.len()
                    .cmp(&a.len())
                    .then_with(|| a.polarity().cmp(&b.polarity()))
                    .then_with(|| a.id().cmp(&b.id()))
            });
            Box::new(order.into_iter())
        } else {
            Box::new(self.tracks.iter())
        }
    }

    fn summarize(&self, t: &Track) -> TrackSummary {
        TrackSummary {
            id: t.id(),
            polarity: t.polarity().to_string(),
            n_obs: t.len(),
            start: date_string(t.first().observation.epoch),
            end: date_string(t.last().observation.epoch),
            age: t.age_days(),
            displacement_km: t.displacement() / 1000.0,
            path_km: t.path_length() / 1000.0,
            max_amplitude: t
                .observations()
                .map(|o| o.amplitude)
                .fold(f64::NAN, f64::max),
        }
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>6}  {:>12}  {:>5}  {:>10}  {:>10}  {:>8}  {:>11}  {:>10}  {:>9}",
            "Id", "Polarity", "Obs", "Start", "End", "Age [d]", "Displ. [km]", "Path [km]", "Max amp."
        )?;
        for t in self.track_iter() {
            let s = self.summarize(t);
            writeln!(
                f,
                "{id:>6}  {pol:>12}  {n:>5}  {start:>10}  {end:>10}  {age:>8.1}  {disp:>11.1}  {path:>10.1}  {amp:>9.3}",
                id = s.id,
                pol = s.polarity,
                n = s.n_obs,
                start = s.start,
                end = s.end,
                age = s.age,
                disp = s.displacement_km,
                path = s.path_km,
                amp = s.max_amplitude
            )?;
        }
        Ok(())
    }

    fn render_detailed_comfy(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Id"),
            Cell::new("Polarity"),
            Cell::new("Frame"),
            Cell::new("Date"),
            Cell::new("Lon"),
            Cell::new("Lat"),
            Cell::new("Amp."),
            Cell::new("R_eff [km]"),
            Cell::new("R_spd [km]"),
            Cell::new("V_max [m/s]"),
        ]);

        let cp = self.coord_prec;
        for t in self.track_iter() {
            for p in t.points() {
                let o = &p.observation;
                table.add_row(Row::from(vec![
                    Cell::new(t.id()).set_alignment(CellAlignment::Right),
                    Cell::new(t.polarity()),
                    Cell::new(p.frame).set_alignment(CellAlignment::Right),
                    Cell::new(date_string(o.epoch)),
                    Cell::new(format!("{:.*}", cp, o.center_lon)).set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.*}", cp, o.center_lat)).set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.3}", o.amplitude)).set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.1}", o.effective_radius / 1000.0))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.1}", o.speed_radius / 1000.0))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(format!("{:.3}", o.max_speed)).set_alignment(CellAlignment::Right),
                ]));
            }
        }

        table.to_string()
    }
}

/// Table adaptors for a collection of tracks.
pub trait TracksDisplayExt {
    /// Compact one-line-per-track table.
    fn show(&self) -> TracksDisplay<'_>;

    /// One row per observation.
    fn table_detailed(&self) -> TracksDisplay<'_>;

    fn show_string(&self) -> String {
        format!("{}", self.show())
    }
}

impl TracksDisplayExt for [Track] {
    fn show(&self) -> TracksDisplay<'_> {
        TracksDisplay::new(self)
    }

    fn table_detailed(&self) -> TracksDisplay<'_> {
        TracksDisplay::new(self).detailed(true)
    }
}

impl TracksDisplayExt for Vec<Track> {
    fn show(&self) -> TracksDisplay<'_> {
        TracksDisplay::new(self)
    }

    fn table_detailed(&self) -> TracksDisplay<'_> {
        TracksDisplay::new(self).detailed(true)
    }
}

impl fmt::Display for TracksDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n_obs: usize = self.tracks.iter().map(Track::len).sum();
        writeln!(f, "Tracks (n={}, observations={n_obs})", self.tracks.len())?;
        writeln!(f, "-------------------")?;
        match self.mode {
            TableMode::Detailed => f.write_str(&self.render_detailed_comfy()),
            TableMode::Summary => self.write_summary(f),
        }
    }
}

#[cfg(test)]
mod tracks_display_test {
    use super::*;
    use crate::{
        config::EddyConfig,
        contour::Contour,
        identification::{EddyObservation, EnclosedRegion, Polarity},
        time::epoch_from_days,
        tracking::tracker::Tracker,
    };
    use hifitime::Epoch;

    fn eddy(day: f64, lon: f64) -> EddyObservation {
        EddyObservation {
            epoch: epoch_from_days(Epoch::from_mjd_utc(58_000.0), day).unwrap(),
            polarity: Polarity::Anticyclonic,
            center_lon: lon,
            center_lat: 30.0,
            amplitude: 0.1,
            effective_radius: 60_000.0,
            speed_radius: 40_000.0,
            max_speed: 0.25,
            level: 0.0,
            contour: Contour::new(0.0, [(lon, 30.0), (lon + 0.1, 30.0), (lon, 30.1)]),
            shape_error: 5.0,
            region: EnclosedRegion::default(),
        }
    }

    fn sample() -> Vec<Track> {
        let cfg = EddyConfig::builder().build().unwrap();
        let mut t = Tracker::new(Polarity::Anticyclonic, &cfg);
        t.step(0, eddy(0.0, 0.0).epoch, vec![eddy(0.0, 0.0), eddy(0.0, 10.0)]);
        let mut closed = t.step(1, eddy(1.0, 0.0).epoch, vec![eddy(1.0, 0.05)]);
        closed.extend(t.finish());
        closed
    }

    #[test]
    fn test_summary_lists_every_track() {
        let tracks = sample();
        let s = tracks.show_string();
        assert!(s.starts_with("Tracks (n=2, observations=3)"));
        assert!(s.contains("Anticyclonic"));
        assert_eq!(s.lines().count(), 2 + 1 + 2);
    }

    #[test]
    fn test_sorted_puts_longest_first() {
        let tracks = sample();
        let s = format!("{}", tracks.show().sorted());
        let first_row = s.lines().nth(3).unwrap();
        assert!(first_row.trim_start().starts_with('0'));
    }

    #[test]
    fn test_detailed_has_one_row_per_observation() {
        let tracks = sample();
        let s = format!("{}", tracks.table_detailed().with_coordinate_precision(2));
        assert!(s.contains("R_eff [km]"));
        assert!(s.contains("60.0"));
        assert!(s.contains("0.05"));
    }
}
