//! # Track persistence
//!
//! Closed tracks are handed to a [`TrackArchive`] as soon as the tracker releases them,
//! so memory stays bounded by the number of live tracks.
//!
//! [`CsvTrackArchive`] writes one row per observation:
//!
//! ```text
//! track_id,polarity,frame,mjd_utc,date,lon,lat,amplitude,effective_radius,speed_radius,max_speed,level,contour
//! 0,Anticyclonic,0,58000,2017-09-04,0,0,5,50000,30000,0.3,0,0:0;0.1:0;0:0.1;0:0
//! ```
//!
//! `contour` is the closed ring as `lon:lat` pairs separated by `;`. Floats are written
//! with their shortest round-trip representation, so [`read_archive`] gives back exactly
//! what was written.
use std::fs::File;
use std::io::{BufWriter, Read, Write};

use camino::Utf8Path;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{eddy_errors::EddyError, identification::Polarity, time::date_string};

use super::tracker::{Track, TrackId};

/// Destination of closed tracks.
pub trait TrackArchive {
    fn write_track(&mut self, track: &Track) -> Result<(), EddyError>;

    fn flush(&mut self) -> Result<(), EddyError> {
        Ok(())
    }
}

impl TrackArchive for Vec<Track> {
    fn write_track(&mut self, track: &Track) -> Result<(), EddyError> {
        self.push(track.clone());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveRow {
    track_id: TrackId,
    polarity: String,
    frame: usize,
    mjd_utc: f64,
    date: String,
    lon: f64,
    lat: f64,
    amplitude: f64,
    effective_radius: f64,
    speed_radius: f64,
    max_speed: f64,
    level: f64,
    contour: String,
}

fn format_contour(lon: &[f64], lat: &[f64]) -> String {
    lon.iter()
        .zip(lat)
        .map(|(x, y)| format!("{x}:{y}"))
        .join(";")
}

fn parse_contour(s: &str) -> Result<Vec<(f64, f64)>, EddyError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .map(|pair| {
            let (x, y) = pair
                .split_once(':')
                .ok_or_else(|| EddyError::ArchiveFormat(format!("contour vertex '{pair}'")))?;
            let x = x
                .parse::<f64>()
                .map_err(|_| EddyError::ArchiveFormat(format!("contour vertex '{pair}'")))?;
            let y = y
                .parse::<f64>()
                .map_err(|_| EddyError::ArchiveFormat(format!("contour vertex '{pair}'")))?;
            Ok((x, y))
        })
        .collect()
}

/// CSV archive over any writer.
pub struct CsvTrackArchive<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvTrackArchive<BufWriter<File>> {
    /// Create (or truncate) the archive file at `path`.
    pub fn create(path: &Utf8Path) -> Result<Self, EddyError> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> CsvTrackArchive<W> {
    pub fn from_writer(writer: W) -> Self {
        CsvTrackArchive {
            writer: csv::Writer::from_writer(writer),
            rows: 0,
        }
    }

    /// Number of observation rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and give back the underlying writer.
    pub fn into_inner(self) -> Result<W, EddyError> {
        self.writer
            .into_inner()
            .map_err(|e| EddyError::IoError(e.into_error()))
    }
}

impl<W: Write> TrackArchive for CsvTrackArchive<W> {
    fn write_track(&mut self, track: &Track) -> Result<(), EddyError> {
        for point in track.points() {
            let obs = &point.observation;
            self.writer.serialize(ArchiveRow {
                track_id: track.id(),
                polarity: track.polarity().to_string(),
                frame: point.frame,
                mjd_utc: obs.epoch.to_mjd_utc_days(),
                date: date_string(obs.epoch),
                lon: obs.center_lon,
                lat: obs.center_lat,
                amplitude: obs.amplitude,
                effective_radius: obs.effective_radius,
                speed_radius: obs.speed_radius,
                max_speed: obs.max_speed,
                level: obs.level,
                contour: format_contour(obs.contour.lon(), obs.contour.lat()),
            })?;
            self.rows += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EddyError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One observation read back from an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedObservation {
    pub frame: usize,
    pub mjd_utc: f64,
    pub lon: f64,
    pub lat: f64,
    pub amplitude: f64,
    pub effective_radius: f64,
    pub speed_radius: f64,
    pub max_speed: f64,
    pub level: f64,
    pub contour: Vec<(f64, f64)>,
}

/// One track read back from an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedTrack {
    pub id: TrackId,
    pub polarity: Polarity,
    pub observations: Vec<ArchivedObservation>,
}

/// Read a CSV archive; rows of one track must be contiguous.
///
/// Return
/// ----------
/// * The tracks in file order, or [`EddyError::ArchiveFormat`] / [`EddyError::CsvError`]
///   on malformed input.
pub fn read_archive<R: Read>(reader: R) -> Result<Vec<ArchivedTrack>, EddyError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut tracks: Vec<ArchivedTrack> = Vec::new();
    for row in csv_reader.deserialize::<ArchiveRow>() {
        let row = row?;
        let polarity: Polarity = row.polarity.parse()?;
        let observation = ArchivedObservation {
            frame: row.frame,
            mjd_utc: row.mjd_utc,
            lon: row.lon,
            lat: row.lat,
            amplitude: row.amplitude,
            effective_radius: row.effective_radius,
            speed_radius: row.speed_radius,
            max_speed: row.max_speed,
            level: row.level,
            contour: parse_contour(&row.contour)?,
        };
        match tracks.last_mut() {
            Some(t) if t.id == row.track_id && t.polarity == polarity => {
                t.observations.push(observation)
            }
            _ => tracks.push(ArchivedTrack {
                id: row.track_id,
                polarity,
                observations: vec![observation],
            }),
        }
    }
    Ok(tracks)
}

/// Read the CSV archive stored at `path`.
pub fn read_archive_path(path: &Utf8Path) -> Result<Vec<ArchivedTrack>, EddyError> {
    read_archive(File::open(path)?)
}
