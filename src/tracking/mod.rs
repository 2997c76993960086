//! # Eddy tracking
//!
//! Links the eddies detected in successive frames into trajectories.
//!
//! * [`search_ellipse`]: where an eddy may have moved within a given time.
//! * [`tracker`]: greedy cost-based association, births and closures, one [`Tracker`]
//!   per polarity.
//! * [`archive`]: persistence of closed tracks ([`TrackArchive`], CSV implementation).
//! * [`display`]: tables of tracks for terminal output.
pub mod archive;
pub mod display;
pub mod search_ellipse;
pub mod tracker;

pub use archive::{
    read_archive, read_archive_path, ArchivedObservation, ArchivedTrack, CsvTrackArchive,
    TrackArchive,
};
pub use display::{TracksDisplay, TracksDisplayExt};
pub use search_ellipse::{region_for, SearchEllipse, SearchRegion};
pub use tracker::{Track, TrackId, TrackPoint, Tracker};
