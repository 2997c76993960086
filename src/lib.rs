//! # eddytrack
//!
//! Identification and tracking of mesoscale ocean eddies in gridded sea-surface fields.
//!
//! Each frame is contoured at a set of levels; closed contours that enclose a plausible
//! eddy (size, shape, amplitude, single extremum) are kept, one per coherent structure
//! and polarity. Eddies of successive frames are then linked into tracks with a search
//! ellipse and a similarity cost.
//!
//! ```rust,ignore
//! use eddytrack::{config::EddyConfig, pipeline::EddyTracker, tracking::CsvTrackArchive};
//!
//! let config = EddyConfig::builder()
//!     .bounding_box(-30.0, 10.0, 20.0, 50.0)
//!     .missed_frame_budget(2)
//!     .build()?;
//! let mut archive = CsvTrackArchive::create("tracks.csv".into())?;
//! let summary = EddyTracker::new(config).run(frames, &mut archive)?;
//! ```
pub mod config;
pub mod constants;
pub mod contour;
pub mod eddy_errors;
pub mod grid;
pub mod identification;
pub mod pipeline;
pub mod time;
pub mod tracking;

pub use config::{EddyConfig, EddyConfigBuilder};
pub use eddy_errors::EddyError;
pub use pipeline::{EddyTracker, FrameEddies, RunSummary};
