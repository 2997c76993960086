//! # Inter-frame association
//!
//! A [`Tracker`] owns the live [`Track`]s of one polarity. Every frame goes through
//! [`Tracker::step`]:
//!
//! 1. For each active track, the search region is built around its last observation for
//!    the time elapsed since that observation.
//! 2. Every candidate inside the region is scored:
//!
//!    ```text
//!    cost = w_d · d_ellipse + w_a · |ΔA| / max(A) + w_r · |ΔR| / max(R) [+ w_c · (1 - r) / 2]
//!    ```
//!
//!    where the last term, enabled by `use_shape_correlation`, is the Pearson correlation of
//!    the enclosed fields over their shared pixels (`r = 0` when undefined).
//! 3. Pairs are assigned greedily by increasing cost; exact ties go to the earlier candidate,
//!    then to the older track (lower id).
//! 4. Matched tracks are extended, unmatched candidates start new tracks, and unmatched
//!    tracks count a miss. A track closes once its consecutive misses reach the budget
//!    (a budget of `0` behaves as `1`).
//!
//! Closed tracks are handed back to the caller, which persists them. [`Tracker::finish`]
//! force-closes whatever is still active at the end of the input.
use std::collections::BTreeMap;

use hifitime::Epoch;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::{
    config::{CostWeights, EddyConfig},
    constants::{haversine, Days, Meter},
    identification::{EddyObservation, Polarity},
    time::days_between,
};

use super::search_ellipse::SearchEllipse;

pub type TrackId = u64;

/// An observation attached to a track, with the index of its frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub frame: usize,
    pub observation: EddyObservation,
}

/// A trajectory of one eddy.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: TrackId,
    polarity: Polarity,
    points: Vec<TrackPoint>,
    live: bool,
    missed: usize,
}

impl Track {
    fn start(id: TrackId, frame: usize, observation: EddyObservation) -> Self {
        Track {
            id,
            polarity: observation.polarity,
            points: vec![TrackPoint { frame, observation }],
            live: true,
            missed: 0,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn observations(&self) -> impl Iterator<Item = &EddyObservation> + '_ {
        self.points.iter().map(|p| &p.observation)
    }

    /// Last attached observation; a track is never empty.
    pub fn last(&self) -> &TrackPoint {
        &self.points[self.points.len() - 1]
    }

    pub fn first(&self) -> &TrackPoint {
        &self.points[0]
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Consecutive frames without a match.
    pub fn missed_frames(&self) -> usize {
        self.missed
    }

    /// Days between the first and last observations.
    pub fn age_days(&self) -> Days {
        days_between(self.first().observation.epoch, self.last().observation.epoch)
    }

    /// Great-circle distance between the first and last centers.
    pub fn displacement(&self) -> Meter {
        let (a, b) = (&self.first().observation, &self.last().observation);
        haversine(a.center_lon, a.center_lat, b.center_lon, b.center_lat)
    }

    /// Sum of great-circle distances between consecutive centers.
    pub fn path_length(&self) -> Meter {
        self.observations()
            .tuple_windows()
            .map(|(a, b)| haversine(a.center_lon, a.center_lat, b.center_lon, b.center_lat))
            .sum()
    }
}

/// Relative difference `|a - b| / max(|a|, |b|)`, zero when both vanish or are undefined.
fn relative_difference(a: f64, b: f64) -> f64 {
    let m = a.abs().max(b.abs());
    let d = (a - b).abs() / m;
    if d.is_finite() {
        d
    } else {
        0.0
    }
}

/// Association state of one polarity.
#[derive(Debug, Clone)]
pub struct Tracker {
    polarity: Polarity,
    ellipse: SearchEllipse,
    weights: CostWeights,
    use_correlation: bool,
    budget: usize,
    days_between_records: Days,
    active: BTreeMap<TrackId, Track>,
    next_id: TrackId,
}

impl Tracker {
    pub fn new(polarity: Polarity, config: &EddyConfig) -> Self {
        Tracker {
            polarity,
            ellipse: SearchEllipse::new(config.domain(), config.ellipse_latitude_scaling()),
            weights: config.cost_weights(),
            use_correlation: config.use_shape_correlation(),
            budget: config.missed_frame_budget().max(1),
            days_between_records: config.days_between_records(),
            active: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Live tracks, by increasing id.
    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.active.values()
    }

    pub fn n_active(&self) -> usize {
        self.active.len()
    }

    fn cost(&self, last: &EddyObservation, candidate: &EddyObservation, distance: f64) -> f64 {
        let w = &self.weights;
        let mut cost = w.distance * distance
            + w.amplitude * relative_difference(last.amplitude, candidate.amplitude)
            + w.radius * relative_difference(last.effective_radius, candidate.effective_radius);
        if self.use_correlation {
            let r = last.region.correlation(&candidate.region).unwrap_or(0.0);
            cost += w.correlation * (1.0 - r) / 2.0;
        }
        cost
    }

    /// Advance by one frame.
    ///
    /// Arguments
    /// -----------------
    /// * `frame`: index of the frame in the input sequence.
    /// * `epoch`: timestamp of the frame.
    /// * `observations`: eddies of this polarity detected in the frame; their order is the
    ///   candidate insertion order used to break ties.
    ///
    /// Return
    /// ----------
    /// * The tracks closed by this step, by increasing id.
    pub fn step(
        &mut self,
        frame: usize,
        epoch: Epoch,
        observations: Vec<EddyObservation>,
    ) -> Vec<Track> {
        let mut pairs: Vec<(OrderedFloat<f64>, usize, TrackId)> = Vec::new();
        for track in self.active.values() {
            let last = &track.last().observation;
            let mut days = days_between(last.epoch, epoch);
            if !(days > 0.0) {
                days = self.days_between_records * (track.missed + 1) as f64;
            }
            let region = self
                .ellipse
                .region_for(last.center_lon, last.center_lat, days);
            for (k, cand) in observations.iter().enumerate() {
                if cand.polarity != self.polarity {
                    continue;
                }
                let d = region.normalized_distance(cand.center_lon, cand.center_lat);
                if d <= 1.0 {
                    pairs.push((OrderedFloat(self.cost(last, cand, d)), k, track.id));
                }
            }
        }
        pairs.sort_unstable();

        let mut taken = vec![false; observations.len()];
        let mut assigned: BTreeMap<TrackId, usize> = BTreeMap::new();
        for (_, k, id) in pairs {
            if taken[k] || assigned.contains_key(&id) {
                continue;
            }
            taken[k] = true;
            assigned.insert(id, k);
        }

        let mut slots: Vec<Option<EddyObservation>> = observations.into_iter().map(Some).collect();
        let mut closed = Vec::new();
        let ids: Vec<TrackId> = self.active.keys().copied().collect();
        for id in ids {
            let matched = assigned.get(&id).and_then(|&k| slots[k].take());
            let Some(track) = self.active.get_mut(&id) else {
                continue;
            };
            match matched {
                Some(observation) => {
                    track.points.push(TrackPoint { frame, observation });
                    track.missed = 0;
                }
                None => {
                    track.missed += 1;
                    if track.missed >= self.budget {
                        if let Some(mut t) = self.active.remove(&id) {
                            t.live = false;
                            closed.push(t);
                        }
                    }
                }
            }
        }

        let mut births = 0;
        for observation in slots.into_iter().flatten() {
            if observation.polarity != self.polarity {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            self.active.insert(id, Track::start(id, frame, observation));
            births += 1;
        }

        debug!(
            polarity = %self.polarity,
            frame,
            matched = assigned.len(),
            births,
            closed = closed.len(),
            active = self.active.len(),
            "tracker step"
        );
        closed
    }

    /// Close every active track, by increasing id.
    pub fn finish(&mut self) -> Vec<Track> {
        std::mem::take(&mut self.active)
            .into_values()
            .map(|mut t| {
                t.live = false;
                t
            })
            .collect()
    }
}

#[cfg(test)]
mod tracker_test {
    use super::*;
    use crate::{contour::Contour, identification::EnclosedRegion, time::epoch_from_days};
    use approx::assert_relative_eq;

    fn base() -> Epoch {
        Epoch::from_mjd_utc(58_000.0)
    }

    fn eddy(day: f64, lon: f64, lat: f64, amp: f64) -> EddyObservation {
        EddyObservation {
            epoch: epoch_from_days(base(), day).unwrap(),
            polarity: Polarity::Anticyclonic,
            center_lon: lon,
            center_lat: lat,
            amplitude: amp,
            effective_radius: 50_000.0,
            speed_radius: 30_000.0,
            max_speed: 0.3,
            level: 0.0,
            contour: Contour::new(0.0, [(lon, lat), (lon + 0.1, lat), (lon, lat + 0.1)]),
            shape_error: 10.0,
            region: EnclosedRegion::default(),
        }
    }

    fn tracker(budget: usize) -> Tracker {
        let cfg = EddyConfig::builder()
            .missed_frame_budget(budget)
            .build()
            .unwrap();
        Tracker::new(Polarity::Anticyclonic, &cfg)
    }

    fn at(day: f64) -> Epoch {
        epoch_from_days(base(), day).unwrap()
    }

    #[test]
    fn test_two_frames_make_one_track() {
        let mut t = tracker(0);
        assert!(t.step(0, at(0.0), vec![eddy(0.0, 0.0, 0.0, 5.0)]).is_empty());
        assert!(t.step(1, at(1.0), vec![eddy(1.0, 0.1, 0.05, 5.2)]).is_empty());
        let tracks = t.finish();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].len(), 2);
        assert!(!tracks[0].is_live());
        assert_relative_eq!(tracks[0].age_days(), 1.0, epsilon = 1e-9);
        assert!(tracks[0].displacement() > 12_000.0 && tracks[0].displacement() < 13_000.0);
        assert_relative_eq!(tracks[0].path_length(), tracks[0].displacement(), max_relative = 1e-12);
    }

    #[test]
    fn test_far_candidate_is_a_birth() {
        let mut t = tracker(0);
        t.step(0, at(0.0), vec![eddy(0.0, 0.0, 10.0, 5.0)]);
        let closed = t.step(1, at(1.0), vec![eddy(1.0, 3.0, 10.0, 5.0)]);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].id(), 0);
        assert_eq!(t.active_tracks().map(|t| t.id()).collect_vec(), vec![1]);
    }

    #[test]
    fn test_budget_closes_on_nth_miss() {
        let mut t = tracker(3);
        t.step(0, at(0.0), vec![eddy(0.0, 0.0, 10.0, 5.0)]);
        t.step(1, at(1.0), vec![eddy(1.0, 0.05, 10.0, 5.0)]);
        assert!(t.step(2, at(2.0), vec![]).is_empty());
        assert!(t.step(3, at(3.0), vec![]).is_empty());
        let closed = t.step(4, at(4.0), vec![]);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].len(), 2);
        assert_eq!(closed[0].missed_frames(), 3);
    }

    #[test]
    fn test_miss_then_recover_within_budget() {
        let mut t = tracker(2);
        t.step(0, at(0.0), vec![eddy(0.0, 0.0, 10.0, 5.0)]);
        assert!(t.step(1, at(1.0), vec![]).is_empty());
        // two days elapsed: the region has grown accordingly
        t.step(2, at(2.0), vec![eddy(2.0, 0.3, 10.0, 5.0)]);
        let tracks = t.finish();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].len(), 2);
        assert_eq!(tracks[0].points()[1].frame, 2);
    }

    #[test]
    fn test_split_gives_continuation_and_birth() {
        let mut t = tracker(0);
        t.step(0, at(0.0), vec![eddy(0.0, 0.0, 10.0, 5.0)]);
        t.step(
            1,
            at(1.0),
            vec![eddy(1.0, 0.1, 10.0, 2.0), eddy(1.0, -0.05, 10.0, 4.9)],
        );
        let tracks = t.finish();
        assert_eq!(tracks.len(), 2);
        // the closer, more similar candidate continues track 0
        assert_eq!(tracks[0].len(), 2);
        assert_eq!(tracks[0].last().observation.amplitude, 4.9);
        assert_eq!(tracks[1].len(), 1);
    }

    #[test]
    fn test_exact_tie_goes_to_first_candidate() {
        let mut t = tracker(0);
        t.step(0, at(0.0), vec![eddy(0.0, 0.0, 10.0, 5.0)]);
        t.step(
            1,
            at(1.0),
            vec![eddy(1.0, 0.0, 10.1, 5.0), eddy(1.0, 0.0, 9.9, 5.0)],
        );
        let tracks = t.finish();
        assert_eq!(tracks[0].last().observation.center_lat, 10.1);
    }
}
