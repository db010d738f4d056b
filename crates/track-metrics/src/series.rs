//! The finished motion series and lookups keyed by timestamp.
//!
//! A [`Track`] keeps samples in the order they were derived. Nothing here
//! sorts: if the source fixes went backwards in time, the keys go backwards
//! too, and [`Track::ordering_violations`] reports where.

use serde::Serialize;
use time::PrimitiveDateTime;

use crate::models::DerivedSample;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    samples: Vec<DerivedSample>,
}

/// Aggregate figures over a whole [`Track`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSummary {
    pub samples: usize,
    pub total_distance_km: f64,
    /// Sum of `dt_seconds` over all samples.
    pub elapsed_seconds: f64,
    pub max_speed_km_per_hr: Option<f64>,
    /// Total distance over the time of samples where time moved forward.
    pub mean_speed_km_per_hr: Option<f64>,
    pub degenerate_samples: usize,
}

/// Wraps derived samples as a track, logging any time-ordering problems.
pub fn assemble(samples: Vec<DerivedSample>) -> Track {
    let track = Track::from_samples(samples);

    let violations = track.ordering_violations();
    if !violations.is_empty() {
        tracing::warn!(
            count = violations.len(),
            first = violations[0],
            "track timestamps are not in chronological order"
        );
    }

    track
}

impl Track {
    pub fn from_samples(samples: Vec<DerivedSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[DerivedSample] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<DerivedSample> {
        self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DerivedSample> {
        self.samples.iter()
    }

    pub fn first(&self) -> Option<&DerivedSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&DerivedSample> {
        self.samples.last()
    }

    /// Series keys in series order.
    pub fn timestamps(&self) -> impl Iterator<Item = PrimitiveDateTime> + '_ {
        self.samples.iter().map(|s| s.timestamp)
    }

    /// First sample whose key equals `timestamp`.
    pub fn get(&self, timestamp: PrimitiveDateTime) -> Option<&DerivedSample> {
        self.samples.iter().find(|s| s.timestamp == timestamp)
    }

    /// Sample closest in time to `timestamp`; ties go to the earlier position.
    pub fn nearest(&self, timestamp: PrimitiveDateTime) -> Option<&DerivedSample> {
        if self.samples.is_empty() {
            return None;
        }

        if self.is_time_ordered() {
            let idx = self.samples.partition_point(|s| s.timestamp < timestamp);
            let candidates = [idx.checked_sub(1), Some(idx)];
            return candidates
                .into_iter()
                .flatten()
                .filter_map(|i| self.samples.get(i))
                .min_by_key(|s| (s.timestamp - timestamp).abs());
        }

        self.samples
            .iter()
            .min_by_key(|s| (s.timestamp - timestamp).abs())
    }

    /// Samples with `start <= timestamp <= end`, in series order.
    pub fn between(
        &self,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> impl Iterator<Item = &DerivedSample> + '_ {
        self.samples
            .iter()
            .filter(move |s| s.timestamp >= start && s.timestamp <= end)
    }

    /// True when keys never decrease.
    pub fn is_time_ordered(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
    }

    /// Positions whose key is earlier than the key before them.
    pub fn ordering_violations(&self) -> Vec<usize> {
        self.samples
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[1].timestamp < w[0].timestamp)
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Number of samples sharing their key with the sample right before them.
    pub fn duplicate_timestamps(&self) -> usize {
        self.samples
            .windows(2)
            .filter(|w| w[0].timestamp == w[1].timestamp)
            .count()
    }

    pub fn total_distance_km(&self) -> f64 {
        self.last().map_or(0.0, |s| s.cumulative_distance_km)
    }

    pub fn summary(&self) -> TrackSummary {
        let mut elapsed_seconds = 0.0;
        let mut moving_seconds = 0.0;
        let mut max_speed: Option<f64> = None;
        let mut degenerate_samples = 0;

        for s in &self.samples {
            elapsed_seconds += s.dt_seconds;
            if s.is_degenerate() {
                degenerate_samples += 1;
                continue;
            }
            moving_seconds += s.dt_seconds;
            max_speed = Some(max_speed.map_or(s.speed_km_per_hr, |m| m.max(s.speed_km_per_hr)));
        }

        let total_distance_km = self.total_distance_km();
        let mean_speed_km_per_hr =
            (moving_seconds > 0.0).then(|| total_distance_km / (moving_seconds / 3600.0));

        TrackSummary {
            samples: self.samples.len(),
            total_distance_km,
            elapsed_seconds,
            max_speed_km_per_hr: max_speed,
            mean_speed_km_per_hr,
            degenerate_samples,
        }
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a DerivedSample;
    type IntoIter = std::slice::Iter<'a, DerivedSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
