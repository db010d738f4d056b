//! Data model shared by the pipeline stages.
//!
//! The `Parsed*` types are the hand-off point from a file parser: a nested
//! tracks → segments → points structure in source units. [`RawFix`] is a
//! validated, unit-normalised fix and [`DerivedSample`] is one row of the
//! finished motion series.

use geo::geometry::Point;
use time::{OffsetDateTime, PrimitiveDateTime};

/// A track point as handed over by a file parser.
///
/// Elevation is in metres and the timestamp keeps whatever offset the source
/// carried. Fields are optional because parsers may not find them; the
/// collector rejects points that lack them.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPointData {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub timestamp: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSegment {
    pub points: Vec<TrackPointData>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTrack {
    pub name: Option<String>,
    pub segments: Vec<ParsedSegment>,
}

/// Everything a parser extracted from one file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub tracks: Vec<ParsedTrack>,
}

impl ParsedFile {
    /// Wraps a flat list of points as a single track with a single segment.
    pub fn single_segment(points: Vec<TrackPointData>) -> Self {
        Self {
            tracks: vec![ParsedTrack {
                name: None,
                segments: vec![ParsedSegment { points }],
            }],
        }
    }

    /// Total number of points across all tracks and segments.
    pub fn point_count(&self) -> usize {
        self.tracks
            .iter()
            .flat_map(|t| &t.segments)
            .map(|s| s.points.len())
            .sum()
    }
}

/// One recorded observation after ingestion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFix {
    /// Civil date-time; any source offset has been dropped, not converted.
    pub timestamp: PrimitiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_km: f64,
}

impl RawFix {
    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// One row of the derived series, paired with every fix except the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedSample {
    pub timestamp: PrimitiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_km: f64,
    /// Seconds since the previous fix. Zero or negative for duplicated or
    /// out-of-order timestamps.
    pub dt_seconds: f64,
    pub dx_km: f64,
    /// `NaN` when `dt_seconds <= 0`.
    pub speed_km_per_hr: f64,
    pub cumulative_distance_km: f64,
}

impl DerivedSample {
    /// True when the speed for this sample is the not-a-number sentinel.
    pub fn is_degenerate(&self) -> bool {
        self.speed_km_per_hr.is_nan()
    }
}
