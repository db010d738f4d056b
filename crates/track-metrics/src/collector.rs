//! Flattens parsed tracks into one ordered fix sequence.
//!
//! Points are appended track by track and segment by segment in file order.
//! Segment boundaries are not marked; whatever jump lies between the last
//! point of one segment and the first of the next is left for the metric
//! stage to measure.

use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
    errors::{FixDefect, PipelineError},
    geodesic::EARTH_RADIUS_KM,
    models::{ParsedFile, RawFix, TrackPointData},
};

const METRES_PER_KM: f64 = 1000.0;

pub fn collect_fixes(file: &ParsedFile) -> Result<Vec<RawFix>, PipelineError> {
    let mut fixes = Vec::with_capacity(file.point_count());

    for (track_idx, track) in file.tracks.iter().enumerate() {
        for (segment_idx, segment) in track.segments.iter().enumerate() {
            for (point_idx, point) in segment.points.iter().enumerate() {
                let fix = to_raw_fix(point).map_err(|defect| PipelineError::MalformedInput {
                    index: fixes.len(),
                    track: track_idx,
                    segment: segment_idx,
                    point: point_idx,
                    defect,
                })?;
                fixes.push(fix);
            }
        }
    }

    tracing::debug!(
        tracks = file.tracks.len(),
        fixes = fixes.len(),
        "collected fixes"
    );

    Ok(fixes)
}

/// Validates one parser point and normalises it: metres to kilometres, and the
/// timestamp reduced to its civil date-time.
pub fn to_raw_fix(point: &TrackPointData) -> Result<RawFix, FixDefect> {
    if !point.lat.is_finite() {
        return Err(FixDefect::NonFinite("latitude"));
    }
    if !point.lon.is_finite() {
        return Err(FixDefect::NonFinite("longitude"));
    }
    if !(-90.0..=90.0).contains(&point.lat) {
        return Err(FixDefect::LatitudeOutOfRange(point.lat));
    }
    if !(-180.0..=180.0).contains(&point.lon) {
        return Err(FixDefect::LongitudeOutOfRange(point.lon));
    }

    let elevation = point.elevation.ok_or(FixDefect::MissingElevation)?;
    if !elevation.is_finite() {
        return Err(FixDefect::NonFinite("elevation"));
    }
    if elevation / METRES_PER_KM <= -EARTH_RADIUS_KM {
        return Err(FixDefect::ElevationBelowCentre(elevation));
    }
    let timestamp = point.timestamp.ok_or(FixDefect::MissingTimestamp)?;

    Ok(RawFix {
        timestamp: strip_offset(timestamp),
        latitude: point.lat,
        longitude: point.lon,
        elevation_km: elevation / METRES_PER_KM,
    })
}

/// Keeps the wall-clock reading and drops the offset without converting to UTC.
pub fn strip_offset(timestamp: OffsetDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(timestamp.date(), timestamp.time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParsedSegment, ParsedTrack};
    use time::macros::{datetime, offset};

    fn point(lat: f64, lon: f64, ele: f64, ts: OffsetDateTime) -> TrackPointData {
        TrackPointData {
            lat,
            lon,
            elevation: Some(ele),
            timestamp: Some(ts),
        }
    }

    fn segment(points: Vec<TrackPointData>) -> ParsedSegment {
        ParsedSegment { points }
    }

    #[test]
    fn test_empty_file_yields_no_fixes() {
        let fixes = collect_fixes(&ParsedFile::default()).unwrap();
        assert!(fixes.is_empty());

        let empty_segments = ParsedFile {
            tracks: vec![ParsedTrack {
                name: Some("empty".into()),
                segments: vec![segment(vec![]), segment(vec![])],
            }],
        };
        assert!(collect_fixes(&empty_segments).unwrap().is_empty());
    }

    #[test]
    fn test_concatenates_in_file_order() {
        let t0 = datetime!(2021-03-04 10:00:00 UTC);
        let file = ParsedFile {
            tracks: vec![
                ParsedTrack {
                    name: None,
                    segments: vec![
                        segment(vec![point(1.0, 1.0, 0.0, t0), point(2.0, 2.0, 0.0, t0)]),
                        segment(vec![point(3.0, 3.0, 0.0, t0)]),
                    ],
                },
                ParsedTrack {
                    name: None,
                    segments: vec![segment(vec![]), segment(vec![point(4.0, 4.0, 0.0, t0)])],
                },
            ],
        };

        let fixes = collect_fixes(&file).unwrap();
        let lats: Vec<f64> = fixes.iter().map(|f| f.latitude).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_no_resorting_of_out_of_order_times() {
        let late = datetime!(2021-03-04 10:05:00 UTC);
        let early = datetime!(2021-03-04 10:00:00 UTC);
        let file = ParsedFile::single_segment(vec![
            point(0.0, 0.0, 0.0, late),
            point(0.0, 0.1, 0.0, early),
        ]);

        let fixes = collect_fixes(&file).unwrap();
        assert_eq!(fixes[0].timestamp, datetime!(2021-03-04 10:05:00));
        assert_eq!(fixes[1].timestamp, datetime!(2021-03-04 10:00:00));
    }

    #[test]
    fn test_elevation_converted_to_km() {
        let fix = to_raw_fix(&point(
            40.0,
            -105.0,
            1650.0,
            datetime!(2021-03-04 10:00:00 UTC),
        ))
        .unwrap();
        assert!((fix.elevation_km - 1.65).abs() < 1e-12);
    }

    #[test]
    fn test_offset_discarded_not_converted() {
        let local = datetime!(2021-03-04 10:00:00.250).assume_offset(offset!(+2));
        assert_eq!(strip_offset(local), datetime!(2021-03-04 10:00:00.250));

        let west = datetime!(2021-03-04 23:30:00).assume_offset(offset!(-7));
        assert_eq!(strip_offset(west), datetime!(2021-03-04 23:30:00));
    }

    #[test]
    fn test_missing_fields_reported_with_index() {
        let t0 = datetime!(2021-03-04 10:00:00 UTC);
        let mut bad = point(1.0, 1.0, 10.0, t0);
        bad.timestamp = None;

        let file = ParsedFile {
            tracks: vec![ParsedTrack {
                name: None,
                segments: vec![
                    segment(vec![point(0.0, 0.0, 0.0, t0), point(0.5, 0.5, 0.0, t0)]),
                    segment(vec![point(0.9, 0.9, 0.0, t0), bad]),
                ],
            }],
        };

        match collect_fixes(&file) {
            Err(PipelineError::MalformedInput {
                index,
                track,
                segment,
                point,
                defect,
            }) => {
                assert_eq!(index, 3);
                assert_eq!((track, segment, point), (0, 1, 1));
                assert_eq!(defect, FixDefect::MissingTimestamp);
            }
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_elevation_is_malformed() {
        let mut p = point(1.0, 1.0, 0.0, datetime!(2021-03-04 10:00:00 UTC));
        p.elevation = None;
        assert_eq!(to_raw_fix(&p), Err(FixDefect::MissingElevation));
    }

    #[test]
    fn test_coordinate_range_checked() {
        let t0 = datetime!(2021-03-04 10:00:00 UTC);
        assert_eq!(
            to_raw_fix(&point(91.0, 0.0, 0.0, t0)),
            Err(FixDefect::LatitudeOutOfRange(91.0))
        );
        assert_eq!(
            to_raw_fix(&point(0.0, -180.5, 0.0, t0)),
            Err(FixDefect::LongitudeOutOfRange(-180.5))
        );
        assert_eq!(
            to_raw_fix(&point(f64::NAN, 0.0, 0.0, t0)),
            Err(FixDefect::NonFinite("latitude"))
        );
        assert_eq!(
            to_raw_fix(&point(0.0, 0.0, f64::INFINITY, t0)),
            Err(FixDefect::NonFinite("elevation"))
        );
        assert!(to_raw_fix(&point(-90.0, 180.0, -10.0, t0)).is_ok());
    }

    #[test]
    fn test_elevation_below_earth_centre_is_malformed() {
        let t0 = datetime!(2021-03-04 10:00:00 UTC);
        assert_eq!(
            to_raw_fix(&point(0.0, 0.0, -6_371_000.0, t0)),
            Err(FixDefect::ElevationBelowCentre(-6_371_000.0))
        );
        assert_eq!(
            to_raw_fix(&point(0.0, 0.0, -7.0e6, t0)),
            Err(FixDefect::ElevationBelowCentre(-7.0e6))
        );
        // Dead Sea shore and Challenger Deep depths are fine
        assert!(to_raw_fix(&point(31.5, 35.5, -430.0, t0)).is_ok());
        assert!(to_raw_fix(&point(11.35, 142.2, -10_935.0, t0)).is_ok());
    }
}
