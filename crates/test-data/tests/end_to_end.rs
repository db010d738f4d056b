//! End-to-end tests: procedural tracks are written as GPX, parsed back through
//! the file parser and run through the whole pipeline.

use bytes::Bytes;
use rand::Rng;
use test_data::prelude::*;
use time::{Duration, macros::datetime};
use track_metrics::{
    PipelineError, Track,
    collector::collect_fixes,
    encoding::{from_split_json, to_split_json},
    file_parsers::FileType,
    geodesic::geodesic_distance,
    process_batch, process_bytes, process_parsed,
};

fn run_gpx(file: &ParsedFile) -> Result<Track, PipelineError> {
    let bytes = generate_gpx(file, "fixture");
    process_bytes(FileType::Gpx, Bytes::from(bytes))
}

#[test]
fn test_constant_speed_track_through_gpx() {
    let mut rng = StdRng::seed_from_u64(42);
    let generator = ProceduralGenerator::new().with_speed(18.0).with_interval(5.0);
    let file = ParsedFile::single_segment(generator.generate(200, &mut rng));

    let track = run_gpx(&file).unwrap();

    assert_eq!(track.len(), 199);
    assert!(track.is_time_ordered());
    for sample in &track {
        assert_eq!(sample.dt_seconds, 5.0);
        // 7-decimal coordinates in the GPX cost about a centimetre per point
        assert!(
            (sample.speed_km_per_hr - 18.0).abs() < 0.5,
            "speed {} at {}",
            sample.speed_km_per_hr,
            sample.timestamp
        );
    }

    let expected_km = 18.0 * (199.0 * 5.0) / 3600.0;
    assert!((track.total_distance_km() - expected_km).abs() / expected_km < 0.01);
}

#[test]
fn test_gpx_matches_direct_pipeline() {
    let mut rng = StdRng::seed_from_u64(9);
    let file = ParsedFile::single_segment(ProceduralGenerator::new().generate(50, &mut rng));

    let via_gpx = run_gpx(&file).unwrap();
    let direct = process_parsed(&file).unwrap();

    assert_eq!(via_gpx.len(), direct.len());
    for (a, b) in via_gpx.iter().zip(direct.iter()) {
        assert_eq!(a.timestamp, b.timestamp);
        assert!((a.elevation_km - b.elevation_km).abs() < 1e-12);
        assert!((a.latitude - b.latitude).abs() < 1e-7);
        assert!((a.longitude - b.longitude).abs() < 1e-7);
    }
}

#[test]
fn test_equator_hourly_fixes() {
    let t0 = datetime!(2020-01-01 00:00:00 UTC);
    let points = (0..3)
        .map(|i| TrackPointData {
            lat: 0.0,
            lon: i as f64,
            elevation: Some(0.0),
            timestamp: Some(t0 + Duration::hours(i)),
        })
        .collect();

    let track = run_gpx(&ParsedFile::single_segment(points)).unwrap();
    assert_eq!(track.len(), 2);

    let [first, second] = track.samples() else {
        panic!("expected two samples");
    };
    assert_eq!(first.dt_seconds, 3600.0);
    assert!((first.dx_km - 111.19).abs() < 0.01);
    assert!((first.speed_km_per_hr - 111.19).abs() < 0.01);
    assert!((first.cumulative_distance_km - 111.19).abs() < 0.01);
    assert_eq!(second.dt_seconds, 3600.0);
    assert!((second.dx_km - 111.19).abs() < 0.01);
    assert!((second.cumulative_distance_km - 222.39).abs() < 0.01);
}

#[test]
fn test_duplicate_timestamps_yield_sentinel() {
    let t0 = datetime!(2020-01-01 12:00:00 UTC);
    let points = vec![
        TrackPointData {
            lat: 45.0,
            lon: 7.0,
            elevation: Some(300.0),
            timestamp: Some(t0),
        },
        TrackPointData {
            lat: 45.001,
            lon: 7.001,
            elevation: Some(302.0),
            timestamp: Some(t0),
        },
    ];

    let track = run_gpx(&ParsedFile::single_segment(points)).unwrap();
    assert_eq!(track.len(), 1);

    let sample = &track.samples()[0];
    assert_eq!(sample.dt_seconds, 0.0);
    assert!(sample.speed_km_per_hr.is_nan());
    assert!(sample.dx_km.is_finite() && sample.dx_km > 0.0);
    assert!(sample.cumulative_distance_km.is_finite());
    assert_eq!(track.summary().degenerate_samples, 1);
}

#[test]
fn test_segment_boundary_not_special_cased() {
    let mut rng = StdRng::seed_from_u64(11);
    let file = ProceduralGenerator::new().generate_segmented(2, 20, 1.0, 30.0, &mut rng);

    let track = run_gpx(&file).unwrap();
    assert_eq!(track.len(), 39);

    // sample 19 pairs the last fix of segment one with the first of segment two
    let boundary = &track.samples()[19];
    assert_eq!(boundary.dt_seconds, 30.0);
    assert!(boundary.dx_km > 100.0);
    assert!(boundary.speed_km_per_hr > 10_000.0);

    let others_max = track
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 19)
        .map(|(_, s)| s.dx_km)
        .fold(0.0, f64::max);
    assert!(others_max < 0.01);
}

#[test]
fn test_length_and_monotonicity_properties() {
    let mut rng = StdRng::seed_from_u64(2024);
    for n in [0usize, 1, 2, 3, 17, 120] {
        let generator = ProceduralGenerator::new()
            .with_gps_jitter(4.0)
            .with_interval(rng.gen_range(0.5..10.0));
        let track = process_parsed(&ParsedFile::single_segment(generator.generate(n, &mut rng)))
            .unwrap();

        assert_eq!(track.len(), n.saturating_sub(1));
        assert_eq!(track.is_empty(), n <= 1);
        for w in track.samples().windows(2) {
            assert!(w[0].cumulative_distance_km <= w[1].cumulative_distance_km);
        }
        assert!(track.iter().all(|s| s.dx_km >= 0.0));
    }
}

#[test]
fn test_distance_properties_on_random_fixes() {
    let mut rng = StdRng::seed_from_u64(77);
    let t0 = datetime!(2020-01-01 00:00:00 UTC);
    let points: Vec<TrackPointData> = (0..60)
        .map(|i| TrackPointData {
            lat: rng.gen_range(-90.0..=90.0),
            lon: rng.gen_range(-180.0..=180.0),
            elevation: Some(rng.gen_range(-400.0..9000.0)),
            timestamp: Some(t0 + Duration::minutes(i)),
        })
        .collect();
    let fixes = collect_fixes(&ParsedFile::single_segment(points)).unwrap();

    for a in &fixes {
        assert_eq!(geodesic_distance(a, a), 0.0);
        for b in &fixes {
            let d = geodesic_distance(a, b);
            assert!(d >= 0.0);
            assert_eq!(d, geodesic_distance(b, a));
        }
    }
}

#[test]
fn test_split_json_round_trip_is_lossless() {
    let mut rng = StdRng::seed_from_u64(5);
    let generator = ProceduralGenerator::new()
        .with_gps_jitter(2.0)
        .with_interval(0.25)
        .with_start_time(datetime!(2024-05-18 07:00:00.125 +2));
    let mut points = generator.generate(40, &mut rng);
    // force one undefined speed
    points[10].timestamp = points[9].timestamp;

    // through GPX so the +02:00 wall clock has to survive the parser
    let track = run_gpx(&ParsedFile::single_segment(points)).unwrap();
    let json = to_split_json(&track).unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["index"][0], "2024-05-18T07:00:00.375");
    assert!(value["data"][9][6].is_null());

    let decoded = from_split_json(&json).unwrap();
    assert_eq!(decoded.len(), track.len());
    for (a, b) in track.iter().zip(decoded.iter()) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.latitude, b.latitude);
        assert_eq!(a.longitude, b.longitude);
        assert_eq!(a.elevation_km, b.elevation_km);
        assert_eq!(a.dx_km, b.dx_km);
        assert_eq!(a.cumulative_distance_km, b.cumulative_distance_km);
        assert!(
            a.speed_km_per_hr == b.speed_km_per_hr
                || (a.speed_km_per_hr.is_nan() && b.speed_km_per_hr.is_nan())
        );
    }
}

#[test]
fn test_batch_of_generated_files() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut files: Vec<ParsedFile> = (0..8)
        .map(|i| ParsedFile::single_segment(ProceduralGenerator::new().generate(10 + i, &mut rng)))
        .collect();
    files[3].tracks[0].segments[0].points[4].elevation = None;

    let results = process_batch(&files);
    assert_eq!(results.len(), 8);
    for (i, result) in results.iter().enumerate() {
        if i == 3 {
            assert!(matches!(
                result,
                Err(PipelineError::MalformedInput { index: 4, .. })
            ));
        } else {
            assert_eq!(result.as_ref().unwrap().len(), 10 + i - 1);
        }
    }
}
