//! Procedural track generation.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use time::{Duration, OffsetDateTime, macros::datetime};
use track_metrics::models::{ParsedFile, ParsedSegment, ParsedTrack, TrackPointData};

/// Kilometres per degree of latitude on the 6371 km sphere.
const KM_PER_DEGREE: f64 = 111.194_926_644_558_73;

/// Configuration for procedural track generation.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Starting point (lat, lon).
    pub start_point: (f64, f64),
    /// Timestamp of the first point, including its offset.
    pub start_time: OffsetDateTime,
    /// Ground speed in km/h.
    pub speed_km_per_hr: f64,
    /// Seconds between consecutive points.
    pub sample_interval_s: f64,
    /// Elevation of the first point in metres.
    pub start_elevation_m: f64,
    /// Standard deviation of the per-step elevation change in metres.
    pub elevation_step_m: f64,
    /// GPS position jitter standard deviation in metres.
    pub gps_jitter_m: f64,
    /// Maximum heading change per step in radians.
    pub heading_wander: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            start_point: (40.0150, -105.2705),
            start_time: datetime!(2024-05-18 07:00:00 UTC),
            speed_km_per_hr: 12.0,
            sample_interval_s: 1.0,
            start_elevation_m: 1650.0,
            elevation_step_m: 0.5,
            gps_jitter_m: 0.0,
            heading_wander: 0.2,
        }
    }
}

/// Generates synthetic GPS tracks moving at a constant ground speed.
#[derive(Debug, Clone, Default)]
pub struct ProceduralGenerator {
    config: TrackConfig,
}

impl ProceduralGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    pub fn with_start(mut self, lat: f64, lon: f64) -> Self {
        self.config.start_point = (lat, lon);
        self
    }

    pub fn with_start_time(mut self, start_time: OffsetDateTime) -> Self {
        self.config.start_time = start_time;
        self
    }

    pub fn with_speed(mut self, km_per_hr: f64) -> Self {
        self.config.speed_km_per_hr = km_per_hr;
        self
    }

    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.config.sample_interval_s = seconds;
        self
    }

    /// Negative or NaN jitter is treated as none.
    pub fn with_gps_jitter(mut self, meters: f64) -> Self {
        self.config.gps_jitter_m = meters.max(0.0);
        self
    }

    pub fn with_elevation(mut self, start_m: f64, step_m: f64) -> Self {
        self.config.start_elevation_m = start_m;
        self.config.elevation_step_m = step_m.max(0.0);
        self
    }

    /// Generates `count` points as a random walk with momentum.
    pub fn generate(&self, count: usize, rng: &mut impl Rng) -> Vec<TrackPointData> {
        let c = &self.config;
        let step_km = c.speed_km_per_hr * c.sample_interval_s / 3600.0;

        let jitter_deg = c.gps_jitter_m / 1000.0 / KM_PER_DEGREE;

        let mut heading = rng.gen_range(0.0..std::f64::consts::TAU);
        let (mut lat, mut lon) = c.start_point;
        let mut elevation = c.start_elevation_m;

        let mut points = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                if c.heading_wander > 0.0 {
                    heading += rng.gen_range(-c.heading_wander..c.heading_wander);
                }
                lat += step_km * heading.cos() / KM_PER_DEGREE;
                lon += step_km * heading.sin() / (KM_PER_DEGREE * lat.to_radians().cos());
                elevation += gaussian(rng, c.elevation_step_m);
            }

            let timestamp = c.start_time + Duration::seconds_f64(i as f64 * c.sample_interval_s);
            points.push(TrackPointData {
                lat: lat + gaussian(rng, jitter_deg),
                lon: lon + gaussian(rng, jitter_deg),
                elevation: Some(elevation),
                timestamp: Some(timestamp),
            });
        }

        points
    }

    /// Generates one track split into `segments` segments of `per_segment`
    /// points each. Each new segment starts `jump_deg` degrees north-east of
    /// where the previous one ended and `pause_s` seconds later.
    pub fn generate_segmented(
        &self,
        segments: usize,
        per_segment: usize,
        jump_deg: f64,
        pause_s: f64,
        rng: &mut impl Rng,
    ) -> ParsedFile {
        let mut generator = self.clone();
        let mut parsed_segments = Vec::with_capacity(segments);

        for _ in 0..segments {
            let points = generator.generate(per_segment, rng);
            if let Some(last) = points.last() {
                let resume = last.timestamp.unwrap_or(generator.config.start_time)
                    + Duration::seconds_f64(pause_s);
                generator = generator
                    .with_start(last.lat + jump_deg, last.lon + jump_deg)
                    .with_start_time(resume);
            }
            parsed_segments.push(ParsedSegment { points });
        }

        ParsedFile {
            tracks: vec![ParsedTrack {
                name: Some("procedural".to_string()),
                segments: parsed_segments,
            }],
        }
    }
}

/// Zero-mean normal sample with standard deviation `sd`.
fn gaussian(rng: &mut impl Rng, sd: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    z * sd
}
