//! Derives per-sample motion metrics from consecutive fixes.

use crate::{
    geodesic::geodesic_distance,
    models::{DerivedSample, RawFix},
};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Walks the fixes once, pairing each with its predecessor.
///
/// Returns one sample per fix after the first, so fewer than two fixes give
/// an empty result. The cumulative distance is a running sum of `dx_km`
/// starting at the second fix.
pub fn derive_samples(fixes: &[RawFix]) -> Vec<DerivedSample> {
    let samples: Vec<DerivedSample> = fixes
        .windows(2)
        .scan(0.0, |cumulative_km, pair| {
            let sample = derive_sample(&pair[0], &pair[1], *cumulative_km);
            *cumulative_km = sample.cumulative_distance_km;
            Some(sample)
        })
        .collect();

    let degenerate = samples.iter().filter(|s| s.is_degenerate()).count();
    if degenerate > 0 {
        tracing::debug!(degenerate, total = samples.len(), "samples with undefined speed");
    }

    samples
}

/// Computes the sample for `curr` given the fix before it and the cumulative
/// distance up to `prev`.
pub fn derive_sample(prev: &RawFix, curr: &RawFix, cumulative_km: f64) -> DerivedSample {
    let dt_seconds = (curr.timestamp - prev.timestamp).as_seconds_f64();
    let dx_km = geodesic_distance(prev, curr);

    DerivedSample {
        timestamp: curr.timestamp,
        latitude: curr.latitude,
        longitude: curr.longitude,
        elevation_km: curr.elevation_km,
        dt_seconds,
        dx_km,
        speed_km_per_hr: speed_km_per_hr(dx_km, dt_seconds),
        cumulative_distance_km: cumulative_km + dx_km,
    }
}

/// `NaN` unless time moved forward.
pub fn speed_km_per_hr(dx_km: f64, dt_seconds: f64) -> f64 {
    if dt_seconds > 0.0 {
        dx_km / (dt_seconds / SECONDS_PER_HOUR)
    } else {
        f64::NAN
    }
}
