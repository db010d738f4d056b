//! Columnar JSON encoding of a [`Track`] for rendering clients.
//!
//! The layout follows the "split" orientation: a `columns` header, an `index`
//! of series keys and a `data` array with one row per sample:
//!
//! ```json
//! {
//!   "columns": ["timestamp", "latitude", "longitude", "elevation_km", "dt_seconds",
//!               "dx_km", "speed_km_per_hr", "cumulative_distance_km"],
//!   "index": ["2020-06-01T12:00:01"],
//!   "data": [["2020-06-01T12:00:01", 0.0, 0.001, 0.0, 1.0, 0.111, 400.3, 0.111]]
//! }
//! ```
//!
//! Timestamps are ISO-8601 civil date-times without offset. An undefined
//! speed is written as `null`.

use serde::{Deserialize, Serialize};
use time::{PrimitiveDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{errors::PipelineError, models::DerivedSample, series::Track};

pub const COLUMNS: [&str; 8] = [
    "timestamp",
    "latitude",
    "longitude",
    "elevation_km",
    "dt_seconds",
    "dx_km",
    "speed_km_per_hr",
    "cumulative_distance_km",
];

const DATE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTable {
    pub columns: Vec<String>,
    pub index: Vec<String>,
    pub data: Vec<SplitRow>,
}

/// One table row, serialised as a JSON array in [`COLUMNS`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRow(
    pub String,
    pub f64,
    pub f64,
    pub f64,
    pub f64,
    pub f64,
    pub Option<f64>,
    pub f64,
);

impl SplitTable {
    pub fn from_track(track: &Track) -> Result<Self, PipelineError> {
        let data = track
            .iter()
            .map(SplitRow::from_sample)
            .collect::<Result<Vec<_>, _>>()?;
        let index = data.iter().map(|row| row.0.clone()).collect();

        Ok(Self {
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            index,
            data,
        })
    }

    pub fn into_track(self) -> Result<Track, PipelineError> {
        if self.columns.iter().map(String::as_str).ne(COLUMNS) {
            return Err(PipelineError::Encoding(format!(
                "unexpected columns {:?}",
                self.columns
            )));
        }
        if self.index.len() != self.data.len() {
            return Err(PipelineError::Encoding(format!(
                "index has {} entries but data has {} rows",
                self.index.len(),
                self.data.len()
            )));
        }

        let samples = self
            .index
            .iter()
            .zip(self.data)
            .enumerate()
            .map(|(row, (key, data))| {
                if *key != data.0 {
                    return Err(PipelineError::Encoding(format!(
                        "row {row}: index key {key} does not match timestamp {}",
                        data.0
                    )));
                }
                data.into_sample()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Track::from_samples(samples))
    }
}

impl SplitRow {
    fn from_sample(sample: &DerivedSample) -> Result<Self, PipelineError> {
        Ok(Self(
            format_timestamp(sample.timestamp)?,
            sample.latitude,
            sample.longitude,
            sample.elevation_km,
            sample.dt_seconds,
            sample.dx_km,
            Some(sample.speed_km_per_hr).filter(|v| v.is_finite()),
            sample.cumulative_distance_km,
        ))
    }

    fn into_sample(self) -> Result<DerivedSample, PipelineError> {
        Ok(DerivedSample {
            timestamp: parse_timestamp(&self.0)?,
            latitude: self.1,
            longitude: self.2,
            elevation_km: self.3,
            dt_seconds: self.4,
            dx_km: self.5,
            speed_km_per_hr: self.6.unwrap_or(f64::NAN),
            cumulative_distance_km: self.7,
        })
    }
}

pub fn to_split_value(track: &Track) -> Result<serde_json::Value, PipelineError> {
    Ok(serde_json::to_value(SplitTable::from_track(track)?)?)
}

pub fn to_split_json(track: &Track) -> Result<String, PipelineError> {
    Ok(serde_json::to_string(&SplitTable::from_track(track)?)?)
}

pub fn from_split_json(json: &str) -> Result<Track, PipelineError> {
    let table: SplitTable = serde_json::from_str(json)?;
    table.into_track()
}

/// `YYYY-MM-DDTHH:MM:SS`, followed by a fraction only when there is one.
/// Trailing zeros of the fraction are dropped.
pub fn format_timestamp(timestamp: PrimitiveDateTime) -> Result<String, PipelineError> {
    let mut out = timestamp
        .format(DATE_TIME)
        .map_err(|e| PipelineError::Encoding(e.to_string()))?;

    let nanos = timestamp.nanosecond();
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }

    Ok(out)
}

/// Inverse of [`format_timestamp`]; accepts 1 to 9 fractional digits.
pub fn parse_timestamp(s: &str) -> Result<PrimitiveDateTime, PipelineError> {
    let invalid = || PipelineError::Encoding(format!("invalid timestamp {s:?}"));

    let (whole, fraction) = match s.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (s, None),
    };

    let timestamp = PrimitiveDateTime::parse(whole, DATE_TIME).map_err(|_| invalid())?;

    let Some(fraction) = fraction else {
        return Ok(timestamp);
    };
    if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    let nanos: u32 = format!("{fraction:0<9}").parse().map_err(|_| invalid())?;

    timestamp.replace_nanosecond(nanos).map_err(|_| invalid())
}
