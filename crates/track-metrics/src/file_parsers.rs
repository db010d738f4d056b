//! Adapters from activity file formats to the nested [`ParsedFile`] model.
//!
//! GPX tracks and segments map one-to-one. TCX laps become tracks and their
//! `<Track>` blocks become segments. FIT files carry a flat record stream and
//! become a single track with a single segment.

use axum_extra::headers::Mime;
use bytes::Buf as _;
use bytes::Bytes;
use quick_xml::{Reader, events::Event};
use std::io::BufReader;
use time::{
    OffsetDateTime,
    format_description::well_known::{Iso8601, Rfc3339},
};

use crate::models::{ParsedFile, ParsedSegment, ParsedTrack, TrackPointData};

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Gpx,
    Tcx,
    Fit,
    Other,
}

impl From<Mime> for FileType {
    fn from(mime: Mime) -> Self {
        match mime.type_().as_str() {
            "application" | "text" => match mime.subtype().as_str() {
                // subtype() excludes any "+xml" suffix
                "gpx" => FileType::Gpx,
                "vnd.garmin.tcx" | "tcx" => FileType::Tcx,
                "vnd.ant.fit" | "fit" => FileType::Fit,
                s => {
                    tracing::debug!("Unrecognised mime subtype: {}", s);
                    FileType::Other
                }
            },
            s => {
                tracing::debug!("Unrecognised mime type: {}", s);
                FileType::Other
            }
        }
    }
}

impl FileType {
    pub fn as_mime_str(self) -> &'static str {
        match self {
            FileType::Gpx => "application/gpx+xml",
            FileType::Tcx => "application/vnd.garmin.tcx+xml",
            FileType::Fit => "application/vnd.ant.fit",
            FileType::Other => "application/octet-stream",
        }
    }

    /// Sniffs the format from the leading bytes of a file.
    pub fn detect_from_bytes(bytes: &[u8]) -> FileType {
        // FIT header: size byte (12 or 14), then ".FIT" at offset 8
        if bytes.len() >= 12 && matches!(bytes[0], 12 | 14) && &bytes[8..12] == b".FIT" {
            return FileType::Fit;
        }

        let head = &bytes[..bytes.len().min(1024)];
        let head = String::from_utf8_lossy(head);
        if head.contains("<TrainingCenterDatabase") {
            FileType::Tcx
        } else if head.contains("<gpx") {
            FileType::Gpx
        } else {
            FileType::Other
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse GPX file: {0}")]
    GpxError(String),
    #[error("Failed to parse TCX file: {0}")]
    TcxError(String),
    #[error("Failed to parse FIT file: {0}")]
    FitError(String),
    #[error("Unsupported file type: {0:?}")]
    UnsupportedFileType(FileType),
}

/// Parses a file of the given type. `FileType::Other` is sniffed first.
pub fn parse_activity_file(file_type: FileType, bytes: Bytes) -> Result<ParsedFile, ParseError> {
    let actual_type = if file_type == FileType::Other {
        FileType::detect_from_bytes(&bytes)
    } else {
        file_type
    };

    match actual_type {
        FileType::Gpx => parse_gpx(bytes),
        FileType::Tcx => parse_tcx(bytes),
        FileType::Fit => parse_fit(bytes),
        FileType::Other => Err(ParseError::UnsupportedFileType(actual_type)),
    }
}

pub fn parse_gpx(bytes: Bytes) -> Result<ParsedFile, ParseError> {
    let gpx = gpx::read(bytes.clone().reader()).map_err(|e| ParseError::GpxError(e.to_string()))?;
    let mut parsed = from_gpx(&gpx);

    // the gpx crate normalises every <time> to UTC
    let mut written = source_times(&bytes, None, b"trkpt", b"time")
        .map_err(|e| ParseError::GpxError(e.to_string()))?
        .into_iter();
    for point in parsed
        .tracks
        .iter_mut()
        .flat_map(|track| track.segments.iter_mut())
        .flat_map(|segment| segment.points.iter_mut())
    {
        point.timestamp = with_source_offset(point.timestamp, written.next().flatten());
    }

    Ok(parsed)
}

/// Converts an already-parsed GPX document, keeping its track/segment nesting.
pub fn from_gpx(gpx: &gpx::Gpx) -> ParsedFile {
    let tracks = gpx
        .tracks
        .iter()
        .map(|track| ParsedTrack {
            name: track.name.clone(),
            segments: track
                .segments
                .iter()
                .map(|seg| ParsedSegment {
                    points: seg.points.iter().map(waypoint_to_point).collect(),
                })
                .collect(),
        })
        .collect();

    ParsedFile { tracks }
}

fn waypoint_to_point(wpt: &gpx::Waypoint) -> TrackPointData {
    let point = wpt.point();
    TrackPointData {
        lat: point.y(),
        lon: point.x(),
        elevation: wpt.elevation,
        timestamp: wpt.time.map(OffsetDateTime::from),
    }
}

pub fn parse_tcx(bytes: Bytes) -> Result<ParsedFile, ParseError> {
    let mut buf_reader = BufReader::new(bytes.clone().reader());

    let tcx_data =
        tcx::read(&mut buf_reader).map_err(|e| ParseError::TcxError(format!("{e:?}")))?;

    // tcx exposes DateTime<Utc>, so the written offsets come from the raw document
    let mut written = source_times(&bytes, Some(b"Activities".as_slice()), b"Trackpoint", b"Time")
        .map_err(|e| ParseError::TcxError(e.to_string()))?
        .into_iter();

    let mut tracks = Vec::new();

    if let Some(ref activities) = tcx_data.activities {
        for activity in &activities.activities {
            for lap in &activity.laps {
                let segments = lap
                    .tracks
                    .iter()
                    .map(|track| ParsedSegment {
                        points: track
                            .trackpoints
                            .iter()
                            .filter_map(|tp| {
                                let timestamp = with_source_offset(
                                    chrono_to_offset_datetime(&tp.time),
                                    written.next().flatten(),
                                );
                                // points without a position are heart-rate-only samples
                                let position = tp.position.as_ref()?;
                                Some(TrackPointData {
                                    lat: position.latitude,
                                    lon: position.longitude,
                                    elevation: tp.altitude_meters,
                                    timestamp,
                                })
                            })
                            .collect(),
                    })
                    .collect();

                tracks.push(ParsedTrack {
                    name: None,
                    segments,
                });
            }
        }
    }

    Ok(ParsedFile { tracks })
}

/// Collects the text of the `time_tag` child of every `point_tag` element, in
/// document order, parsed with the offset it was written with. Only elements
/// inside `scope` are considered when a scope is given. A point whose time is
/// absent or unreadable yields `None`.
fn source_times(
    bytes: &[u8],
    scope: Option<&[u8]>,
    point_tag: &[u8],
    time_tag: &[u8],
) -> Result<Vec<Option<OffsetDateTime>>, quick_xml::Error> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut times = Vec::new();
    let mut depth = 0usize;
    let mut in_scope = scope.is_none();
    let mut point_depth: Option<usize> = None;
    let mut in_time = false;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                depth += 1;
                let name = e.local_name();
                if scope == Some(name.as_ref()) {
                    in_scope = true;
                }
                if in_scope && point_depth.is_none() && name.as_ref() == point_tag {
                    point_depth = Some(depth);
                    times.push(None);
                } else if point_depth == Some(depth - 1) && name.as_ref() == time_tag {
                    in_time = true;
                    text.clear();
                }
            }
            Event::Empty(e) => {
                if in_scope && point_depth.is_none() && e.local_name().as_ref() == point_tag {
                    times.push(None);
                }
            }
            Event::Text(e) if in_time => text.push_str(&e.unescape()?),
            Event::End(e) => {
                let name = e.local_name();
                if in_time && name.as_ref() == time_tag {
                    in_time = false;
                    if let Some(slot) = times.last_mut() {
                        *slot = parse_source_time(text.trim());
                    }
                }
                if point_depth == Some(depth) {
                    point_depth = None;
                }
                if scope == Some(name.as_ref()) {
                    in_scope = false;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(times)
}

fn parse_source_time(text: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(text, &Iso8601::DEFAULT))
        .ok()
}

/// Keeps the parsed instant but restores the offset it was written with. The
/// written value is only trusted when it names the same instant.
fn with_source_offset(
    parsed: Option<OffsetDateTime>,
    written: Option<OffsetDateTime>,
) -> Option<OffsetDateTime> {
    match (parsed, written) {
        (Some(parsed), Some(written)) if parsed == written => Some(written),
        (parsed, _) => parsed,
    }
}

fn chrono_to_offset_datetime<Tz: chrono::TimeZone>(
    dt: &chrono::DateTime<Tz>,
) -> Option<OffsetDateTime> {
    use chrono::Offset as _;

    let offset_seconds = dt.offset().fix().local_minus_utc();
    let offset = time::UtcOffset::from_whole_seconds(offset_seconds).ok()?;

    OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .ok()?
        .replace_nanosecond(dt.timestamp_subsec_nanos())
        .ok()
        .map(|odt| odt.to_offset(offset))
}

pub fn parse_fit(bytes: Bytes) -> Result<ParsedFile, ParseError> {
    let data = bytes.to_vec();
    let fit_data = fitparser::from_bytes(&data).map_err(|e| ParseError::FitError(e.to_string()))?;

    let mut points = Vec::new();

    for record in fit_data {
        if record.kind() != fitparser::profile::field_types::MesgNum::Record {
            continue;
        }

        let mut lat: Option<f64> = None;
        let mut lon: Option<f64> = None;
        let mut elevation: Option<f64> = None;
        let mut timestamp: Option<OffsetDateTime> = None;

        for field in record.fields() {
            match field.name() {
                "position_lat" => {
                    if let fitparser::Value::SInt32(v) = field.value() {
                        lat = Some(semicircles_to_degrees(*v));
                    }
                }
                "position_long" => {
                    if let fitparser::Value::SInt32(v) = field.value() {
                        lon = Some(semicircles_to_degrees(*v));
                    }
                }
                // enhanced_altitude wins over altitude
                "enhanced_altitude" => {
                    elevation = extract_fit_f64(field.value()).or(elevation);
                }
                "altitude" => {
                    elevation = elevation.or_else(|| extract_fit_f64(field.value()));
                }
                "timestamp" => {
                    // fitparser hands back host-local time; FIT itself records UTC
                    if let fitparser::Value::Timestamp(t) = field.value() {
                        timestamp = chrono_to_offset_datetime(&t.with_timezone(&chrono::Utc));
                    }
                }
                _ => {}
            }
        }

        // records without a position fix are skipped, not malformed
        if let (Some(lat), Some(lon)) = (lat, lon) {
            points.push(TrackPointData {
                lat,
                lon,
                elevation,
                timestamp,
            });
        }
    }

    if points.is_empty() {
        return Ok(ParsedFile::default());
    }

    Ok(ParsedFile::single_segment(points))
}

/// FIT stores positions as semicircles: 2^31 semicircles = 180 degrees.
fn semicircles_to_degrees(semicircles: i32) -> f64 {
    (semicircles as f64) * (180.0 / 2_147_483_648.0)
}

fn extract_fit_f64(value: &fitparser::Value) -> Option<f64> {
    match value {
        fitparser::Value::Float32(v) => Some(*v as f64),
        fitparser::Value::Float64(v) => Some(*v),
        fitparser::Value::SInt8(v) => Some(*v as f64),
        fitparser::Value::UInt8(v) => Some(*v as f64),
        fitparser::Value::SInt16(v) => Some(*v as f64),
        fitparser::Value::UInt16(v) => Some(*v as f64),
        fitparser::Value::SInt32(v) => Some(*v as f64),
        fitparser::Value::UInt32(v) => Some(*v as f64),
        _ => None,
    }
}
