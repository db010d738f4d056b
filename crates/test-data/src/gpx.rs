//! GPX 1.1 serialisation of fixture tracks.
//!
//! Output keeps every track and segment of the input, so multi-segment
//! fixtures reach the parser with their nesting intact.

use time::format_description::well_known::Rfc3339;
use track_metrics::models::{ParsedFile, TrackPointData};

/// Generates a GPX 1.1 XML document from a parsed file.
///
/// Coordinates are written with 7 decimals, elevation at full precision and
/// timestamps as RFC 3339 with their source offset. Missing elevation or
/// time produce a point without the corresponding element.
pub fn generate_gpx(file: &ParsedFile, name: &str) -> Vec<u8> {
    let mut gpx = String::new();

    gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    gpx.push('\n');
    gpx.push_str(r#"<gpx version="1.1" creator="track-metrics-test-data""#);
    gpx.push_str(r#" xmlns="http://www.topografix.com/GPX/1/1""#);
    gpx.push_str(r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#);
    gpx.push_str(r#" xsi:schemaLocation="http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd">"#);
    gpx.push('\n');

    gpx.push_str("  <metadata>\n");
    gpx.push_str(&format!("    <name>{}</name>\n", escape_xml(name)));
    gpx.push_str("  </metadata>\n");

    for track in &file.tracks {
        gpx.push_str("  <trk>\n");
        if let Some(track_name) = &track.name {
            gpx.push_str(&format!("    <name>{}</name>\n", escape_xml(track_name)));
        }
        for segment in &track.segments {
            gpx.push_str("    <trkseg>\n");
            for point in &segment.points {
                push_point(&mut gpx, point);
            }
            gpx.push_str("    </trkseg>\n");
        }
        gpx.push_str("  </trk>\n");
    }

    gpx.push_str("</gpx>\n");

    gpx.into_bytes()
}

fn push_point(gpx: &mut String, point: &TrackPointData) {
    gpx.push_str(&format!(
        r#"      <trkpt lat="{:.7}" lon="{:.7}">"#,
        point.lat, point.lon
    ));
    gpx.push('\n');

    if let Some(ele) = point.elevation {
        gpx.push_str(&format!("        <ele>{}</ele>\n", ele));
    }

    if let Some(ts) = point.timestamp {
        let formatted = ts.format(&Rfc3339).unwrap_or_default();
        gpx.push_str(&format!("        <time>{}</time>\n", formatted));
    }

    gpx.push_str("      </trkpt>\n");
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
