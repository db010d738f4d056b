//! Altitude-corrected great-circle distance.

use geo::geometry::Point;

use crate::models::RawFix;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two fixes, evaluated on a sphere
/// whose radius is raised by the mean elevation of the two fixes.
pub fn geodesic_distance(a: &RawFix, b: &RawFix) -> f64 {
    haversine_km(a.point(), a.elevation_km, b.point(), b.elevation_km)
}

/// Haversine distance for points given in degrees (x = lon, y = lat) with
/// elevations in kilometres. A mean elevation below the centre of the Earth
/// collapses the radius to zero.
pub fn haversine_km(a: Point, elevation_a_km: f64, b: Point, elevation_b_km: f64) -> f64 {
    let radius = (EARTH_RADIUS_KM + (elevation_a_km + elevation_b_km) / 2.0).max(0.0);

    let lat_a = a.y().to_radians();
    let lat_b = b.y().to_radians();
    // abs() keeps the result bit-for-bit symmetric in its arguments
    let delta_lat = (lat_b - lat_a).abs();
    let delta_lon = (b.x().to_radians() - a.x().to_radians()).abs();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    radius * c
}
