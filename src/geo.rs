//! Distance and coordinate formatting helpers.

use crate::models::GeoPoint;

/// Earth radius used by the haversine formula (meters)
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine).
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Render `"lat, lon"` with a fixed number of decimals.
pub fn format_coordinates(point: GeoPoint, precision: usize) -> String {
    format!("{:.*}, {:.*}", precision, point.lat, precision, point.lon)
}

/// [`format_coordinates`] with four decimals
pub fn format_coordinates_default(point: GeoPoint) -> String {
    format_coordinates(point, 4)
}

/// Human readable distance: meters below 1 km, kilometers above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}
