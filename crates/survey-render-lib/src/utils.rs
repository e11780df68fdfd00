//! Coordinate helpers: WGS84, Web Mercator meters, and screen pixels

use crate::Viewport;
use geo::Point;

/// Half the width of the EPSG:3857 plane, in meters
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_SIZE_METERS: f64 = 2.0 * EARTH_MERCATOR_MAX;

/// Latitudes beyond this are clamped; the square map stops here
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Side length of a map tile in pixels at every zoom level
pub const TILE_SIZE_PX: f64 = 256.0;

/// Meters per degree of latitude (mean)
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Mercator meters per degree of longitude
const METERS_PER_DEGREE_LON: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Mercator meters per unit of the isometric latitude
const METERS_PER_RADIAN: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// WGS84 (lat, lon) to Web Mercator meters, clamping latitude to the map
#[inline]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let isometric = (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln();
    Point::new(lon * METERS_PER_DEGREE_LON, isometric * METERS_PER_RADIAN)
}

/// Web Mercator meters to WGS84 (lat, lon)
#[inline]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let phi = (y / METERS_PER_RADIAN).sinh().atan();
    (phi.to_degrees(), x / METERS_PER_DEGREE_LON)
}

/// Pixels per Web Mercator meter at a (fractional) zoom level
#[inline]
pub fn pixels_per_meter(zoom: f64) -> f64 {
    TILE_SIZE_PX * zoom.exp2() / EARTH_SIZE_METERS
}

/// Viewport seen by a `width` x `height` pixel screen centered on (`lat`, `lon`) at `zoom`
///
/// Hosts normally hand the engine their own bounds; this is for drivers and
/// tests that need bounds consistent with a zoom level.
pub fn viewport_around(lat: f64, lon: f64, zoom: f64, width: f64, height: f64) -> Viewport {
    let center = wgs84_to_mercator(lat, lon);
    let scale = pixels_per_meter(zoom);
    let half_w = width / 2.0 / scale;
    let half_h = height / 2.0 / scale;

    let (south, west) = mercator_to_wgs84(center.x() - half_w, center.y() - half_h);
    let (north, east) = mercator_to_wgs84(center.x() + half_w, center.y() + half_h);
    Viewport::new(south, north, west.max(-180.0), east.min(180.0))
}
