// Geodesy module - bearings, distances and dead reckoning on a spherical Earth
//
// Resolution itself works in a local east/north/up frame; these helpers are only
// used to derive pair geometry from positions and to project positions to the
// closest point of approach for logging.

use std::f64::consts::PI;

/// Degrees to radians conversion factor
const DTOR: f64 = PI / 180.0;

/// Radians to degrees conversion factor
const RTOD: f64 = 180.0 / PI;

/// Average radius for spherical Earth approximation in meters
const SPHERICAL_R: f64 = 6371e3;

/// Returns (bearing, distance) from point 0 to point 1
///
/// Bearing is true course in degrees `[0, 360)`, distance is great-circle
/// distance in meters. Altitude is ignored.
///
/// # Example
/// ```
/// use mvp_resolver::geodesy::qdrdist;
/// let (qdr, dist) = qdrdist(52.0, 4.0, 52.0, 5.0);
/// assert!(qdr > 89.0 && qdr < 91.0);
/// assert!(dist > 60e3 && dist < 70e3);
/// ```
pub fn qdrdist(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> (f64, f64) {
    let lat0_rad = lat0 * DTOR;
    let lat1_rad = lat1 * DTOR;
    let dlat = lat1_rad - lat0_rad;
    let dlon = (lon1 - lon0) * DTOR;

    // Haversine is stable for the short ranges conflicts live at
    let a = (dlat / 2.0).sin().powi(2)
        + lat0_rad.cos() * lat1_rad.cos() * (dlon / 2.0).sin().powi(2);
    let dist = 2.0 * SPHERICAL_R * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    let y = dlon.sin() * lat1_rad.cos();
    let x = lat0_rad.cos() * lat1_rad.sin() - lat0_rad.sin() * lat1_rad.cos() * dlon.cos();
    let qdr = (y.atan2(x) * RTOD).rem_euclid(360.0);

    (qdr, dist)
}

/// Flat-earth dead reckoning: move `dist` meters along bearing `qdr` (degrees)
///
/// Accurate to well under a percent for the tens of kilometres an aircraft
/// covers within a lookahead window. Returns (latitude, longitude) in degrees.
pub fn kwikpos(lat: f64, lon: f64, qdr: f64, dist: f64) -> (f64, f64) {
    let qdr_rad = qdr * DTOR;
    let dn = dist * qdr_rad.cos();
    let de = dist * qdr_rad.sin();

    let new_lat = lat + dn / SPHERICAL_R * RTOD;
    let new_lon = lon + de / (SPHERICAL_R * (lat * DTOR).cos()) * RTOD;

    // Keep longitude within [-180, 180)
    let new_lon = (new_lon + 180.0).rem_euclid(360.0) - 180.0;
    (new_lat, new_lon)
}
