// Aircraft kinematic state as seen by the resolution core
//
// The traffic subsystem owns these records and mutates them every tick; the
// resolver only ever writes `resolution`.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Targets produced by the resolver, consumed by the autopilot stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Resolved track over ground (degrees, [0, 360))
    pub heading: f64,
    /// Resolved true airspeed (m/s)
    pub airspeed: f64,
    /// Resolved vertical speed (m/s)
    pub vertical_speed: f64,
    /// Resolved target altitude (m)
    pub altitude: f64,
}

/// A single aircraft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftState {
    /// Callsign
    pub id: String,
    /// Aircraft type designator
    #[serde(default)]
    pub actype: String,

    // Position
    /// Latitude (degrees)
    pub lat: f64,
    /// Longitude (degrees)
    pub lon: f64,
    /// Altitude (m)
    pub alt: f64,

    // Velocity
    /// True airspeed (m/s)
    pub tas: f64,
    /// Ground speed (m/s)
    pub gs: f64,
    /// Vertical speed (m/s), positive up
    pub vs: f64,
    /// Track over ground (degrees)
    pub trk: f64,

    /// Cleared altitude the autopilot is flying towards (m)
    pub selalt: f64,

    /// Resolver output, `None` until the aircraft has been in a conflict
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl AircraftState {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, alt: f64) -> Self {
        AircraftState {
            id: id.into(),
            actype: String::new(),
            lat,
            lon,
            alt,
            tas: 0.0,
            gs: 0.0,
            vs: 0.0,
            trk: 0.0,
            selalt: alt,
            resolution: None,
        }
    }

    /// Set track, airspeed and vertical speed. Ground speed follows airspeed (no wind).
    pub fn with_velocity(mut self, trk: f64, tas: f64, vs: f64) -> Self {
        self.trk = trk;
        self.tas = tas;
        self.gs = tas;
        self.vs = vs;
        self
    }

    pub fn with_selalt(mut self, selalt: f64) -> Self {
        self.selalt = selalt;
        self
    }

    /// Velocity in the local east/north/up frame built from track and true airspeed
    pub fn velocity(&self) -> Vector3<f64> {
        let trk = self.trk.to_radians();
        Vector3::new(trk.sin() * self.tas, trk.cos() * self.tas, self.vs)
    }

    /// Level flight under the given vertical speed threshold
    #[inline]
    pub fn is_cruising(&self, threshold: f64) -> bool {
        self.vs.abs() < threshold
    }

    /// First kinematic field that is NaN or infinite
    pub fn non_finite_field(&self) -> Option<(&'static str, f64)> {
        [
            ("lat", self.lat),
            ("lon", self.lon),
            ("alt", self.alt),
            ("tas", self.tas),
            ("gs", self.gs),
            ("vs", self.vs),
            ("trk", self.trk),
            ("selalt", self.selalt),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
    }

    /// Fail fast on a state no avoidance vector should be computed from
    pub fn check(&self) {
        if let Some((name, value)) = self.non_finite_field() {
            panic!("aircraft {} has non-finite state {} = {}", self.id, name, value);
        }
    }

    /// Targets that leave the aircraft on its current path
    pub fn nominal(&self) -> Resolution {
        Resolution {
            heading: self.trk.rem_euclid(360.0),
            airspeed: self.tas,
            vertical_speed: self.vs,
            altitude: self.selalt,
        }
    }
}
