// Conflict records supplied by the external detector

use serde::{Deserialize, Serialize};

use crate::constants::NO_LOS;
use crate::geodesy;
use crate::traffic::AircraftState;

fn no_los() -> f64 {
    NO_LOS
}

/// A predicted loss of separation, as perceived by `ownship`
///
/// Records are directed: the detector may report both `(a, b)` and `(b, a)`.
/// Both describe the same conflict; [`Conflict::key`] identifies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    /// Index of the ownship in the fleet
    pub ownship: usize,
    /// Index of the intruder in the fleet
    pub intruder: usize,
    /// Current horizontal separation (m)
    pub distance: f64,
    /// Bearing from ownship to intruder (degrees)
    pub bearing: f64,
    /// Time to closest point of approach (s), negative once CPA has passed
    pub tcpa: f64,
    /// Time until the ownship loses separation (s)
    #[serde(default = "no_los")]
    pub tlos: f64,
    /// Time until separation is regained (s), if the detector provides it
    #[serde(default)]
    pub tout: Option<f64>,
}

impl Conflict {
    pub fn new(ownship: usize, intruder: usize, distance: f64, bearing: f64, tcpa: f64) -> Self {
        Conflict {
            ownship,
            intruder,
            distance,
            bearing,
            tcpa,
            tlos: NO_LOS,
            tout: None,
        }
    }

    pub fn with_tlos(mut self, tlos: f64) -> Self {
        self.tlos = tlos;
        self
    }

    /// Build a record whose distance and bearing come from the aircraft positions
    pub fn between(fleet: &[AircraftState], ownship: usize, intruder: usize, tcpa: f64) -> Self {
        let (own, other) = (&fleet[ownship], &fleet[intruder]);
        let (bearing, distance) = geodesy::qdrdist(own.lat, own.lon, other.lat, other.lon);
        Conflict::new(ownship, intruder, distance, bearing, tcpa)
    }

    /// Order-independent identity of the pair
    #[inline]
    pub fn key(&self) -> (usize, usize) {
        if self.ownship <= self.intruder {
            (self.ownship, self.intruder)
        } else {
            (self.intruder, self.ownship)
        }
    }

    /// The same conflict seen from the intruder
    pub fn mirrored(&self) -> Self {
        Conflict {
            ownship: self.intruder,
            intruder: self.ownship,
            bearing: (self.bearing + 180.0).rem_euclid(360.0),
            ..self.clone()
        }
    }

    /// Fail fast on geometry no avoidance vector should be computed from
    pub fn check(&self, fleet_len: usize) {
        assert!(
            self.ownship < fleet_len && self.intruder < fleet_len,
            "conflict ({}, {}) references an aircraft outside a fleet of {}",
            self.ownship,
            self.intruder,
            fleet_len
        );
        assert!(self.ownship != self.intruder, "aircraft {} in conflict with itself", self.ownship);
        assert!(
            self.distance.is_finite() && self.distance >= 0.0,
            "invalid conflict distance {}",
            self.distance
        );
        assert!(self.bearing.is_finite(), "invalid conflict bearing {}", self.bearing);
        assert!(self.tcpa.is_finite(), "invalid tcpa {}", self.tcpa);
        assert!(!self.tlos.is_nan(), "invalid time to loss of separation");
    }
}
