// International Standard Atmosphere and airspeed conversions
//
// Used by the fleet aggregator to move between the true airspeed domain of the
// velocity vectors and the calibrated airspeed domain of the speed limits.

use crate::constants::{BETA, G0, GAMMA, H_TROPOPAUSE, P0, R_AIR, RHO0, T0};

/// Tropopause temperature (K)
const T_TROPOPAUSE: f64 = T0 + BETA * H_TROPOPAUSE;

/// gamma / (gamma - 1), the isentropic exponent (3.5 for air)
const KAPPA: f64 = GAMMA / (GAMMA - 1.0);

/// ISA temperature (K) at altitude `h` (m)
pub fn temperature(h: f64) -> f64 {
    (T0 + BETA * h).max(T_TROPOPAUSE)
}

/// ISA static pressure (Pa) at altitude `h` (m)
pub fn pressure(h: f64) -> f64 {
    if h <= H_TROPOPAUSE {
        P0 * (temperature(h) / T0).powf(-G0 / (BETA * R_AIR))
    } else {
        let p11 = P0 * (T_TROPOPAUSE / T0).powf(-G0 / (BETA * R_AIR));
        p11 * (-G0 / (R_AIR * T_TROPOPAUSE) * (h - H_TROPOPAUSE)).exp()
    }
}

/// ISA density (kg/m^3) at altitude `h` (m)
pub fn density(h: f64) -> f64 {
    pressure(h) / (R_AIR * temperature(h))
}

/// Pressure, density at altitude `h`
#[inline]
fn atmos(h: f64) -> (f64, f64) {
    let p = pressure(h);
    (p, p / (R_AIR * temperature(h)))
}

/// True airspeed to calibrated airspeed (m/s), compressible flow.
///
/// The sign of `tas` is preserved so that reversed vectors stay reversed.
pub fn vtas2cas(tas: f64, h: f64) -> f64 {
    let (p, rho) = atmos(h);
    let qdyn = p * ((1.0 + rho * tas * tas / (2.0 * KAPPA * p)).powf(KAPPA) - 1.0);
    let cas = (2.0 * KAPPA * P0 / RHO0 * ((qdyn / P0 + 1.0).powf(1.0 / KAPPA) - 1.0)).sqrt();
    cas.copysign(tas)
}

/// Calibrated airspeed to true airspeed (m/s), inverse of [`vtas2cas`]
pub fn vcas2tas(cas: f64, h: f64) -> f64 {
    let (p, rho) = atmos(h);
    let qdyn = P0 * ((1.0 + RHO0 * cas * cas / (2.0 * KAPPA * P0)).powf(KAPPA) - 1.0);
    let tas = (2.0 * KAPPA * p / rho * ((1.0 + qdyn / p).powf(1.0 / KAPPA) - 1.0)).sqrt();
    tas.copysign(cas)
}
