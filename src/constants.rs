// Shared unit conversions and resolution constants.
// All state inside the crate is SI: metres, seconds, m/s, degrees for angles.

/// Feet to metres.
pub const FT: f64 = 0.3048;

/// Nautical miles to metres.
pub const NM: f64 = 1852.0;

/// Knots to m/s.
pub const KTS: f64 = 1852.0 / 3600.0;

/// Feet per minute to m/s.
pub const FPM: f64 = FT / 60.0;

/// Standard gravity (m/s^2).
pub const G0: f64 = 9.80665;

/// Specific gas constant for dry air (J/(kg K)).
pub const R_AIR: f64 = 287.05287;

/// Ratio of specific heats for air.
pub const GAMMA: f64 = 1.40;

/// ISA sea level temperature (K).
pub const T0: f64 = 288.15;

/// ISA sea level pressure (Pa).
pub const P0: f64 = 101325.0;

/// ISA sea level density (kg/m^3).
pub const RHO0: f64 = P0 / (R_AIR * T0);

/// ISA tropospheric lapse rate (K/m).
pub const BETA: f64 = -0.0065;

/// Tropopause altitude (m).
pub const H_TROPOPAUSE: f64 = 11000.0;

// --- Resolution kernel ---

/// Below this predicted miss distance (m) the CPA geometry is treated as head-on.
pub const MIN_MISS_DISTANCE: f64 = 10.0;

/// Below this miss distance (m) the CPA vector carries no usable direction and the
/// head-on correction is taken perpendicular to the line of sight instead.
pub const MIN_MISS_DIRECTION: f64 = 1.0;

/// Per-tick bound on the kernel's vertical speed correction (200 ft/min).
pub const MAX_DV_VERTICAL: f64 = 200.0 * FPM;

/// Floor on |tcpa| (s) used as the kernel's time denominator.
pub const MIN_TCPA: f64 = 1.0;

/// Aircraft whose minimum time to loss of separation is below this multiple of the
/// lookahead time get a conflict-driven altitude target.
pub const ALT_TARGET_LOOKAHEAD_FACTOR: f64 = 1.2;

/// Sentinel time to loss of separation when a pair never loses separation.
pub const NO_LOS: f64 = 1e9;

/// Default level-flight classifier for priority mode (m/s).
pub const DEFAULT_CRUISE_VS: f64 = 0.1;

// --- Datalog ---

/// Only aircraft above this altitude (m) appear in SNAP records.
pub const SNAP_MIN_ALT: f64 = 5000.0 * FT;

/// Interval (s) between SKY records.
pub const DT_SKY: f64 = 30.0;

/// Interval (s) between SNAP records.
pub const DT_SNAP: f64 = 30.0;

/// Interval (s) between INST records.
pub const DT_INST: f64 = 30.0;

/// Interval (s) between buffer flushes to disk.
pub const DT_WRITELOG: f64 = 300.0;
