use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CRUISE_VS, FPM, FT, KTS, NM};

/// Which velocity components the resolver may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionDirection {
    /// Heading and speed only
    Horizontal,
    /// Vertical speed only
    Vertical,
    /// Heading, speed and vertical speed
    #[default]
    Both,
}

/// How the two aircraft of a pair share the resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coordination {
    /// Exact positions: solve each pair once and give both aircraft complementary halves
    #[default]
    Symmetric,
    /// Noisy or quantized positions: every aircraft solves from its own viewpoint
    Independent,
}

/// Simulation-wide resolution settings, immutable during a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionParameters {
    /// Resolution switched on
    pub enabled: bool,
    /// Protected radius including margin (m)
    pub rm: f64,
    /// Protected height including margin (m)
    pub dhm: f64,
    /// Detection lookahead time (s)
    pub lookahead: f64,
    /// Minimum calibrated airspeed (m/s)
    pub vmin: f64,
    /// Maximum calibrated airspeed (m/s)
    pub vmax: f64,
    /// Minimum vertical speed (m/s), negative for descent
    pub vsmin: f64,
    /// Maximum vertical speed (m/s)
    pub vsmax: f64,
    /// Let manoeuvring aircraft resolve conflicts with cruising aircraft alone
    pub priority: bool,
    pub direction: ResolutionDirection,
    pub coordination: Coordination,
    /// |vs| below which an aircraft counts as cruising for priority (m/s)
    pub cruise_vs_threshold: f64,
}

impl Default for ResolutionParameters {
    fn default() -> Self {
        // 5 NM / 1000 ft separation with a 5% margin
        ResolutionParameters {
            enabled: true,
            rm: 5.0 * NM * 1.05,
            dhm: 1000.0 * FT * 1.05,
            lookahead: 300.0,
            vmin: 100.0 * KTS,
            vmax: 500.0 * KTS,
            vsmin: -3000.0 * FPM,
            vsmax: 3000.0 * FPM,
            priority: false,
            direction: ResolutionDirection::Both,
            coordination: Coordination::Symmetric,
            cruise_vs_threshold: DEFAULT_CRUISE_VS,
        }
    }
}

/// Conflict resolution driver configuration
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// JSON replay file with aircraft states and detected conflicts per tick
    #[arg(value_name = "FILE")]
    pub input: String,

    /// Write resolutions in CSV format to a local file.
    #[arg(long, value_name = "FILE")]
    pub write_csv: Vec<String>,

    /// Print resolutions as JSON lines on stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Directory for datalog output files. Logging is off without it.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<String>,

    /// Datalog categories to enable (sky, cfl, int, snap, flst, inst, traj)
    #[arg(long, value_name = "CATEGORY", value_delimiter = ',')]
    pub log: Vec<String>,

    /// Disable conflict resolution (detection input is still logged)
    #[arg(long, default_value_t = false)]
    pub no_resolution: bool,

    /// Protected radius in nautical miles, margin included
    #[arg(long, default_value_t = 5.25)]
    pub rm_nm: f64,

    /// Protected height in feet, margin included
    #[arg(long, default_value_t = 1050.0)]
    pub dhm_ft: f64,

    /// Lookahead time in seconds
    #[arg(long, default_value_t = 300.0)]
    pub lookahead: f64,

    /// Minimum calibrated airspeed in knots
    #[arg(long, default_value_t = 100.0)]
    pub vmin_kts: f64,

    /// Maximum calibrated airspeed in knots
    #[arg(long, default_value_t = 500.0)]
    pub vmax_kts: f64,

    /// Minimum vertical speed in ft/min
    #[arg(long, default_value_t = -3000.0, allow_hyphen_values = true)]
    pub vsmin_fpm: f64,

    /// Maximum vertical speed in ft/min
    #[arg(long, default_value_t = 3000.0)]
    pub vsmax_fpm: f64,

    /// Climbing/descending aircraft resolve conflicts with cruising aircraft
    #[arg(long, default_value_t = false)]
    pub priority: bool,

    /// Vertical speed in ft/min under which an aircraft counts as cruising
    #[arg(long, default_value_t = DEFAULT_CRUISE_VS / FPM)]
    pub cruise_fpm: f64,

    /// Resolution direction
    #[arg(long, value_enum, default_value_t = ResolutionDirection::Both)]
    pub direction: ResolutionDirection,

    /// Pair coordination strategy
    #[arg(long, value_enum, default_value_t = Coordination::Symmetric)]
    pub coordination: Coordination,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Resolution parameters in SI units
    pub fn resolution_parameters(&self) -> ResolutionParameters {
        ResolutionParameters {
            enabled: !self.no_resolution,
            rm: self.rm_nm * NM,
            dhm: self.dhm_ft * FT,
            lookahead: self.lookahead,
            vmin: self.vmin_kts * KTS,
            vmax: self.vmax_kts * KTS,
            vsmin: self.vsmin_fpm * FPM,
            vsmax: self.vsmax_fpm * FPM,
            priority: self.priority,
            direction: self.direction,
            coordination: self.coordination,
            cruise_vs_threshold: self.cruise_fpm * FPM,
        }
    }
}
