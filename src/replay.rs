// Replay files: recorded traffic and detector output, one frame per tick

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ResolutionParameters;
use crate::conflict::Conflict;
use crate::traffic::AircraftState;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read replay {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse replay {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("Frame {frame} at t={simt}: {reason}")]
    InvalidFrame { frame: usize, simt: f64, reason: String },
}

/// Traffic and conflicts at one simulation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Simulation time (s)
    pub simt: f64,
    pub aircraft: Vec<AircraftState>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
}

/// A recorded run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Replay {
    /// Scenario name used for datalog file names
    #[serde(default)]
    pub scenario: Option<String>,
    /// Resolution settings recorded with the run, overriding the command line
    #[serde(default)]
    pub params: Option<ResolutionParameters>,
    pub frames: Vec<Frame>,
}

impl Replay {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let replay = Replay::from_json(&text).map_err(|source| ReplayError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        replay.validate()?;
        Ok(replay)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Reject frames whose conflicts cannot be resolved against their fleet
    pub fn validate(&self) -> Result<(), ReplayError> {
        for (frame, f) in self.frames.iter().enumerate() {
            let invalid = |reason: String| ReplayError::InvalidFrame {
                frame,
                simt: f.simt,
                reason,
            };
            if !f.simt.is_finite() {
                return Err(invalid("non-finite simulation time".to_string()));
            }
            if let Some((ac, (name, value))) = f
                .aircraft
                .iter()
                .find_map(|ac| ac.non_finite_field().map(|field| (ac, field)))
            {
                return Err(invalid(format!("aircraft {} has non-finite {} = {}", ac.id, name, value)));
            }
            let n = f.aircraft.len();
            for c in &f.conflicts {
                if c.ownship >= n || c.intruder >= n {
                    return Err(invalid(format!(
                        "conflict ({}, {}) outside a fleet of {}",
                        c.ownship, c.intruder, n
                    )));
                }
                if c.ownship == c.intruder {
                    return Err(invalid(format!("aircraft {} in conflict with itself", c.ownship)));
                }
                if !(c.distance.is_finite() && c.distance >= 0.0 && c.bearing.is_finite() && c.tcpa.is_finite()) {
                    return Err(invalid(format!(
                        "conflict ({}, {}) has invalid geometry",
                        c.ownship, c.intruder
                    )));
                }
            }
        }
        Ok(())
    }
}
