// Log categories and their file layout

use std::fmt;
use std::str::FromStr;

use super::DatalogError;

/// Kind of record a log file holds. Each category has its own file and buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogCategory {
    /// Traffic counts: aircraft, conflicts, losses of separation
    Sky,
    /// Conflicts as they are first detected
    Conflict,
    /// Losses of separation with their severity
    Intrusion,
    /// Periodic snapshot of all aircraft above the snapshot floor
    Snapshot,
    /// Per-flight statistics on deletion
    FlightStats,
    /// Instantaneous conflict count with the cruise/climb split
    Instantaneous,
    /// Aircraft deviating far from their route
    Trajectory,
}

impl LogCategory {
    pub const ALL: [LogCategory; 7] = [
        LogCategory::Sky,
        LogCategory::Conflict,
        LogCategory::Intrusion,
        LogCategory::Snapshot,
        LogCategory::FlightStats,
        LogCategory::Instantaneous,
        LogCategory::Trajectory,
    ];

    /// File extension, also the name accepted on the command line
    pub fn extension(self) -> &'static str {
        match self {
            LogCategory::Sky => "sky",
            LogCategory::Conflict => "cfl",
            LogCategory::Intrusion => "int",
            LogCategory::Snapshot => "snap",
            LogCategory::FlightStats => "flst",
            LogCategory::Instantaneous => "inst",
            LogCategory::Trajectory => "traj",
        }
    }

    /// Title line in the file header
    pub fn title(self) -> &'static str {
        match self {
            LogCategory::Sky => "SKY DATA",
            LogCategory::Conflict => "CONFLICT DATA",
            LogCategory::Intrusion => "INTRUSION DATA",
            LogCategory::Snapshot => "SNAP DATA",
            LogCategory::FlightStats => "FLIGHT STATISTICS DATA",
            LogCategory::Instantaneous => "INSTANTANEOUS CONFLICT DATA",
            LogCategory::Trajectory => "TRAJECTORY - REROUTING DATA",
        }
    }

    /// Column description line in the file header
    pub fn columns(self) -> String {
        const PREFIX: &str = "time [hh:mm:ss], simulation time [hh:mm:ss.ss], ";
        const STATE1: &str = "lat1 [deg], lon1 [deg], trk1 [deg], alt1 [m], tas1 [m/s], gs1 [m/s], vs1 [m/s], type1 [-]";
        const STATE2: &str = "lat2 [deg], lon2 [deg], trk2 [deg], alt2 [m], tas2 [m/s], gs2 [m/s], vs2 [m/s], type2 [-]";
        match self {
            LogCategory::Sky => concat_columns(PREFIX, "ntraf [-], nconf [-], nlos [-]", "", ""),
            LogCategory::Conflict => concat_columns(
                PREFIX,
                "id1 [-], id2 [-], tcpa [s], tinconf [s], toutconf [s], \
                 tcpa_lat1 [deg], tcpa_lon1 [deg], tcpa_alt1 [m], \
                 tcpa_lat2 [deg], tcpa_lon2 [deg], tcpa_alt2 [m], ",
                STATE1,
                STATE2,
            ),
            LogCategory::Intrusion => concat_columns(
                PREFIX,
                "id1 [-], id2 [-], hsev [-], vsev [-], tinconf [s], toutconf [s], ",
                STATE1,
                STATE2,
            ),
            LogCategory::Snapshot => concat_columns(
                PREFIX,
                "id [-], type [-], lat [deg], lon [deg], alt [m], tas [m/s], gs [m/s], vs [m/s], trk [deg]",
                "",
                "",
            ),
            LogCategory::FlightStats => concat_columns(
                PREFIX,
                "id [-], orig [-], dest [-], type [-], distance-2D [m], distance-3D [m], flighttime [s], \
                 work [GJ], del-lat [deg], del-lon [deg], del-alt [m]",
                "",
                "",
            ),
            LogCategory::Instantaneous => concat_columns(
                PREFIX,
                "ntraf [-], ncruise [-], nclimb/descend [-], nconf [-]",
                "",
                "",
            ),
            LogCategory::Trajectory => concat_columns(
                PREFIX,
                "id [-], orig [-], dest [-], lat [deg], lon [deg], alt [m]",
                "",
                "",
            ),
        }
    }
}

fn concat_columns(prefix: &str, body: &str, state1: &str, state2: &str) -> String {
    if state1.is_empty() {
        format!("{}{}", prefix, body)
    } else {
        format!("{}{}{}, {}", prefix, body, state1, state2)
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for LogCategory {
    type Err = DatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        LogCategory::ALL
            .into_iter()
            .find(|c| c.extension() == name)
            .ok_or_else(|| DatalogError::UnknownCategory(s.to_string()))
    }
}
