// Buffered simulation data logger
//
// One text file per enabled category. Records are buffered in memory and appended
// to the file on flush; `clear_buffer` flushes everything on a fixed simulation
// time interval to bound memory use. Failures are returned to the caller and never
// affect resolution.

pub mod category;
pub mod records;
pub mod timer;

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ResolutionParameters;
use crate::conflict::Conflict;
use crate::constants::{DT_INST, DT_SKY, DT_SNAP, DT_WRITELOG, SNAP_MIN_ALT};
use crate::traffic::AircraftState;

pub use category::LogCategory;
pub use records::sim_time_text;
pub use timer::Interval;

const SEPARATOR: &str = "===============================";

/// Errors reported by the datalog service
#[derive(Debug, Error)]
pub enum DatalogError {
    /// Creating, writing or flushing a log file failed
    #[error("Failed to write log file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// Category name not recognised
    #[error("Unknown log category: {0}")]
    UnknownCategory(String),
}

/// Open file and pending lines of one enabled category
#[derive(Debug)]
struct LogChannel {
    path: PathBuf,
    file: File,
    buffer: Vec<String>,
}

impl LogChannel {
    fn flush(&mut self) -> Result<(), DatalogError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        write_lines(&mut self.file, &mut self.buffer)
            .and_then(|()| self.file.flush())
            .map_err(|source| DatalogError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Write buffered lines in order, removing each one once it is written.
///
/// On error the lines not yet written stay buffered for the next attempt.
fn write_lines<W: Write>(out: &mut W, buffer: &mut Vec<String>) -> io::Result<()> {
    let mut written = 0;
    let mut result = Ok(());
    for line in buffer.iter() {
        if let Err(e) = out.write_all(line.as_bytes()) {
            result = Err(e);
            break;
        }
        written += 1;
    }
    buffer.drain(..written);
    result
}

/// Datalog service driven by the simulation loop
#[derive(Debug)]
pub struct Datalog {
    dir: PathBuf,
    scenario: String,
    /// Base file name shared by all categories of a run, fixed on first enable
    fname: Option<PathBuf>,
    channels: HashMap<LogCategory, LogChannel>,
    sky_timer: Interval,
    snap_timer: Interval,
    inst_timer: Interval,
    writelog_timer: Interval,
}

impl Datalog {
    /// Create a logger writing into `dir`, nothing enabled yet
    pub fn new(dir: impl Into<PathBuf>, scenario: &str) -> Self {
        Datalog {
            dir: dir.into(),
            scenario: strip_scn(scenario),
            fname: None,
            channels: HashMap::new(),
            sky_timer: Interval::new(DT_SKY),
            snap_timer: Interval::new(DT_SNAP),
            inst_timer: Interval::new(DT_INST),
            writelog_timer: Interval::new(DT_WRITELOG),
        }
    }

    /// Disable every category, drop unflushed records and re-arm the timers
    pub fn reset(&mut self) {
        self.channels.clear();
        self.fname = None;
        self.sky_timer.reset();
        self.snap_timer.reset();
        self.inst_timer.reset();
        self.writelog_timer.reset();
    }

    pub fn is_enabled(&self, category: LogCategory) -> bool {
        self.channels.contains_key(&category)
    }

    /// Path of a category's file, once a run name has been chosen
    pub fn path(&self, category: LogCategory) -> Option<PathBuf> {
        self.fname.as_ref().map(|base| category_path(base, category))
    }

    /// Switch a category on (new file with header) or off (flush and close)
    pub fn set_logger(&mut self, category: LogCategory, on: bool) -> Result<(), DatalogError> {
        if on {
            self.enable(category)
        } else {
            self.disable(category)
        }
    }

    /// Create the category's file, write its header and start buffering
    pub fn enable(&mut self, category: LogCategory) -> Result<(), DatalogError> {
        if self.is_enabled(category) {
            return Ok(());
        }
        let path = category_path(self.base_name(), category);
        let io_err = |source| DatalogError::Io { path: path.clone(), source };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(self.header(category).as_bytes()).map_err(io_err)?;

        debug!("Datalog {} enabled: {}", category, path.display());
        self.channels.insert(
            category,
            LogChannel {
                path,
                file,
                buffer: Vec::new(),
            },
        );
        Ok(())
    }

    /// Flush and close the category's file
    pub fn disable(&mut self, category: LogCategory) -> Result<(), DatalogError> {
        match self.channels.remove(&category) {
            Some(mut channel) => channel.flush(),
            None => Ok(()),
        }
    }

    /// Buffer one record. Ignored when the category is disabled.
    pub fn write(&mut self, category: LogCategory, simt: f64, fields: &str) {
        if let Some(channel) = self.channels.get_mut(&category) {
            channel.buffer.push(format!(
                "{}, {}, {}\n",
                Local::now().format("%H:%M:%S"),
                sim_time_text(simt),
                fields
            ));
        }
    }

    /// Number of records waiting for the next flush
    pub fn buffered(&self, category: LogCategory) -> usize {
        self.channels.get(&category).map_or(0, |c| c.buffer.len())
    }

    /// Append the category's buffer to its file and clear it
    pub fn flush(&mut self, category: LogCategory) -> Result<(), DatalogError> {
        match self.channels.get_mut(&category) {
            Some(channel) => channel.flush(),
            None => Ok(()),
        }
    }

    /// Flush every enabled category. All are attempted; the first error is returned.
    pub fn flush_all(&mut self) -> Result<(), DatalogError> {
        let mut first_err = None;
        for category in LogCategory::ALL {
            if let Err(e) = self.flush(category) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Periodic flush, every `DT_WRITELOG` seconds of simulation time.
    ///
    /// Returns whether a flush was due.
    pub fn clear_buffer(&mut self, simt: f64) -> Result<bool, DatalogError> {
        if !self.writelog_timer.due(simt) {
            return Ok(false);
        }
        self.flush_all()?;
        Ok(true)
    }

    /// Periodic traffic summary
    pub fn sky_save(&mut self, simt: f64, ntraf: usize, nconf: usize, nlos: usize) {
        if self.is_enabled(LogCategory::Sky) && self.sky_timer.due(simt) {
            self.write(LogCategory::Sky, simt, &records::sky_fields(ntraf, nconf, nlos));
        }
    }

    /// Periodic snapshot of every aircraft above the snapshot floor
    pub fn snap_save(&mut self, simt: f64, fleet: &[AircraftState]) {
        if self.is_enabled(LogCategory::Snapshot) && self.snap_timer.due(simt) {
            for ac in fleet.iter().filter(|ac| ac.alt > SNAP_MIN_ALT) {
                self.write(LogCategory::Snapshot, simt, &records::snap_fields(ac));
            }
        }
    }

    /// Periodic conflict count with the cruising / climbing-descending split
    pub fn inst_save(&mut self, simt: f64, fleet: &[AircraftState], cruise_vs_threshold: f64, nconf: usize) {
        if self.is_enabled(LogCategory::Instantaneous) && self.inst_timer.due(simt) {
            let ncruise = fleet.iter().filter(|ac| ac.is_cruising(cruise_vs_threshold)).count();
            let fields = records::inst_fields(fleet.len(), ncruise, fleet.len() - ncruise, nconf);
            self.write(LogCategory::Instantaneous, simt, &fields);
        }
    }

    /// Record newly detected conflicts
    pub fn log_conflicts<'a>(
        &mut self,
        simt: f64,
        fleet: &[AircraftState],
        conflicts: impl IntoIterator<Item = &'a Conflict>,
    ) {
        if !self.is_enabled(LogCategory::Conflict) {
            return;
        }
        for conflict in conflicts {
            self.write(LogCategory::Conflict, simt, &records::conflict_fields(fleet, conflict));
        }
    }

    /// Record losses of separation among `conflicts`
    pub fn log_intrusions<'a>(
        &mut self,
        simt: f64,
        params: &ResolutionParameters,
        fleet: &[AircraftState],
        conflicts: impl IntoIterator<Item = &'a Conflict>,
    ) {
        if !self.is_enabled(LogCategory::Intrusion) {
            return;
        }
        for conflict in conflicts {
            if records::is_intrusion(params, fleet, conflict) {
                let fields = records::intrusion_fields(params, fleet, conflict);
                self.write(LogCategory::Intrusion, simt, &fields);
            }
        }
    }

    /// Base path for this run's files, chosen on first use
    fn base_name(&mut self) -> &Path {
        if self.fname.is_none() {
            let now = Local::now();
            let name = if self.scenario.is_empty() {
                format!("{}-run", now.format("%Y-%m-%d-%H-%M-%S"))
            } else {
                format!("{}-{}", self.scenario, now.format("%Y%m%d%H%M%S"))
            };
            self.fname = Some(self.dir.join(name));
        }
        self.fname.as_deref().unwrap_or(self.dir.as_path())
    }

    fn header(&self, category: LogCategory) -> String {
        format!(
            "{sep}\nNew run at: {now}\nScenario: {scn}\n{title}\n{sep}\n\n{cols}\n\n",
            sep = SEPARATOR,
            now = Local::now().format("%Y-%m-%d %H:%M:%S"),
            scn = self.scenario,
            title = category.title(),
            cols = category.columns(),
        )
    }
}

impl Drop for Datalog {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all() {
            warn!("Datalog flush on shutdown failed: {}", e);
        }
    }
}

/// `<base>.<ext>`; the base may itself contain dots
fn category_path(base: &Path, category: LogCategory) -> PathBuf {
    let mut path = base.as_os_str().to_os_string();
    path.push(".");
    path.push(category.extension());
    PathBuf::from(path)
}

/// Scenario name without a trailing `.scn`
fn strip_scn(scenario: &str) -> String {
    let lower = scenario.to_ascii_lowercase();
    match lower.strip_suffix(".scn") {
        Some(stem) => scenario[..stem.len()].to_string(),
        None => scenario.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> Vec<AircraftState> {
        vec![
            AircraftState::new("HIGH", 52.0, 4.0, 10000.0).with_velocity(90.0, 220.0, 0.0),
            AircraftState::new("LOW", 52.0, 4.05, 1000.0).with_velocity(270.0, 120.0, 5.0),
        ]
    }

    fn read(log: &Datalog, category: LogCategory) -> String {
        std::fs::read_to_string(log.path(category).unwrap()).unwrap()
    }

    #[test]
    fn test_strip_scn() {
        assert_eq!(strip_scn("crossing.SCN"), "crossing");
        assert_eq!(strip_scn("crossing"), "crossing");
        assert_eq!(strip_scn(""), "");
    }

    #[test]
    fn test_enable_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Datalog::new(dir.path(), "crossing.scn");
        log.enable(LogCategory::Sky).unwrap();

        let path = log.path(LogCategory::Sky).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("crossing-") && name.ends_with(".sky"), "{}", name);

        let text = read(&log, LogCategory::Sky);
        assert!(text.starts_with(SEPARATOR));
        assert!(text.contains("Scenario: crossing\n"));
        assert!(text.contains("SKY DATA\n"));
        assert!(text.contains("ntraf [-], nconf [-], nlos [-]"));
    }

    #[test]
    fn test_categories_share_run_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Datalog::new(dir.path(), "");
        log.enable(LogCategory::Sky).unwrap();
        log.enable(LogCategory::Conflict).unwrap();
        let sky = log.path(LogCategory::Sky).unwrap();
        let cfl = log.path(LogCategory::Conflict).unwrap();
        assert_eq!(sky.with_extension(""), cfl.with_extension(""));
        assert!(cfl.to_string_lossy().ends_with("-run.cfl"));
        assert!(sky.to_string_lossy().contains("-run"));
    }

    #[test]
    fn test_write_buffers_until_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Datalog::new(dir.path(), "buf");
        log.enable(LogCategory::Snapshot).unwrap();
        let before = read(&log, LogCategory::Snapshot);

        log.write(LogCategory::Snapshot, 61.5, "a,b,c");
        assert_eq!(log.buffered(LogCategory::Snapshot), 1);
        assert_eq!(read(&log, LogCategory::Snapshot), before);

        log.flush(LogCategory::Snapshot).unwrap();
        assert_eq!(log.buffered(LogCategory::Snapshot), 0);
        let after = read(&log, LogCategory::Snapshot);
        let line = after.lines().last().unwrap();
        assert!(line.ends_with(", 00:01:01.50, a,b,c"), "{}", line);
    }

    #[test]
    fn test_write_to_disabled_category_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Datalog::new(dir.path(), "off");
        log.write(LogCategory::Intrusion, 0.0, "x");
        assert_eq!(log.buffered(LogCategory::Intrusion), 0);
        assert!(log.path(LogCategory::Intrusion).is_none());
        assert!(log.flush_all().is_ok());
    }

    #[test]
    fn test_set_logger_off_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Datalog::new(dir.path(), "toggle");
        log.set_logger(LogCategory::Trajectory, true).unwrap();
        log.write(LogCategory::Trajectory, 10.0, "KLM1,EHAM,EGLL,52.0,4.0,3000.0");
        let path = log.path(LogCategory::Trajectory).unwrap();
        log.set_logger(LogCategory::Trajectory, false).unwrap();
        assert!(!log.is_enabled(LogCategory::Trajectory));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("KLM1,EHAM,EGLL"));
    }

    #[test]
    fn test_clear_buffer_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Datalog::new(dir.path(), "periodic");
        log.enable(LogCategory::FlightStats).unwrap();

        assert!(log.clear_buffer(0.0).unwrap());
        log.write(LogCategory::FlightStats, 100.0, "stats");
        assert!(!log.clear_buffer(100.0).unwrap());
        assert_eq!(log.buffered(LogCategory::FlightStats), 1);
        assert!(log.clear_buffer(301.0).unwrap());
        assert_eq!(log.buffered(LogCategory::FlightStats), 0);
    }

    #[test]
    fn test_periodic_savers() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Datalog::new(dir.path(), "savers");
        for c in [LogCategory::Sky, LogCategory::Snapshot, LogCategory::Instantaneous] {
            log.enable(c).unwrap();
        }
        let f = fleet();
        for simt in [0.0, 10.0, 20.0, 31.0] {
            log.sky_save(simt, f.len(), 1, 0);
            log.snap_save(simt, &f);
            log.inst_save(simt, &f, 0.1, 1);
        }
        assert_eq!(log.buffered(LogCategory::Sky), 2);
        // Only the aircraft above 5000 ft, twice
        assert_eq!(log.buffered(LogCategory::Snapshot), 2);
        assert_eq!(log.buffered(LogCategory::Instantaneous), 2);

        log.flush_all().unwrap();
        let inst = read(&log, LogCategory::Instantaneous);
        assert!(inst.lines().last().unwrap().ends_with(", 2,1,1,1"));
        let snap = read(&log, LogCategory::Snapshot);
        assert!(snap.contains("HIGH") && !snap.contains("LOW,"));
    }

    #[test]
    fn test_conflict_and_intrusion_records() {
        let dir = tempfile::tempdir().unwrap();
        let params = ResolutionParameters::default();
        let mut log = Datalog::new(dir.path(), "events");
        log.enable(LogCategory::Conflict).unwrap();
        log.enable(LogCategory::Intrusion).unwrap();

        let mut f = fleet();
        f[1].alt = 10100.0;
        let conflicts = vec![Conflict::between(&f, 0, 1, 5.0)];
        log.log_conflicts(12.0, &f, &conflicts);
        log.log_intrusions(12.0, &params, &f, &conflicts);
        assert_eq!(log.buffered(LogCategory::Conflict), 1);
        assert_eq!(log.buffered(LogCategory::Intrusion), 1);

        // Far apart vertically: conflict record but no intrusion
        f[1].alt = 12000.0;
        log.log_intrusions(13.0, &params, &f, &conflicts);
        assert_eq!(log.buffered(LogCategory::Intrusion), 1);
    }

    #[test]
    fn test_unwritable_directory_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let mut log = Datalog::new(blocker.join("logs"), "fail");
        let err = log.enable(LogCategory::Sky).unwrap_err();
        assert!(matches!(err, DatalogError::Io { .. }));
        assert!(!log.is_enabled(LogCategory::Sky));
    }

    /// Accepts a fixed number of writes, then reports a full disk
    struct FillingWriter {
        accepted: Vec<u8>,
        writes_left: usize,
    }

    impl Write for FillingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.writes_left == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.writes_left -= 1;
            self.accepted.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_keeps_only_unwritten_lines() {
        let mut buffer: Vec<String> = ["a\n", "b\n", "c\n"].iter().map(|s| s.to_string()).collect();
        let mut out = FillingWriter {
            accepted: Vec::new(),
            writes_left: 2,
        };
        assert!(write_lines(&mut out, &mut buffer).is_err());
        assert_eq!(buffer, vec!["c\n".to_string()]);

        // Retry after space frees up: no line appears twice
        out.writes_left = 10;
        write_lines(&mut out, &mut buffer).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(String::from_utf8(out.accepted).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn test_reset_disables_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Datalog::new(dir.path(), "reset");
        log.enable(LogCategory::Sky).unwrap();
        log.write(LogCategory::Sky, 0.0, "1,0,0");
        log.reset();
        assert!(!log.is_enabled(LogCategory::Sky));
        assert_eq!(log.buffered(LogCategory::Sky), 0);
        assert!(log.path(LogCategory::Sky).is_none());
    }
}
