// Resolution output sinks
// Publishes the autopilot targets written by a resolution pass

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::warn;

use crate::constants::{FPM, FT, KTS};
use crate::datalog::sim_time_text;
use crate::traffic::{AircraftState, Resolution};

/// Trait for output handlers
pub trait OutputHandler: Send {
    /// Handle the resolution of one aircraft at simulation time `simt`
    fn handle_resolution(&mut self, simt: f64, ac: &AircraftState, resolution: &Resolution);

    /// Push buffered output to its destination
    fn flush(&mut self) {}
}

/// Publish every aircraft carrying a resolution to all handlers
pub fn publish(handlers: &mut [Box<dyn OutputHandler>], simt: f64, fleet: &[AircraftState]) -> usize {
    let mut published = 0;
    for ac in fleet {
        if let Some(resolution) = &ac.resolution {
            for handler in handlers.iter_mut() {
                handler.handle_resolution(simt, ac, resolution);
            }
            published += 1;
        }
    }
    published
}

/// One resolution line, SI units
#[derive(Debug, Serialize)]
pub struct ResolutionRecord<'a> {
    pub simt: f64,
    pub id: &'a str,
    pub heading: f64,
    pub airspeed: f64,
    pub vertical_speed: f64,
    pub altitude: f64,
}

impl<'a> ResolutionRecord<'a> {
    pub fn new(simt: f64, ac: &'a AircraftState, resolution: &Resolution) -> Self {
        ResolutionRecord {
            simt,
            id: &ac.id,
            heading: resolution.heading,
            airspeed: resolution.airspeed,
            vertical_speed: resolution.vertical_speed,
            altitude: resolution.altitude,
        }
    }
}

/// CSV format output, aviation units
pub struct CsvOutput {
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl CsvOutput {
    pub fn new(path: &str) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(CsvOutput {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    /// Format: simt,id,hdg_deg,tas_kts,vs_fpm,alt_ft
    pub fn format_csv(simt: f64, ac: &AircraftState, resolution: &Resolution) -> String {
        format!(
            "{},{},{:.1},{:.1},{:.0},{:.0}",
            sim_time_text(simt),
            ac.id,
            resolution.heading,
            resolution.airspeed / KTS,
            resolution.vertical_speed / FPM,
            resolution.altitude / FT
        )
    }
}

impl OutputHandler for CsvOutput {
    fn handle_resolution(&mut self, simt: f64, ac: &AircraftState, resolution: &Resolution) {
        if let Ok(mut w) = self.writer.lock() {
            if let Err(e) = writeln!(w, "{}", Self::format_csv(simt, ac, resolution)) {
                warn!("Failed to write CSV: {}", e);
            }
        }
    }

    fn flush(&mut self) {
        if let Ok(mut w) = self.writer.lock() {
            if let Err(e) = w.flush() {
                warn!("Failed to flush CSV: {}", e);
            }
        }
    }
}

/// JSON lines output
pub struct JsonOutput {
    writer: Box<dyn Write + Send>,
}

impl JsonOutput {
    /// JSON lines on stdout
    pub fn stdout() -> Self {
        JsonOutput::new(Box::new(io::stdout()))
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        JsonOutput { writer }
    }

    pub fn format_json(simt: f64, ac: &AircraftState, resolution: &Resolution) -> serde_json::Result<String> {
        serde_json::to_string(&ResolutionRecord::new(simt, ac, resolution))
    }
}

impl OutputHandler for JsonOutput {
    fn handle_resolution(&mut self, simt: f64, ac: &AircraftState, resolution: &Resolution) {
        let line = match Self::format_json(simt, ac, resolution) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode resolution of {}: {}", ac.id, e);
                return;
            }
        };
        if let Err(e) = writeln!(self.writer, "{}", line) {
            warn!("Failed to write JSON: {}", e);
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush JSON: {}", e);
        }
    }
}
