// Simulation-time interval trigger

/// Fires at most once per `period` seconds of simulation time.
///
/// Also fires when simulation time jumps backwards (scenario reset).
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period: f64,
    last: f64,
}

impl Interval {
    pub fn new(period: f64) -> Self {
        Interval {
            period,
            last: f64::NEG_INFINITY,
        }
    }

    /// True when the interval has elapsed at `simt`; re-arms from `simt`.
    pub fn due(&mut self, simt: f64) -> bool {
        if self.last + self.period < simt || simt < self.last {
            self.last = simt;
            true
        } else {
            false
        }
    }

    /// Forget the last trigger so the next call fires
    pub fn reset(&mut self) {
        self.last = f64::NEG_INFINITY;
    }
}
