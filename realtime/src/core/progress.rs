//! Upload progress state: simulated phase, server phase, monotonic display
//!
//! Pure business logic with no I/O dependencies

use std::time::Duration;

/// Map a server percentage (0-100) into the range above the ceiling.
/// Exact at the boundaries: 0 maps to `ceiling`, 100 maps to 100.
pub fn rescale(ceiling: u8, server_percent: f64) -> u8 {
    let ceiling = ceiling.min(100);
    let percent = if server_percent.is_finite() { server_percent.clamp(0.0, 100.0) } else { 0.0 };
    let span = f64::from(100 - ceiling);
    let value = f64::from(ceiling) + (percent * span / 100.0).round();
    value.clamp(f64::from(ceiling), 100.0) as u8
}

/// Simulated value after `elapsed` of a `total` run, rising linearly to the ceiling
pub fn simulated_value(ceiling: u8, elapsed: Duration, total: Duration) -> u8 {
    if total.is_zero() {
        return ceiling;
    }
    let fraction = (elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0);
    (f64::from(ceiling) * fraction).round() as u8
}

/// Progress of a single file's processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgressState {
    ceiling: u8,
    simulating: bool,
    server_started: bool,
    displayed: u8,
}

impl UploadProgressState {
    pub fn new(ceiling: u8) -> Self {
        Self {
            ceiling: ceiling.min(99),
            simulating: false,
            server_started: false,
            displayed: 0,
        }
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling
    }

    pub fn displayed(&self) -> u8 {
        self.displayed
    }

    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    pub fn server_started(&self) -> bool {
        self.server_started
    }

    pub fn start_simulation(&mut self) {
        if !self.server_started {
            self.simulating = true;
        }
    }

    pub fn stop_simulation(&mut self) {
        self.simulating = false;
    }

    /// Apply a simulated value. Ignored once the server phase has started;
    /// never exceeds the ceiling and never lowers the display.
    pub fn apply_simulated(&mut self, value: u8) -> Option<u8> {
        if self.server_started || !self.simulating {
            return None;
        }
        let next = self.displayed.max(value.min(self.ceiling));
        if next == self.displayed {
            return None;
        }
        self.displayed = next;
        Some(next)
    }

    /// Apply an authoritative server percentage. The first call freezes the
    /// simulation and lifts the display to the ceiling.
    pub fn apply_server(&mut self, server_percent: f64) -> u8 {
        if !self.server_started {
            self.server_started = true;
            self.simulating = false;
            self.displayed = self.displayed.max(self.ceiling);
        }
        self.displayed = self.displayed.max(rescale(self.ceiling, server_percent));
        self.displayed
    }

    /// The server reported completion
    pub fn finish(&mut self) -> u8 {
        self.server_started = true;
        self.simulating = false;
        self.displayed = 100;
        self.displayed
    }
}
