//! Reconnect policy: close-code classification and the backoff delay table
//!
//! Pure logic with no I/O dependencies

use std::collections::BTreeSet;
use std::time::Duration;

/// Close code used for failed opens and abrupt drops (no close frame seen)
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported for a close frame that carried no status
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// How a closure should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Eligible for automatic reconnection
    Recoverable,
    /// Authentication failure, never reconnect
    Terminal,
    /// Neither set: stop reconnecting, but it is not an auth failure
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delays: Vec<Duration>,
    recoverable_codes: BTreeSet<u16>,
    terminal_codes: BTreeSet<u16>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays: [1, 3, 6, 10, 15, 30].into_iter().map(Duration::from_secs).collect(),
            recoverable_codes: [1000, 1001, ABNORMAL_CLOSURE].into_iter().collect(),
            terminal_codes: [4000, 4001, 4003].into_iter().collect(),
        }
    }
}

impl ReconnectPolicy {
    /// Build a policy. Returns `None` when the delay table is empty.
    pub fn new(
        delays: Vec<Duration>,
        recoverable_codes: impl IntoIterator<Item = u16>,
        terminal_codes: impl IntoIterator<Item = u16>,
    ) -> Option<Self> {
        if delays.is_empty() {
            return None;
        }
        let terminal_codes: BTreeSet<u16> = terminal_codes.into_iter().collect();
        // A code listed in both sets is terminal
        let recoverable_codes = recoverable_codes
            .into_iter()
            .filter(|code| !terminal_codes.contains(code))
            .collect();
        Some(Self { delays, recoverable_codes, terminal_codes })
    }

    /// Delay before the next reconnect, selected by the current attempt counter
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let index = (attempts as usize).min(self.delays.len() - 1);
        self.delays[index]
    }

    /// Classify a closure. `None` means no close frame was seen at all and is
    /// treated as [`ABNORMAL_CLOSURE`]; a close frame without a status is
    /// reported by transports as [`NO_STATUS_RECEIVED`] and goes through the
    /// configured sets like any other code.
    pub fn classify(&self, code: Option<u16>) -> CloseKind {
        let code = code.unwrap_or(ABNORMAL_CLOSURE);
        if self.terminal_codes.contains(&code) {
            CloseKind::Terminal
        } else if self.recoverable_codes.contains(&code) {
            CloseKind::Recoverable
        } else {
            CloseKind::Unclassified
        }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn recoverable_codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.recoverable_codes.iter().copied()
    }

    pub fn terminal_codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.terminal_codes.iter().copied()
    }
}
