//! Connection lifecycle state machine
//!
//! Pure business logic with no I/O dependencies. The socket client actor
//! feeds transport outcomes in and acts on the decisions that come out.

use std::time::Duration;

use crate::core::backoff::{CloseKind, ReconnectPolicy, ABNORMAL_CLOSURE};
use crate::error::RealtimeError;

/// Lifecycle state of one logical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Open,
    ClosedRecoverable,
    /// Absorbing: no further connects for this logical connection
    ClosedTerminal,
}

impl ConnectionStatus {
    /// A transport exists or is being created
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Open)
    }
}

/// What the caller must do after a closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Schedule a reconnect after the delay
    Reconnect(Duration),
    /// Terminal closure, reconnection disabled
    Terminal,
    /// Reconnection was already disabled (explicit disconnect)
    Stopped,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    policy: ReconnectPolicy,
    status: ConnectionStatus,
    attempts: u32,
    should_reconnect: bool,
    auth_failed: bool,
    last_error: Option<String>,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            status: ConnectionStatus::Idle,
            attempts: 0,
            should_reconnect: false,
            auth_failed: false,
            last_error: None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn should_reconnect(&self) -> bool {
        self.should_reconnect
    }

    pub fn auth_failed(&self) -> bool {
        self.auth_failed
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Open
    }

    /// Explicit connect request. Returns true when a transport must be opened.
    pub fn begin_connect(&mut self) -> bool {
        match self.status {
            ConnectionStatus::Connecting | ConnectionStatus::Open | ConnectionStatus::ClosedTerminal => false,
            ConnectionStatus::Idle | ConnectionStatus::ClosedRecoverable => {
                self.should_reconnect = true;
                self.status = ConnectionStatus::Connecting;
                true
            }
        }
    }

    /// The reconnect delay elapsed. Returns true when a transport must be opened.
    pub fn reconnect_due(&mut self) -> bool {
        if self.status == ConnectionStatus::ClosedRecoverable && self.should_reconnect {
            self.status = ConnectionStatus::Connecting;
            true
        } else {
            false
        }
    }

    pub fn on_open(&mut self) {
        self.status = ConnectionStatus::Open;
        self.attempts = 0;
        self.last_error = None;
    }

    /// Opening the transport failed before it ever became open
    pub fn on_open_failed(&mut self, error: &RealtimeError) -> CloseOutcome {
        self.last_error = Some(error.to_string());
        if error.is_auth_rejection() {
            self.enter_terminal(error.to_string());
            return CloseOutcome::Terminal;
        }
        self.apply_close(Some(ABNORMAL_CLOSURE))
    }

    /// Transport-level error on an open connection. The transport is
    /// treated as dropped (abnormal closure); returns `None` when no
    /// connection was open.
    pub fn on_transport_error(&mut self, message: impl Into<String>) -> Option<CloseOutcome> {
        self.last_error = Some(message.into());
        if self.status != ConnectionStatus::Open {
            return None;
        }
        Some(self.apply_close(Some(ABNORMAL_CLOSURE)))
    }

    pub fn on_closed(&mut self, code: Option<u16>, reason: &str) -> CloseOutcome {
        if self.status == ConnectionStatus::ClosedTerminal {
            return CloseOutcome::Terminal;
        }
        let outcome = self.apply_close(code);
        if outcome == CloseOutcome::Terminal {
            let code = code.unwrap_or(ABNORMAL_CLOSURE);
            let detail = if reason.is_empty() {
                RealtimeError::AuthenticationFailed { code }.to_string()
            } else {
                format!("{}: {}", RealtimeError::AuthenticationFailed { code }, reason)
            };
            self.last_error = Some(detail);
        } else if !reason.is_empty() && outcome != CloseOutcome::Stopped {
            self.last_error.get_or_insert_with(|| reason.to_string());
        }
        outcome
    }

    /// Explicit disconnect. Idempotent.
    pub fn disconnect(&mut self) {
        self.should_reconnect = false;
        if self.status != ConnectionStatus::ClosedTerminal {
            self.status = ConnectionStatus::Idle;
        }
    }

    /// Record a local error, e.g. a send attempted while disconnected
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    fn apply_close(&mut self, code: Option<u16>) -> CloseOutcome {
        if !self.should_reconnect {
            if self.status != ConnectionStatus::ClosedTerminal {
                self.status = ConnectionStatus::Idle;
            }
            return CloseOutcome::Stopped;
        }

        match self.policy.classify(code) {
            CloseKind::Recoverable => {
                let delay = self.policy.delay_for(self.attempts);
                self.attempts = self.attempts.saturating_add(1);
                self.status = ConnectionStatus::ClosedRecoverable;
                CloseOutcome::Reconnect(delay)
            }
            CloseKind::Terminal => {
                self.enter_terminal(format!("close code {}", code.unwrap_or(ABNORMAL_CLOSURE)));
                CloseOutcome::Terminal
            }
            CloseKind::Unclassified => {
                self.should_reconnect = false;
                self.status = ConnectionStatus::Idle;
                self.last_error = Some(format!("closed with code {}", code.unwrap_or(ABNORMAL_CLOSURE)));
                CloseOutcome::Stopped
            }
        }
    }

    fn enter_terminal(&mut self, detail: String) {
        self.should_reconnect = false;
        self.auth_failed = true;
        self.status = ConnectionStatus::ClosedTerminal;
        self.last_error = Some(detail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ConnectionMachine {
        ConnectionMachine::new(ReconnectPolicy::default())
    }

    #[test]
    fn test_connect_is_idempotent_while_active() {
        let mut m = machine();
        assert!(m.begin_connect());
        assert!(!m.begin_connect());
        m.on_open();
        assert!(!m.begin_connect());
        assert!(m.is_connected());
    }

    #[test]
    fn test_attempts_follow_recoverable_closures() {
        let mut m = machine();
        m.begin_connect();
        m.on_open();

        let mut delays = Vec::new();
        for _ in 0..8 {
            match m.on_closed(Some(1006), "") {
                CloseOutcome::Reconnect(delay) => delays.push(delay.as_secs()),
                other => panic!("Expected reconnect, got {other:?}"),
            }
            assert!(m.reconnect_due());
        }
        assert_eq!(delays, vec![1, 3, 6, 10, 15, 30, 30, 30]);
        assert_eq!(m.attempts(), 8);

        m.on_open();
        assert_eq!(m.attempts(), 0);
        assert_eq!(m.on_closed(Some(1000), ""), CloseOutcome::Reconnect(Duration::from_secs(1)));
        assert_eq!(m.attempts(), 1);
    }

    #[test]
    fn test_failed_open_counts_as_recoverable_closure() {
        let mut m = machine();
        m.begin_connect();
        let outcome = m.on_open_failed(&RealtimeError::connection("connection refused"));
        assert_eq!(outcome, CloseOutcome::Reconnect(Duration::from_secs(1)));
        assert_eq!(m.status(), ConnectionStatus::ClosedRecoverable);
        assert!(m.last_error().unwrap().contains("refused"));
    }

    #[test]
    fn test_auth_close_is_terminal_regardless_of_attempts() {
        let mut m = machine();
        m.begin_connect();
        for _ in 0..4 {
            m.on_closed(Some(1006), "");
            m.reconnect_due();
        }
        assert_eq!(m.attempts(), 4);

        assert_eq!(m.on_closed(Some(4001), "invalid token"), CloseOutcome::Terminal);
        assert!(!m.should_reconnect());
        assert!(m.auth_failed());
        assert_eq!(m.status(), ConnectionStatus::ClosedTerminal);
        assert!(m.last_error().unwrap().contains("4001"));

        // Absorbing
        assert!(!m.reconnect_due());
        assert!(!m.begin_connect());
        m.disconnect();
        assert_eq!(m.status(), ConnectionStatus::ClosedTerminal);
    }

    #[test]
    fn test_handshake_rejection_is_terminal() {
        let mut m = machine();
        m.begin_connect();
        let outcome = m.on_open_failed(&RealtimeError::HandshakeRejected { status: 401 });
        assert_eq!(outcome, CloseOutcome::Terminal);
        assert!(m.auth_failed());
    }

    #[test]
    fn test_disconnect_stops_reconnection() {
        let mut m = machine();
        m.disconnect();
        m.disconnect();
        assert_eq!(m.status(), ConnectionStatus::Idle);

        m.begin_connect();
        m.on_open();
        m.disconnect();
        assert_eq!(m.status(), ConnectionStatus::Idle);
        assert_eq!(m.on_closed(Some(1000), ""), CloseOutcome::Stopped);
        assert_eq!(m.status(), ConnectionStatus::Idle);
        assert!(!m.reconnect_due());
    }

    #[test]
    fn test_unclassified_close_stops_without_auth_failure() {
        let mut m = machine();
        m.begin_connect();
        m.on_open();
        assert_eq!(m.on_closed(Some(1011), "server error"), CloseOutcome::Stopped);
        assert!(!m.should_reconnect());
        assert!(!m.auth_failed());
        assert_eq!(m.status(), ConnectionStatus::Idle);
        // A fresh explicit connect is still allowed
        assert!(m.begin_connect());
    }

    #[test]
    fn test_transport_error_marks_connection_down() {
        let mut m = machine();
        m.begin_connect();
        m.on_open();
        let outcome = m.on_transport_error("connection reset");

        assert_eq!(outcome, Some(CloseOutcome::Reconnect(Duration::from_secs(1))));
        assert!(!m.is_connected());
        assert_eq!(m.status(), ConnectionStatus::ClosedRecoverable);
        assert_eq!(m.attempts(), 1);
        assert_eq!(m.last_error(), Some("connection reset"));
        // An explicit connect is honoured right away
        assert!(m.begin_connect());
    }

    #[test]
    fn test_transport_error_without_open_connection_only_records() {
        let mut m = machine();
        assert_eq!(m.on_transport_error("late error"), None);
        assert_eq!(m.status(), ConnectionStatus::Idle);
        assert_eq!(m.last_error(), Some("late error"));
    }
}
