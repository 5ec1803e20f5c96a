//! Realtime client error types

use thiserror::Error;
use shared::SharedError;

/// Result type for realtime client operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Not connected")]
    NotConnected,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid endpoint: {message}")]
    InvalidEndpoint { message: String },

    #[error("WebSocket connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("WebSocket handshake rejected with HTTP {status}")]
    HandshakeRejected { status: u16 },

    #[error("Authentication rejected (close code {code})")]
    AuthenticationFailed { code: u16 },

    #[error("Transport closed")]
    TransportClosed,

    #[error("Progress stream failed: {message}")]
    StreamFailed { message: String },

    #[error("Progress stream ended before completion")]
    StreamEnded,

    #[error("Progress stream timed out after {seconds}s")]
    StreamTimeout { seconds: u64 },

    #[error("Server reported processing error: {message}")]
    ServerError { message: String },

    #[error("Client task has stopped")]
    ClientStopped,

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl RealtimeError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::StreamFailed { message: message.into() }
    }

    /// Whether the backend refused our credentials during the handshake
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            RealtimeError::HandshakeRejected { status: 401 | 403 } | RealtimeError::AuthenticationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_rejection_classification() {
        assert!(RealtimeError::HandshakeRejected { status: 401 }.is_auth_rejection());
        assert!(RealtimeError::HandshakeRejected { status: 403 }.is_auth_rejection());
        assert!(!RealtimeError::HandshakeRejected { status: 502 }.is_auth_rejection());
        assert!(!RealtimeError::connection("refused").is_auth_rejection());
    }
}
