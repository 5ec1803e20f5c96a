//! Realtime console client library
//!
//! Resilient WebSocket feeds (chat and dashboard) with bounded reconnection,
//! plus a hybrid progress estimator that blends a client-side simulation with
//! server-pushed progress events.

pub mod config;
pub mod core;
pub mod error;
pub mod estimator;
pub mod services;
pub mod socket_client;
pub mod traits;
pub mod types;

// Re-export main types
pub use config::{ClientConfig, ProgressConfig};
pub use error::{RealtimeError, RealtimeResult};
pub use estimator::{EstimationSession, ProgressEstimator, StopHandle, StreamCallbacks};
pub use socket_client::SocketClient;
pub use types::*;

// Re-export pure logic used by embedders
pub use crate::core::{CloseKind, ConnectionStatus, ReconnectPolicy, UploadProgressState};

// Re-export trait definitions
pub use traits::{Connector, FeedProtocol, ProgressSource, TokenProvider};

// Re-export service implementations
pub use services::{RealConnector, RealProgressSource, SharedToken, StaticToken};
