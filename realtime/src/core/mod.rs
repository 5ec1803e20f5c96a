//! Core business logic
//!
//! Pure state machines and decoders with no I/O dependencies

pub mod backoff;
pub mod connection;
pub mod endpoint;
pub mod feed;
pub mod message_log;
pub mod progress;
pub mod sse;

pub use backoff::{CloseKind, ReconnectPolicy};
pub use connection::{CloseOutcome, ConnectionMachine, ConnectionStatus};
pub use endpoint::socket_url;
pub use feed::{ChatProtocol, DashboardProtocol, FeedEvent};
pub use message_log::{MessageLog, PendingMessage};
pub use progress::{UploadProgressState, rescale, simulated_value};
pub use sse::SseDecoder;
