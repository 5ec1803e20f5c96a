//! Service trait definitions for dependency injection
//!
//! All I/O operations are abstracted through these traits for testability

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use shared::{FeedName, ProgressEvent, SharedResult};
use crate::core::feed::FeedEvent;
use crate::error::RealtimeResult;
use crate::types::TransportHandle;

/// Opens physical WebSocket transports
#[mockall::automock]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to the given socket URL. Resolves once the
    /// handshake completed; closure is reported through the handle.
    async fn open(&self, url: &Url) -> RealtimeResult<TransportHandle>;
}

/// Supplies the bearer token appended to socket URLs
#[mockall::automock]
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Opens server-push progress streams
#[mockall::automock]
#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// Open the stream. Dropping the receiver closes it.
    async fn open(&self, url: &Url) -> RealtimeResult<mpsc::Receiver<RealtimeResult<ProgressEvent>>>;
}

/// Feed-specific addressing and frame decoding
pub trait FeedProtocol: Send + Sync + 'static {
    fn feed(&self) -> &FeedName;

    /// Optional path segment after the feed name (session, station)
    fn sub_resource(&self) -> Option<&str> {
        None
    }

    /// Decode one inbound text frame
    fn decode(&self, text: &str) -> SharedResult<FeedEvent>;
}
