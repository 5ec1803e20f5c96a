//! Type definitions for the realtime client
//!
//! This module contains the data types exchanged between the client actors,
//! the transports and callers that are not service traits.

use tokio::sync::mpsc;

use shared::FeedMessage;
use crate::core::connection::ConnectionStatus;
use crate::core::message_log::PendingMessage;

/// Frame written to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the transport gracefully
    Close,
}

/// Event read from a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Error(String),
    /// Always the last event of a transport
    Closed { code: Option<u16>, reason: String },
}

/// Both ends of an open transport, as seen by the client
#[derive(Debug)]
pub struct TransportHandle {
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportHandle {
    /// Create a handle plus the transport-side ends of its channels
    pub fn pair() -> (Self, TransportPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        (
            Self { outbound: outbound_tx, inbound: inbound_rx },
            TransportPeer { outbound: outbound_rx, inbound: inbound_tx },
        )
    }
}

/// Transport side of a [`TransportHandle`]
#[derive(Debug)]
pub struct TransportPeer {
    pub outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    pub inbound: mpsc::UnboundedSender<TransportEvent>,
}

/// Observable state of one logical connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    pub is_connected: bool,
    pub should_reconnect: bool,
    pub attempts: u32,
    pub auth_failed: bool,
    pub last_error: Option<String>,
    pub messages: Vec<FeedMessage>,
    pub streaming: Option<PendingMessage>,
    pub processing_status: Option<String>,
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            is_connected: false,
            should_reconnect: false,
            attempts: 0,
            auth_failed: false,
            last_error: None,
            messages: Vec::new(),
            streaming: None,
            processing_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transport_pair_wiring() {
        let (mut handle, mut peer) = TransportHandle::pair();

        handle.outbound.send(OutboundFrame::Text("ping".to_string())).unwrap();
        assert_eq!(peer.outbound.recv().await, Some(OutboundFrame::Text("ping".to_string())));

        peer.inbound.send(TransportEvent::Text("pong".to_string())).unwrap();
        assert_eq!(handle.inbound.recv().await, Some(TransportEvent::Text("pong".to_string())));

        drop(peer);
        assert_eq!(handle.inbound.recv().await, None);
    }

    #[test]
    fn test_default_snapshot_is_idle() {
        let snapshot = ConnectionSnapshot::default();
        assert_eq!(snapshot.status, ConnectionStatus::Idle);
        assert!(!snapshot.is_connected);
        assert!(snapshot.messages.is_empty());
    }
}
