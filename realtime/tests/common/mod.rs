//! Common test utilities for realtime integration tests
//!
//! Scripted transports stand in for the network so that connection
//! lifecycles can be driven step by step, with tokio's paused clock where
//! reconnect timing matters.

#![allow(dead_code)]

pub mod fixtures;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use realtime::{
    ConnectionSnapshot, Connector, RealtimeError, RealtimeResult, SocketClient, TransportHandle, TransportPeer,
};
use realtime::types::{OutboundFrame, TransportEvent};

const WAIT_LIMIT: Duration = Duration::from_secs(60);

/// Connector that hands the transport side of every accepted open to the
/// test and fails opens on demand
pub struct ScriptedConnector {
    opens: AtomicUsize,
    urls: Mutex<Vec<Url>>,
    failures: Mutex<VecDeque<RealtimeError>>,
    peers: mpsc::UnboundedSender<TransportPeer>,
}

impl ScriptedConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<TransportPeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        let connector = Self {
            opens: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            peers,
        };
        (Arc::new(connector), peer_rx)
    }

    /// Make the next open attempt fail with `error`
    pub fn fail_next(&self, error: RealtimeError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, url: &Url) -> RealtimeResult<TransportHandle> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());

        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        let (handle, peer) = TransportHandle::pair();
        let _ = self.peers.send(peer);
        Ok(handle)
    }
}

/// Wait until the client's state satisfies `condition`
pub async fn wait_for<F>(client: &SocketClient, condition: F) -> ConnectionSnapshot
where
    F: FnMut(&ConnectionSnapshot) -> bool,
{
    let mut state = client.subscribe();
    let snapshot = tokio::time::timeout(WAIT_LIMIT, state.wait_for(condition))
        .await
        .expect("timed out waiting for client state")
        .expect("client task stopped");
    snapshot.clone()
}

pub async fn wait_open(client: &SocketClient) -> ConnectionSnapshot {
    wait_for(client, |s| s.is_connected).await
}

pub async fn next_peer(peers: &mut mpsc::UnboundedReceiver<TransportPeer>) -> TransportPeer {
    tokio::time::timeout(WAIT_LIMIT, peers.recv())
        .await
        .expect("timed out waiting for an open")
        .expect("connector dropped")
}

pub async fn next_frame(peer: &mut TransportPeer) -> OutboundFrame {
    tokio::time::timeout(WAIT_LIMIT, peer.outbound.recv())
        .await
        .expect("timed out waiting for an outbound frame")
        .expect("client dropped the transport")
}

/// Push a text frame from the server side
pub fn push_text(peer: &TransportPeer, text: impl Into<String>) {
    peer.inbound.send(TransportEvent::Text(text.into())).unwrap();
}

pub fn push_close(peer: &TransportPeer, code: u16, reason: &str) {
    peer.inbound
        .send(TransportEvent::Closed { code: Some(code), reason: reason.to_string() })
        .unwrap();
}

/// Let the client task drain its queue
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
