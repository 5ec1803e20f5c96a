//! WebSocket connector service implementation
//!
//! Opens transports with tokio-tungstenite and pumps frames between the
//! socket and the channel pair held by the client.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};
use url::Url;

use crate::core::backoff::{ABNORMAL_CLOSURE, NO_STATUS_RECEIVED};
use crate::error::{RealtimeError, RealtimeResult};
use crate::traits::Connector;
use crate::types::{OutboundFrame, TransportEvent, TransportHandle, TransportPeer};

/// Real connector backed by tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct RealConnector;

impl RealConnector {
    pub fn new() -> Self {
        Self
    }
}

fn map_connect_error(error: WsError) -> RealtimeError {
    match error {
        WsError::Http(response) => RealtimeError::HandshakeRejected { status: response.status().as_u16() },
        other => RealtimeError::connection(other.to_string()),
    }
}

#[async_trait]
impl Connector for RealConnector {
    async fn open(&self, url: &Url) -> RealtimeResult<TransportHandle> {
        let (socket, _response) = connect_async(url.as_str()).await.map_err(map_connect_error)?;
        debug!("🔌 WebSocket handshake completed with {}", url.host_str().unwrap_or("?"));

        let (handle, peer) = TransportHandle::pair();
        tokio::spawn(pump(socket, peer));
        Ok(handle)
    }
}

/// Move frames between the socket and the client until either side closes.
/// Always ends by reporting `Closed`, unless the client asked for the close.
async fn pump(socket: WebSocketStream<MaybeTlsStream<TcpStream>>, peer: TransportPeer) {
    let (mut sink, mut stream) = socket.split();
    let TransportPeer { mut outbound, inbound } = peer;

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        let _ = inbound.send(TransportEvent::Error(e.to_string()));
                        let _ = inbound.send(TransportEvent::Closed {
                            code: Some(ABNORMAL_CLOSURE),
                            reason: "write failed".to_string(),
                        });
                        break;
                    }
                }
                Some(OutboundFrame::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    break;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(TransportEvent::Text(text)).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        if inbound.send(TransportEvent::Text(text)).is_err() {
                            break;
                        }
                    }
                    Err(_) => warn!("Dropping non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
                        None => (Some(NO_STATUS_RECEIVED), String::new()),
                    };
                    let _ = inbound.send(TransportEvent::Closed { code, reason });
                    break;
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = inbound.send(TransportEvent::Error(e.to_string()));
                    let _ = inbound.send(TransportEvent::Closed {
                        code: Some(ABNORMAL_CLOSURE),
                        reason: "connection lost".to_string(),
                    });
                    break;
                }
                None => {
                    let _ = inbound.send(TransportEvent::Closed {
                        code: Some(ABNORMAL_CLOSURE),
                        reason: "stream ended".to_string(),
                    });
                    break;
                }
            },
        }
    }
}
