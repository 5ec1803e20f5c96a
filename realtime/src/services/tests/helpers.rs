//! Test helpers for realtime service tests

use std::future::Future;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http;
use url::Url;

use crate::types::{TransportEvent, TransportHandle};

/// Accept one WebSocket connection on an ephemeral port and hand it to `handler`
pub async fn spawn_ws_server<F, Fut>(handler: F) -> Url
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        handler(socket).await;
    });
    Url::parse(&format!("ws://{addr}/api/ws/chat")).unwrap()
}

/// Answer the upgrade request with a plain HTTP error status
pub async fn spawn_rejecting_server(status: u16) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let reject = move |_: &Request, _: Response| -> Result<Response, ErrorResponse> {
            Err(http::Response::builder().status(status).body(None).unwrap())
        };
        let _ = tokio_tungstenite::accept_hdr_async(stream, reject).await;
    });
    Url::parse(&format!("ws://{addr}/api/ws/chat")).unwrap()
}

/// Address nothing listens on
pub async fn unused_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("ws://{addr}/api/ws/chat")).unwrap()
}

/// Next inbound event, failing the test after a few seconds
pub async fn next_event(handle: &mut TransportHandle) -> TransportEvent {
    tokio::time::timeout(Duration::from_secs(5), handle.inbound.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("transport channel closed")
}
