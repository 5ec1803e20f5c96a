//! Server-sent progress stream service implementation

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use shared::ProgressEvent;
use crate::core::sse::SseDecoder;
use crate::error::{RealtimeError, RealtimeResult};
use crate::traits::{ProgressSource, TokenProvider};

const EVENT_BUFFER: usize = 64;

/// Real progress source reading `text/event-stream` responses with reqwest
#[derive(Clone)]
pub struct RealProgressSource {
    client: reqwest::Client,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl RealProgressSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, tokens: None }
    }

    /// Send the provider's token as a bearer `Authorization` header
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    fn decode(data: &str) -> Option<RealtimeResult<ProgressEvent>> {
        match serde_json::from_str::<ProgressEvent>(data) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!("Dropping malformed progress event: {} ({})", e, data);
                None
            }
        }
    }
}

#[async_trait]
impl ProgressSource for RealProgressSource {
    async fn open(&self, url: &Url) -> RealtimeResult<mpsc::Receiver<RealtimeResult<ProgressEvent>>> {
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(token) = self.tokens.as_ref().and_then(|t| t.token()) {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RealtimeError::stream(format!("HTTP {}", response.status())));
        }
        debug!("📡 Progress stream opened: {}", url);

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let mut body = response.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        for data in decoder.feed(&bytes) {
                            if let Some(event) = Self::decode(&data) {
                                if tx.send(event).await.is_err() {
                                    // Receiver dropped: the caller closed the stream
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(RealtimeError::stream(e.to_string()))).await;
                        return;
                    }
                }
            }
            if let Some(event) = decoder.finish().as_deref().and_then(Self::decode) {
                let _ = tx.send(event).await;
            }
        });

        Ok(rx)
    }
}
