//! Venue connections
//!
//! `FeedConnector` opens one stream of raw text frames for one instrument.
//! The adapter owns retry policy; a connector only dials once per call.

use crate::error::FeedError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// Frames from one open connection. A `Read` or `Closed` error ends it.
pub type FeedStream = BoxStream<'static, Result<String, FeedError>>;

#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self, symbol: &str) -> Result<FeedStream, FeedError>;
}

/// Binance style `{base}/{symbol}@trade` WebSocket streams.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn stream_url(&self, symbol: &str) -> String {
        format!("{}/{}@trade", self.base_url.trim_end_matches('/'), symbol)
    }
}

#[async_trait]
impl FeedConnector for WsConnector {
    async fn connect(&self, symbol: &str) -> Result<FeedStream, FeedError> {
        let url = self.stream_url(symbol);
        let (socket, response) = connect_async(url.as_str())
            .await
            .map_err(|e| FeedError::Dial(e.to_string()))?;
        debug!(url = %url, status = %response.status(), "WebSocket handshake complete");

        // Pong replies are flushed by the read side, so the socket is not split.
        let frames = socket.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                Ok(Message::Binary(bytes)) => Some(
                    String::from_utf8(bytes.to_vec())
                        .map_err(|e| FeedError::Malformed(e.to_string())),
                ),
                Ok(Message::Close(_)) => Some(Err(FeedError::Closed)),
                Ok(_) => None,
                Err(e) => Some(Err(FeedError::Read(e.to_string()))),
            }
        });

        Ok(frames.boxed())
    }
}
