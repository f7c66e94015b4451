//! Transport abstraction for the health feed.
//!
//! The monitor talks to its endpoint through two small traits: a
//! [`Connector`] opens connections and a [`Session`] yields the raw text
//! payloads of one open connection. [`WebSocketConnector`] is the production
//! implementation; tests substitute scripted ones.

use std::fmt::Debug;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens connections to the health endpoint.
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    /// Open a new session.
    async fn connect(&self) -> Result<Box<dyn Session>, TransportError>;

    /// Returns a human-readable description of the endpoint.
    ///
    /// Used in log lines.
    fn description(&self) -> &str;
}

/// One open connection.
#[async_trait]
pub trait Session: Send {
    /// Wait for the next payload.
    ///
    /// Returns `None` once the peer has closed the connection.
    async fn next_payload(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the connection. Best effort; errors are ignored.
    async fn close(&mut self);
}

/// Connects to a `ws://` or `wss://` health endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    /// Create a connector for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, TransportError> {
        let (stream, response) = connect_async(self.url.as_str()).await.map_err(|e| {
            use tokio_tungstenite::tungstenite::Error;
            match e {
                Error::Http(response) => {
                    TransportError::Connect(format!("HTTP error {}", response.status().as_u16()))
                }
                other => TransportError::Connect(other.to_string()),
            }
        })?;
        debug!(url = %self.url, status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WebSocketSession { stream }))
    }

    fn description(&self) -> &str {
        &self.url
    }
}

/// An open WebSocket connection.
struct WebSocketSession {
    stream: WsStream,
}

#[async_trait]
impl Session for WebSocketSession {
    async fn next_payload(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };

            match message {
                Message::Text(text) => return Some(Ok(text.as_str().to_owned())),
                Message::Binary(bytes) => {
                    return Some(
                        String::from_utf8(bytes.to_vec())
                            .map_err(|e| TransportError::Malformed(e.to_string())),
                    )
                }
                Message::Close(_) => return None,
                // Pings are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
