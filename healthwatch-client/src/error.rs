//! Error types for the health client.

use std::time::Duration;

use thiserror::Error;

/// Failures on the health connection.
///
/// None of these reach callers of [`HealthMonitor`](crate::HealthMonitor);
/// the monitor turns each one into a synthetic error snapshot whose message
/// is this error's `Display` output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Opening the connection took longer than the connect timeout.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// The established connection errored.
    #[error("Connection error: {0}")]
    Stream(String),

    /// The peer closed the connection.
    #[error("Connection closed")]
    Closed,

    /// A message could not be decoded as a status snapshot.
    #[error("Malformed payload: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Whether the failure happened before the connection was established.
    pub fn is_establishment(&self) -> bool {
        matches!(self, TransportError::Connect(_) | TransportError::Timeout(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;

        match err {
            Error::ConnectionClosed | Error::AlreadyClosed => TransportError::Closed,
            other => TransportError::Stream(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Malformed(err.to_string())
    }
}

/// Invalid monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A duration string could not be parsed.
    #[error("Invalid duration '{0}': expected a number followed by ns, us, ms or s")]
    Duration(String),

    /// The endpoint is not a ws:// or wss:// URL.
    #[error("Invalid endpoint '{0}': expected a ws:// or wss:// URL")]
    Endpoint(String),

    /// A duration that must be positive was zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}
