//! # healthwatch-client
//!
//! Live client for a recorder's health feed.
//!
//! A [`HealthMonitor`] keeps one connection to the recorder's health
//! WebSocket, reconnects on a fixed interval after any failure, drops
//! snapshots identical to the last one, and fans the rest out to
//! subscribers. A new subscriber immediately receives the current status,
//! so it never has to wait for the next change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use healthwatch_client::HealthMonitor;
//!
//! #[tokio::main]
//! async fn main() {
//!     let monitor = HealthMonitor::builder().build().expect("default config is valid");
//!
//!     monitor.subscribe(|status| {
//!         if let Some(status) = status {
//!             println!("{} {}", status.status, status.message);
//!         }
//!     });
//!     monitor.ensure_started();
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     monitor.shutdown().await;
//! }
//! ```
//!
//! ## Failures
//!
//! Transport problems never surface as errors to callers. Each one becomes
//! a synthetic snapshot with status `error`, code 500, every sub-resource
//! marked `error` and the cause in `message`, and the monitor moves to
//! [`ConnectionState::Failed`] until the retry succeeds.

mod cell;
mod config;
mod detector;
mod error;
mod monitor;
mod registry;
mod retry;
mod transport;

#[cfg(test)]
mod testing;

pub use cell::MonitorCell;
pub use config::{
    format_duration, parse_duration, MonitorConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT,
    DEFAULT_RETRY_INTERVAL,
};
pub use detector::has_changed;
pub use error::{ConfigError, TransportError};
pub use monitor::{ConnectionState, HealthMonitor, HealthMonitorBuilder, WeakMonitor};
pub use registry::{Callback, SubscriptionId, SubscriptionRegistry};
pub use retry::RetryTimer;
pub use transport::{Connector, Session, WebSocketConnector};

// Re-export the data model for convenience
pub use healthwatch_types::{OverallStatus, StatusSnapshot, SubResource};
