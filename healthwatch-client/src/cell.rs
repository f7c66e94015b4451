//! Lazily constructed, process-wide monitor.

use std::sync::{Arc, OnceLock};

use crate::config::MonitorConfig;
use crate::error::ConfigError;
use crate::monitor::HealthMonitor;
use crate::transport::{Connector, WebSocketConnector};

/// Holds at most one [`HealthMonitor`], built on first use.
///
/// Intended for a `static` or an application-wide context so that every
/// component observing the recorder shares one connection:
///
/// ```rust,no_run
/// use healthwatch_client::{MonitorCell, MonitorConfig};
///
/// # async fn example() -> Result<(), healthwatch_client::ConfigError> {
/// let cell = MonitorCell::new(MonitorConfig::default())?;
/// let monitor = cell.get_started();
/// println!("{:?}", monitor.current_status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MonitorCell {
    config: MonitorConfig,
    connector: Arc<dyn Connector>,
    monitor: OnceLock<HealthMonitor>,
}

impl MonitorCell {
    /// Create an empty cell that will connect over WebSocket.
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        let connector = Arc::new(WebSocketConnector::new(config.endpoint.clone()));
        Self::with_connector(config, connector)
    }

    /// Create an empty cell with a custom transport.
    pub fn with_connector(
        config: MonitorConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            connector,
            monitor: OnceLock::new(),
        })
    }

    /// The shared monitor, constructing it on first call.
    ///
    /// Concurrent first calls construct exactly one monitor. Must be called
    /// from within a tokio runtime.
    pub fn get(&self) -> &HealthMonitor {
        self.monitor
            .get_or_init(|| HealthMonitor::spawn(&self.config, self.connector.clone()))
    }

    /// The shared monitor with a connection attempt in flight or open.
    pub fn get_started(&self) -> &HealthMonitor {
        let monitor = self.get();
        monitor.ensure_started();
        monitor
    }

    /// The monitor if it has been constructed.
    pub fn try_get(&self) -> Option<&HealthMonitor> {
        self.monitor.get()
    }

    /// Shut the monitor down if it was ever constructed.
    pub async fn shutdown(&self) {
        if let Some(monitor) = self.monitor.get() {
            monitor.shutdown().await;
        }
    }
}
