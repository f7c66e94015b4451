//! Monitor configuration and duration parsing.

use std::time::Duration;

use crate::error::ConfigError;

/// Health endpoint of a recorder running on the same machine.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:3030/ws/health";

/// Delay between a failure and the next connection attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// How long a single connection attempt may take.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for a [`HealthMonitor`](crate::HealthMonitor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// WebSocket URL of the health feed.
    pub endpoint: String,
    /// Fixed delay before reconnecting after a failure.
    pub retry_interval: Duration,
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
}

impl MonitorConfig {
    /// Default settings pointed at a different endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Check the settings before a monitor is built from them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(ConfigError::Endpoint(self.endpoint.clone()));
        }
        if self.retry_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("retry interval"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("connect timeout"));
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
];

/// Parse duration strings like "2s", "1.5s", "500ms", "250us"
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str
                .trim()
                .parse()
                .map_err(|_| ConfigError::Duration(s.to_string()))?;
            if !val.is_finite() || val < 0.0 {
                return Err(ConfigError::Duration(s.to_string()));
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    Err(ConfigError::Duration(s.to_string()))
}

/// Format a duration for display
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        "0ns".to_string()
    } else if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        let d = parse_duration("1.5s").unwrap();
        assert!((d.as_secs_f64() - 1.5).abs() < 0.0001);
    }

    #[test]
    fn test_parse_milliseconds() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_microseconds() {
        assert_eq!(parse_duration("16µs").unwrap().as_nanos(), 16_000);
        assert_eq!(parse_duration("16us").unwrap().as_nanos(), 16_000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("two seconds").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0ns");
        assert_eq!(format_duration(Duration::from_millis(250)), "250.00ms");
        assert_eq!(format_duration(Duration::from_secs(2)), "2.00s");
    }

    #[test]
    fn default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.endpoint, "ws://127.0.0.1:3030/ws/health");
        assert_eq!(config.retry_interval, Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(MonitorConfig::with_endpoint("http://127.0.0.1:3030/health")
            .validate()
            .is_err());

        let config = MonitorConfig {
            retry_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDuration(_))));
    }
}
