//! Layered settings for the `healthwatch` binary.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, `HEALTHWATCH_*` environment variables, and
//! command-line flags.
//!
//! # Configuration
//!
//! ```toml
//! endpoint = "ws://127.0.0.1:3030/ws/health"
//! retry_interval = "2s"
//! connect_timeout = "5s"
//! expect_audio = true
//! expect_ui = false
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use healthwatch_client::{
    format_duration, parse_duration, MonitorConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT,
    DEFAULT_RETRY_INTERVAL,
};
use serde::Deserialize;

use crate::assessment::Expectations;

/// Prefix for environment overrides, e.g. `HEALTHWATCH_ENDPOINT`.
pub const ENV_PREFIX: &str = "HEALTHWATCH";

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub retry_interval: Option<String>,
    pub connect_timeout: Option<String>,
    pub expect_audio: Option<bool>,
    pub expect_ui: Option<bool>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub monitor: MonitorConfig,
    pub expectations: Expectations,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    endpoint: String,
    retry_interval: String,
    connect_timeout: String,
    expect_audio: bool,
    expect_ui: bool,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_env(file, Environment::with_prefix(ENV_PREFIX), overrides)
    }

    /// Resolve settings with an explicit environment source.
    pub fn load_with_env(
        file: Option<&Path>,
        env: Environment,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("retry_interval", format_duration(DEFAULT_RETRY_INTERVAL))?
            .set_default("connect_timeout", format_duration(DEFAULT_CONNECT_TIMEOUT))?
            .set_default("expect_audio", true)?
            .set_default("expect_ui", true)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(env)
            .set_override_option("endpoint", overrides.endpoint.clone())?
            .set_override_option("retry_interval", overrides.retry_interval.clone())?
            .set_override_option("connect_timeout", overrides.connect_timeout.clone())?
            .set_override_option("expect_audio", overrides.expect_audio)?
            .set_override_option("expect_ui", overrides.expect_ui)?
            .build()
            .context("Failed to read configuration")?;

        let raw: RawSettings = config
            .try_deserialize()
            .context("Invalid configuration")?;

        let monitor = MonitorConfig {
            endpoint: raw.endpoint,
            retry_interval: parse_duration(&raw.retry_interval)?,
            connect_timeout: parse_duration(&raw.connect_timeout)?,
        };
        monitor.validate()?;

        Ok(Self {
            monitor,
            expectations: Expectations {
                audio: raw.expect_audio,
                ui: raw.expect_ui,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use config::Map;
    use tempfile::NamedTempFile;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_env(None, env(&[]), &Overrides::default()).unwrap();

        assert_eq!(settings.monitor, MonitorConfig::default());
        assert_eq!(settings.expectations, Expectations::default());
    }

    #[test]
    fn test_file_values() {
        let file = toml_file(
            r#"
endpoint = "ws://10.0.0.5:3030/ws/health"
retry_interval = "500ms"
expect_ui = false
"#,
        );

        let settings =
            Settings::load_with_env(Some(file.path()), env(&[]), &Overrides::default()).unwrap();

        assert_eq!(settings.monitor.endpoint, "ws://10.0.0.5:3030/ws/health");
        assert_eq!(settings.monitor.retry_interval, Duration::from_millis(500));
        assert_eq!(settings.monitor.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(settings.expectations.audio);
        assert!(!settings.expectations.ui);
    }

    #[test]
    fn test_env_overrides_file_and_flags_override_env() {
        let file = toml_file(r#"endpoint = "ws://file:3030/ws/health""#);
        let vars = [
            ("HEALTHWATCH_ENDPOINT", "ws://env:3030/ws/health"),
            ("HEALTHWATCH_RETRY_INTERVAL", "3s"),
        ];

        let settings =
            Settings::load_with_env(Some(file.path()), env(&vars), &Overrides::default()).unwrap();
        assert_eq!(settings.monitor.endpoint, "ws://env:3030/ws/health");
        assert_eq!(settings.monitor.retry_interval, Duration::from_secs(3));

        let overrides = Overrides {
            endpoint: Some("ws://flag:3030/ws/health".into()),
            expect_audio: Some(false),
            ..Overrides::default()
        };
        let settings = Settings::load_with_env(Some(file.path()), env(&vars), &overrides).unwrap();
        assert_eq!(settings.monitor.endpoint, "ws://flag:3030/ws/health");
        assert_eq!(settings.monitor.retry_interval, Duration::from_secs(3));
        assert!(!settings.expectations.audio);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let overrides = Overrides {
            retry_interval: Some("soon".into()),
            ..Overrides::default()
        };
        assert!(Settings::load_with_env(None, env(&[]), &overrides).is_err());

        let overrides = Overrides {
            endpoint: Some("http://127.0.0.1:3030/health".into()),
            ..Overrides::default()
        };
        assert!(Settings::load_with_env(None, env(&[]), &overrides).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Settings::load_with_env(
            Some(Path::new("/nonexistent/healthwatch.toml")),
            env(&[]),
            &Overrides::default(),
        );
        assert!(result.is_err());
    }
}
