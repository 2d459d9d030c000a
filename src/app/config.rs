use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about = "Correlates access-log traffic with known infrastructure IPs", long_about = None)]
pub struct Config {
    /// Log group whose streams are harvested
    pub group_name: String,

    /// Only harvest streams whose name starts with this prefix
    pub stream_prefix: Option<String>,

    /// Base URL of the provider API
    #[arg(
        long,
        env = "PROVIDER_ENDPOINT",
        default_value = "http://localhost:9400/v1/"
    )]
    pub endpoint: String,

    /// Drain tick interval in milliseconds
    #[arg(long, env = "DRAIN_INTERVAL_MS", default_value = "1500")]
    pub drain_interval_ms: u64,

    /// Pagination steps executed per drain tick
    #[arg(long, env = "DRAIN_BATCH_SIZE", default_value = "5")]
    pub drain_batch_size: usize,

    /// Retained-line cap per stream
    #[arg(long, env = "LINE_CAP", default_value = "5000")]
    pub line_cap: usize,

    /// Paths reported per correlated IP
    #[arg(long, env = "TOP_PATHS", default_value = "10")]
    pub top_paths: usize,

    /// Deadline for a single page fetch, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "30")]
    pub fetch_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::parse_from(args);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid endpoint URL '{}': {}", self.endpoint, e))
        })?;

        if self.drain_batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Drain batch size must be greater than 0".to_string(),
            ));
        }
        if self.drain_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Drain interval must be greater than 0".to_string(),
            ));
        }
        if self.line_cap == 0 {
            return Err(ConfigError::InvalidConfig(
                "Line cap must be greater than 0".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Fetch timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_is_required() {
        let result = Config::try_parse_from(["traffic-correlator"]);
        assert!(result.is_err());
    }

    #[test]
    fn prefix_is_optional_and_defaults_apply() {
        let config = Config::from_args(["traffic-correlator", "svc-logs"]).unwrap();
        assert_eq!(config.group_name, "svc-logs");
        assert_eq!(config.stream_prefix, None);
        assert_eq!(config.drain_interval_ms, 1500);
        assert_eq!(config.drain_batch_size, 5);
        assert_eq!(config.line_cap, 5000);
        assert_eq!(config.top_paths, 10);
    }

    #[test]
    fn rejects_zero_batch_size() {
        let result = Config::from_args([
            "traffic-correlator",
            "svc-logs",
            "--drain-batch-size",
            "0",
        ]);
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_malformed_endpoint() {
        let result = Config::from_args([
            "traffic-correlator",
            "svc-logs",
            "--endpoint",
            "not a url",
        ]);
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }
}
