//! Configuration management for pollproxy
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use pollproxy::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `POLLPROXY__<section>__<key>`
//!
//! Examples:
//! - `POLLPROXY__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `POLLPROXY__POLLER__INTERVAL_SECS=30`
//! - `POLLPROXY__UPSTREAM__REQUEST_TIMEOUT_SECS=10`
//!
//! The upstream session cookie is read from `POLLPROXY_UPSTREAM_COOKIE` when set.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/pollproxy.toml`.
//! This can be overridden using the `POLLPROXY_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{CodecConfig, Config, PollerConfig, ServerConfig, UpstreamConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`POLLPROXY__*`)
    /// 2. TOML file (default: `config/pollproxy.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration built in code
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[poller]
interval_secs = 5
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.poller.interval_secs, 5);
        assert_eq!(config.upstream.request_timeout_secs, 30);
    }

    #[test]
    fn test_validation_catches_zero_interval() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[poller]
interval_secs = 0
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::ZeroInterval)
        ));
    }

    #[test]
    fn test_validation_catches_bad_scheme() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[upstream]
url = "file:///etc/passwd"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        assert!(matches!(
            Config::load_from_path(config_path).unwrap_err(),
            ConfigError::ValidationError(ValidationError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config: Config = toml::from_str(include_str!("../../config/pollproxy.toml"))
            .expect("Failed to parse shipped config");

        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.poller.interval_secs, 60);
        assert_eq!(config.upstream.request_timeout_secs, 30);
        assert_eq!(
            config.upstream.headers["accept-encoding"],
            "gzip, deflate, br, zstd"
        );
        assert!(config.upstream.headers.contains_key("cookie"));
    }
}
