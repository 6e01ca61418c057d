use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "POLLPROXY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/pollproxy.toml";
const ENV_PREFIX: &str = "POLLPROXY";
const ENV_SEPARATOR: &str = "__";
const COOKIE_ENV_VAR: &str = "POLLPROXY_UPSTREAM_COOKIE";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // POLLPROXY__POLLER__INTERVAL_SECS -> poller.interval_secs
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let mut config: Config = builder.build()?.try_deserialize()?;
    load_secrets(&mut config);

    Ok(config)
}

/// The upstream session cookie expires; let the environment supply a fresh
/// one without editing the config file.
fn load_secrets(config: &mut Config) {
    if let Ok(cookie) = env::var(COOKIE_ENV_VAR) {
        if !cookie.is_empty() {
            config.upstream.headers.insert("cookie".to_string(), cookie);
        }
    }
}
