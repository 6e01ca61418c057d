use super::models::Config;
use reqwest::Url;
use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Poll interval must be positive")]
    ZeroInterval,

    #[error("Request timeout must be positive")]
    ZeroRequestTimeout,

    #[error("Upstream URL '{url}' is invalid: {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },

    #[error("Upstream URL scheme '{scheme}' is not supported, expected 'http' or 'https'")]
    UnsupportedScheme { scheme: String },

    #[error("Invalid header name '{name}'")]
    InvalidHeaderName { name: String },

    #[error("Invalid value for header '{name}'")]
    InvalidHeaderValue { name: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_schedule(config)?;
    validate_upstream_url(&config.upstream.url)?;
    validate_headers(config)?;
    Ok(())
}

fn validate_schedule(config: &Config) -> Result<(), ValidationError> {
    if config.poller.interval_secs == 0 {
        return Err(ValidationError::ZeroInterval);
    }

    if config.upstream.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroRequestTimeout);
    }

    // Allowed: overdue ticks are skipped while a fetch is in flight
    if config.upstream.request_timeout_secs > config.poller.interval_secs {
        tracing::warn!(
            timeout_secs = config.upstream.request_timeout_secs,
            interval_secs = config.poller.interval_secs,
            "Request timeout exceeds poll interval, slow fetches will skip ticks"
        );
    }

    Ok(())
}

fn validate_upstream_url(url: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUpstreamUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

fn validate_headers(config: &Config) -> Result<(), ValidationError> {
    for (name, value) in &config.upstream.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ValidationError::InvalidHeaderName { name: name.clone() })?;
        HeaderValue::from_str(value)
            .map_err(|_| ValidationError::InvalidHeaderValue { name: name.clone() })?;
    }
    Ok(())
}
