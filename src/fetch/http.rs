//! HTTP transport for the upstream endpoint

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{CONTENT_ENCODING, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    #[error("Failed to read body: {0}")]
    BodyRead(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Undecoded upstream response with the body fully collected
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// `Content-Encoding` value as sent, if any
    pub content_encoding: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, content_encoding: Option<&str>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_encoding: content_encoding.map(str::to_owned),
            body: body.into(),
        }
    }
}

/// Performs one request/response cycle against the upstream.
///
/// Implementations must not decompress the body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self) -> Result<RawResponse>;
}

/// reqwest-backed transport with a fixed URL and header set
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let headers = build_headers(config)?;

        // reqwest is built without its decompression features, so the
        // Accept-Encoding header goes out verbatim and bodies arrive raw.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self) -> Result<RawResponse> {
        debug!(url = %self.url, "Requesting upstream");

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                url = %self.url,
                status = status.as_u16(),
                "Upstream returned non-success status"
            );
        }

        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::BodyRead(e.to_string()))?;

        debug!(
            url = %self.url,
            size = body.len(),
            encoding = content_encoding.as_deref().unwrap_or("none"),
            "Upstream body received"
        );

        Ok(RawResponse {
            status: status.as_u16(),
            content_encoding,
            body,
        })
    }
}

fn build_headers(config: &UpstreamConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(config.headers.len());

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| TransportError::InvalidHeader(name.as_str().to_string()))?;
        headers.insert(name, value);
    }

    Ok(headers)
}
