use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::http::{RawResponse, Transport};
use super::outcome::{FetchError, FetchOutcome};
use crate::cache::ResultCache;
use crate::codec::{CodecRegistry, ContentEncoding};
use crate::observability::FetchMetrics;

/// Characters of raw text kept in parse error messages
const PREVIEW_CHARS: usize = 200;

/// Runs fetch attempts against the upstream and records them in the cache
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    codecs: CodecRegistry,
    timeout: Duration,
    cache: Arc<ResultCache>,
    metrics: Arc<FetchMetrics>,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        codecs: CodecRegistry,
        timeout: Duration,
        cache: Arc<ResultCache>,
        metrics: Arc<FetchMetrics>,
    ) -> Self {
        Self {
            transport,
            codecs,
            timeout,
            cache,
            metrics,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Run one attempt and write its outcome into the cache.
    ///
    /// The outcome is returned as well, whether or not the cache accepted it.
    pub async fn run_attempt(&self) -> FetchOutcome {
        let ticket = self.cache.begin_attempt();
        self.metrics.attempt_started();

        let started = Instant::now();
        let outcome = self.fetch_once().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            FetchOutcome::Success { fetched_at, .. } => {
                self.metrics.fetch_succeeded();
                info!(attempt = ticket.id(), elapsed_ms, %fetched_at, "Data fetched successfully");
            }
            FetchOutcome::Failure { kind, message } => {
                self.metrics.fetch_failed(*kind);
                warn!(attempt = ticket.id(), elapsed_ms, kind = %kind, error = %message, "Fetch failed");
            }
        }

        if !self.cache.complete(ticket, outcome.clone()) {
            self.metrics.stale_discarded();
            warn!(attempt = ticket.id(), "Discarded outcome of a superseded attempt");
        }

        outcome
    }

    /// One request/response cycle, without touching the cache
    pub async fn fetch_once(&self) -> FetchOutcome {
        match self.fetch_payload().await {
            Ok(payload) => FetchOutcome::success(payload),
            Err(err) => err.into(),
        }
    }

    async fn fetch_payload(&self) -> Result<Value, FetchError> {
        // Dropping the transport future on expiry aborts the request, so a
        // timed-out attempt can never complete later.
        let response = match tokio::time::timeout(self.timeout, self.transport.get()).await {
            Err(_) => return Err(FetchError::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(FetchError::Transport(e.to_string())),
            Ok(Ok(response)) => response,
        };

        decode_response(&self.codecs, &response)
    }
}

/// Decompress and parse a collected upstream response
pub fn decode_response(codecs: &CodecRegistry, response: &RawResponse) -> Result<Value, FetchError> {
    let encoding = ContentEncoding::from_header(response.content_encoding.as_deref());
    if encoding.is_identity() && response.content_encoding.is_some() {
        debug!(
            declared = response.content_encoding.as_deref().unwrap_or_default(),
            "Unrecognized content encoding, treating body as uncompressed"
        );
    }

    let decoded = codecs
        .decode(encoding, &response.body)
        .map_err(|e| FetchError::Decompression {
            encoding: encoding.to_string(),
            bytes: response.body.len(),
            reason: e.to_string(),
        })?;

    let text = std::str::from_utf8(&decoded).map_err(|e| FetchError::Parse {
        status: response.status,
        reason: format!("body is not valid UTF-8: {}", e),
        preview: preview(&String::from_utf8_lossy(&decoded)),
    })?;

    serde_json::from_str(text).map_err(|e| FetchError::Parse {
        status: response.status,
        reason: e.to_string(),
        preview: preview(text),
    })
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
