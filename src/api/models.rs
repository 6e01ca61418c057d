//! Response bodies served to local callers.
//!
//! `GET /data` returns the cache's [`CurrentView`](crate::cache::CurrentView)
//! as-is:
//!
//! ```json
//! {
//!   "data": { "price": 1.23 },
//!   "lastFetchTime": "2026-10-19T12:00:00.123456Z",
//!   "error": null,
//!   "status": "success"
//! }
//! ```
//!
//! `status` is `success` once any payload has been received, `error` when the
//! latest attempt failed and nothing was ever received, and `no_data` before
//! the first attempt completes. `data` keeps the last good payload while
//! `error` reports a later failure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::codec::CodecStatus;
use crate::fetch::FailureKind;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since the process started
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub codecs: CodecStatus,
    pub fetches: MetricsSnapshot,
    /// Failure class of the latest attempt, `null` after a success
    pub last_failure: Option<FailureKind>,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}
