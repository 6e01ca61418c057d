//! In-memory result cache shared by the poller and the API
//!
//! The cache keeps the outcome of the most recent fetch attempt plus the last
//! payload that was fetched successfully. A failed attempt never discards the
//! last good payload: readers get the freshest known-good data along with the
//! latest error.
//!
//! State lives in a single immutable snapshot that is swapped atomically, so
//! readers never block on a writer and never see a half-applied update.
//!
//! Writers go through attempt tickets. [`ResultCache::begin_attempt`] hands out
//! monotonically increasing tickets and [`ResultCache::complete`] drops any
//! outcome whose ticket has been superseded by a newer attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::fetch::FetchOutcome;

/// Availability of cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// A payload has been received at least once
    Success,
    /// The latest attempt failed and nothing was ever received
    Error,
    /// No attempt has completed yet
    NoData,
}

/// What readers see
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentView {
    pub data: Option<Value>,
    pub last_fetch_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub status: CacheStatus,
}

/// Identifies one fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttemptTicket(u64);

impl AttemptTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct LastGood {
    payload: Arc<Value>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct CacheState {
    /// Ticket of the attempt that produced `latest` (0 = none)
    generation: u64,
    latest: Option<FetchOutcome>,
    last_success: Option<LastGood>,
}

impl CacheState {
    fn apply(&self, generation: u64, outcome: FetchOutcome) -> Self {
        let last_success = match &outcome {
            FetchOutcome::Success {
                payload,
                fetched_at,
            } => Some(LastGood {
                payload: Arc::clone(payload),
                fetched_at: *fetched_at,
            }),
            FetchOutcome::Failure { .. } => self.last_success.clone(),
        };

        Self {
            generation,
            latest: Some(outcome),
            last_success,
        }
    }

    fn view(&self) -> CurrentView {
        let error = match &self.latest {
            Some(FetchOutcome::Failure { message, .. }) => Some(message.clone()),
            _ => None,
        };

        let status = if self.last_success.is_some() {
            CacheStatus::Success
        } else if error.is_some() {
            CacheStatus::Error
        } else {
            CacheStatus::NoData
        };

        CurrentView {
            data: self.last_success.as_ref().map(|good| (*good.payload).clone()),
            last_fetch_time: self.last_success.as_ref().map(|good| good.fetched_at),
            error,
            status,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResultCache {
    state: ArcSwap<CacheState>,
    newest_attempt: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new attempt. Any older ticket that has not completed yet
    /// is superseded from this point on.
    pub fn begin_attempt(&self) -> AttemptTicket {
        AttemptTicket(self.newest_attempt.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Record the outcome of `ticket`'s attempt.
    ///
    /// Returns `false` (and leaves the cache untouched) when a newer attempt
    /// has started or already been recorded.
    pub fn complete(&self, ticket: AttemptTicket, outcome: FetchOutcome) -> bool {
        if ticket.0 < self.newest_attempt.load(Ordering::SeqCst) {
            return false;
        }

        let previous = self.state.rcu(|current| {
            if current.generation >= ticket.0 {
                Arc::clone(current)
            } else {
                Arc::new(current.apply(ticket.0, outcome.clone()))
            }
        });

        previous.generation < ticket.0
    }

    /// Record an outcome as a fresh attempt
    pub fn update(&self, outcome: FetchOutcome) {
        let ticket = self.begin_attempt();
        self.complete(ticket, outcome);
    }

    pub fn read(&self) -> CurrentView {
        self.state.load().view()
    }

    /// Outcome of the most recently recorded attempt
    pub fn latest_outcome(&self) -> Option<FetchOutcome> {
        self.state.load().latest.clone()
    }
}
