//! Fetch counters exposed through the health endpoint

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::fetch::FailureKind;

/// Metrics handle for the poller and fetcher
#[derive(Debug, Default)]
pub struct FetchMetrics {
    attempts: AtomicU64,
    successes: AtomicU64,
    transport_failures: AtomicU64,
    timeouts: AtomicU64,
    decompression_failures: AtomicU64,
    parse_failures: AtomicU64,
    skipped_ticks: AtomicU64,
    stale_discarded: AtomicU64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_started(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "attempts", "Metric incremented");
    }

    pub fn fetch_succeeded(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "successes", "Metric incremented");
    }

    pub fn fetch_failed(&self, kind: FailureKind) {
        let counter = match kind {
            FailureKind::Transport => &self.transport_failures,
            FailureKind::Timeout => &self.timeouts,
            FailureKind::Decompression => &self.decompression_failures,
            FailureKind::Parse => &self.parse_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "failures", kind = %kind, "Metric incremented");
    }

    pub fn ticks_skipped(&self, count: u64) {
        if count > 0 {
            self.skipped_ticks.fetch_add(count, Ordering::Relaxed);
            tracing::debug!(counter = "skipped_ticks", count, "Metric incremented");
        }
    }

    pub fn stale_discarded(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let failures = FailureCounts {
            transport: self.transport_failures.load(Ordering::Relaxed),
            timeout: self.timeouts.load(Ordering::Relaxed),
            decompression: self.decompression_failures.load(Ordering::Relaxed),
            parse: self.parse_failures.load(Ordering::Relaxed),
        };

        MetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures,
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: FailureCounts,
    pub skipped_ticks: u64,
    pub stale_discarded: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub transport: u64,
    pub timeout: u64,
    pub decompression: u64,
    pub parse: u64,
}
