//! Periodic poll loop
//!
//! A single task drives every fetch: it runs one attempt immediately, then one
//! per interval. The attempt is awaited inside the loop, so two fetches never
//! overlap. When a fetch overruns the interval, the first overdue tick fires as
//! soon as it ends and any further deadlines that passed meanwhile are skipped,
//! not queued.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::fetch::Fetcher;
use crate::observability::FetchMetrics;

pub struct Poller {
    fetcher: Arc<Fetcher>,
    interval: Duration,
    metrics: Arc<FetchMetrics>,
}

impl Poller {
    pub fn new(fetcher: Arc<Fetcher>, interval: Duration, metrics: Arc<FetchMetrics>) -> Self {
        Self {
            fetcher,
            interval,
            metrics,
        }
    }

    /// Poll until `shutdown` resolves. An attempt in flight at shutdown is
    /// abandoned.
    pub async fn run<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(interval_secs = self.interval.as_secs_f64(), "Poller started");

        let mut previous: Option<Instant> = None;

        loop {
            let deadline = tokio::select! {
                _ = &mut shutdown => break,
                deadline = ticker.tick() => deadline,
            };

            // Consecutive deadlines are one interval apart unless some were elided
            if let Some(previous) = previous {
                self.metrics
                    .ticks_skipped(missed_ticks(deadline - previous, self.interval));
            }
            previous = Some(deadline);

            debug!("Fetching data");

            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.fetcher.run_attempt() => {}
            }
        }

        info!("Poller stopped");
    }
}

/// Deadlines elided between two ticks that fired `gap` apart on the schedule
fn missed_ticks(gap: Duration, interval: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    ((gap.as_nanos() / interval.as_nanos()) as u64).saturating_sub(1)
}
