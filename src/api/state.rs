use std::sync::Arc;
use std::time::Instant;

use crate::cache::ResultCache;
use crate::codec::CodecRegistry;
use crate::observability::FetchMetrics;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ResultCache>,
    pub codecs: CodecRegistry,
    pub metrics: Arc<FetchMetrics>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        cache: Arc<ResultCache>,
        codecs: CodecRegistry,
        metrics: Arc<FetchMetrics>,
    ) -> Self {
        Self {
            cache,
            codecs,
            metrics,
            started_at: Instant::now(),
        }
    }
}
