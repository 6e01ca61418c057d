use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::{
    services::{get_data, health, index, not_found},
    state::AppState,
};
use crate::cache::ResultCache;
use crate::codec::CodecRegistry;
use crate::config::Config;
use crate::fetch::{Fetcher, HttpTransport};
use crate::observability::FetchMetrics;
use crate::poller::Poller;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the public router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/data", get(get_data))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Start the poller and serve the API until a shutdown signal arrives
pub async fn run(config: Config) -> Result<(), AnyError> {
    let codecs = CodecRegistry::probe(config.codecs.zstd);
    let cache = Arc::new(ResultCache::new());
    let metrics = Arc::new(FetchMetrics::new());

    let transport = HttpTransport::new(&config.upstream)
        .map_err(|e| format!("Failed to build upstream client: {}", e))?;
    info!(url = %transport.url(), "Upstream configured");

    let fetcher = Arc::new(Fetcher::new(
        Arc::new(transport),
        codecs,
        config.upstream.request_timeout(),
        Arc::clone(&cache),
        Arc::clone(&metrics),
    ));
    let poller = Poller::new(fetcher, config.poller.interval(), Arc::clone(&metrics));

    let state = AppState::new(cache, codecs, metrics);
    let app = router(state);

    let address: SocketAddr = config.server.bind_addr;
    let listener = TcpListener::bind(address).await?;
    info!(%address, "pollproxy listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let poller_task = tokio::spawn(async move {
        poller
            .run(async {
                let _ = stop_rx.await;
            })
            .await;
    });

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = stop_tx.send(());
    if let Err(e) = poller_task.await {
        error!(error = %e, "Poller task failed");
    }

    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
