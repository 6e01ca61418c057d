//! End-to-end tests against a local mock upstream
//!
//! These tests verify the complete flow:
//! 1. Mock upstream serves a (possibly compressed) body with a Content-Encoding header
//! 2. The real reqwest transport fetches it
//! 3. The fetcher decodes and parses it into the cache
//! 4. The API serves the cached view

use axum::{
    Router,
    body::Body,
    http::{Request, header},
    response::IntoResponse,
    routing::get,
};
use flate2::Compression;
use flate2::write::GzEncoder;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tower::ServiceExt;

use pollproxy::api::{router, state::AppState};
use pollproxy::cache::{CacheStatus, ResultCache};
use pollproxy::codec::CodecRegistry;
use pollproxy::config::UpstreamConfig;
use pollproxy::fetch::{FailureKind, Fetcher, HttpTransport};
use pollproxy::observability::FetchMetrics;
use pollproxy::poller::Poller;

/// Test context sharing one cache across fetchers pointed at different routes
struct E2EContext {
    mock_server_url: String,
    cache: Arc<ResultCache>,
    metrics: Arc<FetchMetrics>,
}

impl E2EContext {
    async fn setup() -> Self {
        let mock_server_url = start_mock_server()
            .await
            .expect("Failed to start mock server");

        Self {
            mock_server_url,
            cache: Arc::new(ResultCache::new()),
            metrics: Arc::new(FetchMetrics::new()),
        }
    }

    fn fetcher(&self, path: &str, codecs: CodecRegistry, timeout: Duration) -> Fetcher {
        let upstream = UpstreamConfig {
            url: format!("{}{}", self.mock_server_url, path),
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
            headers: BTreeMap::from([(
                "accept-encoding".to_string(),
                "gzip, deflate, br, zstd".to_string(),
            )]),
        };

        Fetcher::new(
            Arc::new(HttpTransport::new(&upstream).expect("Failed to build transport")),
            codecs,
            timeout,
            Arc::clone(&self.cache),
            Arc::clone(&self.metrics),
        )
    }
}

/// Start embedded mock upstream
async fn start_mock_server() -> Result<String, Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/gzip", get(serve_gzip))
        .route("/brotli", get(serve_brotli))
        .route("/plain", get(serve_plain))
        .route("/malformed", get(serve_malformed))
        .route("/corrupt", get(serve_corrupt_gzip))
        .route("/zstd", get(serve_zstd))
        .route("/slow", get(serve_slow))
        .route("/echo-encoding", get(echo_accept_encoding));

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    sleep(Duration::from_millis(50)).await;

    Ok(format!("http://{}", bound_addr))
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

async fn serve_gzip() -> impl IntoResponse {
    (
        [(header::CONTENT_ENCODING, "gzip")],
        gzip(br#"{"price": 1.23}"#),
    )
}

async fn serve_brotli() -> impl IntoResponse {
    let mut encoder = brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22);
    encoder.write_all(br#"{"price": 4.56}"#).unwrap();
    ([(header::CONTENT_ENCODING, "br")], encoder.into_inner())
}

async fn serve_plain() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], r#"{"price": 7.89}"#)
}

async fn serve_malformed() -> impl IntoResponse {
    "{\"price\": 1.2"
}

async fn serve_corrupt_gzip() -> impl IntoResponse {
    ([(header::CONTENT_ENCODING, "gzip")], "this is not gzip")
}

async fn serve_zstd() -> impl IntoResponse {
    // Content is irrelevant: without the codec it must never be parsed
    ([(header::CONTENT_ENCODING, "zstd")], vec![0x28u8, 0xb5, 0x2f, 0xfd, 0, 0])
}

async fn serve_slow() -> impl IntoResponse {
    sleep(Duration::from_secs(5)).await;
    "{}"
}

async fn echo_accept_encoding(headers: axum::http::HeaderMap) -> impl IntoResponse {
    let value = headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    axum::Json(json!({ "acceptEncoding": value }))
}

const TIMEOUT: Duration = Duration::from_secs(5);

/// Test: gzip body ends up in the served view
#[tokio::test]
async fn test_gzip_upstream_to_data_endpoint() {
    let ctx = E2EContext::setup().await;
    let fetcher = ctx.fetcher("/gzip", CodecRegistry::builtin_only(), TIMEOUT);

    assert!(fetcher.run_attempt().await.is_success());

    let app = router(AppState::new(
        Arc::clone(&ctx.cache),
        CodecRegistry::builtin_only(),
        Arc::clone(&ctx.metrics),
    ));
    let response = app
        .oneshot(Request::builder().uri("/data").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["data"], json!({"price": 1.23}));
    assert_eq!(body["error"], Value::Null);
    assert_eq!(body["status"], "success");
}

/// Test: brotli and uncompressed bodies
#[tokio::test]
async fn test_brotli_and_plain_upstreams() {
    let ctx = E2EContext::setup().await;

    ctx.fetcher("/brotli", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;
    assert_eq!(ctx.cache.read().data, Some(json!({"price": 4.56})));

    ctx.fetcher("/plain", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;
    assert_eq!(ctx.cache.read().data, Some(json!({"price": 7.89})));
}

/// Test: the configured Accept-Encoding goes out untouched
#[tokio::test]
async fn test_accept_encoding_sent_verbatim() {
    let ctx = E2EContext::setup().await;

    ctx.fetcher("/echo-encoding", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;

    assert_eq!(
        ctx.cache.read().data,
        Some(json!({"acceptEncoding": "gzip, deflate, br, zstd"}))
    );
}

/// Test: malformed JSON reports a parse error and keeps the prior payload
#[tokio::test]
async fn test_malformed_json_keeps_previous_data() {
    let ctx = E2EContext::setup().await;

    ctx.fetcher("/malformed", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;
    let view = ctx.cache.read();
    assert_eq!(view.status, CacheStatus::Error);
    assert!(view.error.unwrap().contains("parse"));

    ctx.fetcher("/gzip", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;
    let outcome = ctx
        .fetcher("/malformed", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Parse));

    let view = ctx.cache.read();
    assert_eq!(view.status, CacheStatus::Success);
    assert_eq!(view.data, Some(json!({"price": 1.23})));
    assert!(view.error.unwrap().contains("parse"));
}

/// Test: zstd without the codec is a decompression failure, not a parse attempt
#[tokio::test]
async fn test_zstd_without_codec_keeps_previous_data() {
    let ctx = E2EContext::setup().await;

    ctx.fetcher("/gzip", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;
    let outcome = ctx
        .fetcher("/zstd", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Decompression));
    let view = ctx.cache.read();
    assert_eq!(view.data, Some(json!({"price": 1.23})));
    let error = view.error.unwrap();
    assert!(error.contains("zstd"));
    assert!(error.contains("6 bytes"));
}

/// Test: corrupt gzip stream
#[tokio::test]
async fn test_corrupt_gzip_is_decompression_failure() {
    let ctx = E2EContext::setup().await;

    let outcome = ctx
        .fetcher("/corrupt", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Decompression));
    assert_eq!(ctx.metrics.snapshot().failures.decompression, 1);
}

/// Test: slow upstream times out
#[tokio::test]
async fn test_slow_upstream_times_out() {
    let ctx = E2EContext::setup().await;

    let outcome = ctx
        .fetcher("/slow", CodecRegistry::builtin_only(), Duration::from_millis(200))
        .run_attempt()
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));
    assert_eq!(ctx.cache.read().status, CacheStatus::Error);
}

/// Test: nothing listening on the upstream port
#[tokio::test]
async fn test_refused_connection_is_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ctx = E2EContext {
        mock_server_url: format!("http://{}", addr),
        cache: Arc::new(ResultCache::new()),
        metrics: Arc::new(FetchMetrics::new()),
    };

    let outcome = ctx
        .fetcher("/gzip", CodecRegistry::builtin_only(), TIMEOUT)
        .run_attempt()
        .await;

    assert_eq!(outcome.failure_kind(), Some(FailureKind::Transport));
}

/// Test: poller populates the cache right away
#[tokio::test]
async fn test_poller_fetches_on_start() {
    let ctx = E2EContext::setup().await;
    let fetcher = Arc::new(ctx.fetcher("/gzip", CodecRegistry::builtin_only(), TIMEOUT));
    let poller = Poller::new(fetcher, Duration::from_secs(60), Arc::clone(&ctx.metrics));

    poller.run(sleep(Duration::from_millis(500))).await;

    assert_eq!(ctx.metrics.snapshot().attempts, 1);
    assert_eq!(ctx.cache.read().data, Some(json!({"price": 1.23})));
}
