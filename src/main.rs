mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use pollproxy::cache::ResultCache;
use pollproxy::codec::CodecRegistry;
use pollproxy::config::Config;
use pollproxy::fetch::{FetchOutcome, Fetcher, HttpTransport};
use pollproxy::observability::FetchMetrics;
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let mut config = load_config(args.config)?;
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            pollproxy::api::run(config).await?
        }
        Commands::Fetch(args) => fetch_once(load_config(args.config)?).await?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config, AnyError> {
    let config = match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .map_err(|e| format!("Failed to load config: {}", e))?;

    Ok(config)
}

async fn fetch_once(config: Config) -> Result<(), AnyError> {
    let cache = Arc::new(ResultCache::new());
    let fetcher = Fetcher::new(
        Arc::new(HttpTransport::new(&config.upstream)?),
        CodecRegistry::probe(config.codecs.zstd),
        config.upstream.request_timeout(),
        Arc::clone(&cache),
        Arc::new(FetchMetrics::new()),
    );

    let outcome = fetcher.run_attempt().await;
    println!("{}", serde_json::to_string_pretty(&cache.read())?);

    check_outcome(&outcome)
}

/// Turn a failed attempt into an error so `fetch` exits non-zero
fn check_outcome(outcome: &FetchOutcome) -> Result<(), AnyError> {
    match outcome {
        FetchOutcome::Success { .. } => Ok(()),
        FetchOutcome::Failure { kind, message } => {
            Err(format!("Fetch failed ({}): {}", kind, message).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollproxy::fetch::FailureKind;

    #[test]
    fn test_failed_fetch_is_an_error() {
        let failure = FetchOutcome::Failure {
            kind: FailureKind::Timeout,
            message: "Request timeout after 30000ms".to_string(),
        };

        let err = check_outcome(&failure).unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_successful_fetch_is_ok() {
        let success = FetchOutcome::success(serde_json::json!({"price": 1.23}));
        assert!(check_outcome(&success).is_ok());
    }
}
