use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure classes a fetch attempt can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Timeout,
    Decompression,
    Parse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::Decompression => "decompression",
            FailureKind::Parse => "parse",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Transport(String),

    #[error("Request timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Decompression error ({encoding}, {bytes} bytes received): {reason}")]
    Decompression {
        encoding: String,
        bytes: usize,
        reason: String,
    },

    #[error("JSON parse error (HTTP {status}): {reason}; raw response: {preview:?}")]
    Parse {
        status: u16,
        reason: String,
        preview: String,
    },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) => FailureKind::Transport,
            FetchError::Timeout(_) => FailureKind::Timeout,
            FetchError::Decompression { .. } => FailureKind::Decompression,
            FetchError::Parse { .. } => FailureKind::Parse,
        }
    }
}

/// Result of one fetch attempt. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success {
        payload: Arc<Value>,
        fetched_at: DateTime<Utc>,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl FetchOutcome {
    pub fn success(payload: Value) -> Self {
        FetchOutcome::Success {
            payload: Arc::new(payload),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<FetchError> for FetchOutcome {
    fn from(err: FetchError) -> Self {
        FetchOutcome::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_maps_to_kind() {
        let outcome: FetchOutcome = FetchError::Timeout(Duration::from_secs(30)).into();
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));

        match outcome {
            FetchOutcome::Failure { message, .. } => {
                assert_eq!(message, "Request timeout after 30000ms")
            }
            _ => panic!("Expected failure"),
        }
    }

    #[test]
    fn test_decompression_message_names_encoding_and_size() {
        let err = FetchError::Decompression {
            encoding: "zstd".to_string(),
            bytes: 512,
            reason: "zstd codec unavailable".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("zstd"));
        assert!(message.contains("512 bytes"));
    }

    #[test]
    fn test_success_is_not_failure() {
        let outcome = FetchOutcome::success(serde_json::json!({"price": 1.23}));
        assert!(outcome.is_success());
        assert_eq!(outcome.failure_kind(), None);
    }
}
