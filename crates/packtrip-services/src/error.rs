//! Error type and retry policy for external-service calls.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("service returned HTTP {status}: {body}")]
  Status { status: u16, body: String },

  #[error("invalid response: {0}")]
  InvalidResponse(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

/// Maximum number of attempts for transient failures.
pub(crate) const MAX_RETRIES: u32 = 3;

/// Initial backoff delay, doubled per retry.
pub(crate) const INITIAL_BACKOFF_MS: u64 = 1000;

/// Transient HTTP statuses worth retrying. Business-logic rejections
/// (4xx other than timeout/rate-limit) are not.
pub(crate) fn is_retryable_status(status: u16) -> bool {
  matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

pub(crate) fn backoff_delay(attempt: u32) -> Duration {
  Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt))
}
