//! Error type for `packtrip-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] packtrip_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("trip not found: {0}")]
  TripNotFound(String),

  #[error("trip id already taken: {0}")]
  TripIdTaken(String),

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("message not found: {0}")]
  MessageNotFound(i64),

  /// The forward-only phase rule; only `reset_trip` may go back.
  #[error("trip {trip_id} cannot move from {from} back to {to}")]
  BackwardTransition {
    trip_id: String,
    from:    String,
    to:      String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
