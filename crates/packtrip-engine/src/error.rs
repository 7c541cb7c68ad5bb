//! Error type for `packtrip-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("trip not found: {0}")]
  TripNotFound(String),

  #[error("no active option menu for trip {0}")]
  NoActiveOptions(String),

  #[error("option {0} is not in the active menu")]
  UnknownOption(String),

  #[error("no unanimously agreed option yet")]
  NoWinner,

  #[error("reset not confirmed: expected the trip id to be echoed back")]
  ResetNotConfirmed,
}

impl Error {
  /// Box a backend-specific store error into the engine's error type.
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
