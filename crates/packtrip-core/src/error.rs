//! Error types for `packtrip-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown trip state: {0:?}")]
  UnknownTripState(String),

  #[error("unknown message kind: {0:?}")]
  UnknownMessageKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
