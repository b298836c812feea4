//! Error types for `podwatch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid release date: {0:?}")]
  InvalidReleaseDate(String),

  #[error("unknown release date precision: {0:?}")]
  UnknownPrecision(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
