//! Error type for `podwatch-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] podwatch_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to commit a checkpoint for a show that is not tracked.
  #[error("show not found: {0}")]
  ShowNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
