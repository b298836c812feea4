//! Error type for `podwatch-spotify`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// HTTP 429. `retry_after` comes from the `Retry-After` header when sent.
  #[error("rate limited (retry after {retry_after:?})")]
  RateLimited { retry_after: Option<Duration> },

  /// The token endpoint refused our client credentials.
  #[error("credential exchange failed: {0}")]
  Credentials(String),

  /// The API rejected the bearer token.
  #[error("unauthorized")]
  Unauthorized,

  #[error("show not found: {0}")]
  NotFound(String),

  #[error("unexpected status {status} from {endpoint}")]
  Status { status: u16, endpoint: String },

  #[error("failed to decode {endpoint}: {source}")]
  Decode {
    endpoint: String,
    #[source]
    source:   serde_json::Error,
  },
}

impl Error {
  /// Whether the failure is about our credentials rather than the request.
  pub fn is_credential_failure(&self) -> bool {
    matches!(self, Self::Credentials(_) | Self::Unauthorized)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
