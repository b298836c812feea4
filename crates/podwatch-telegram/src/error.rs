//! Error type for `podwatch-telegram`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The recipient blocked the bot or the chat no longer exists.
  #[error("recipient unreachable: {0}")]
  Unreachable(String),

  #[error("telegram rejected the message ({code}): {description}")]
  Rejected { code: u16, description: String },

  #[error("malformed telegram response: {0}")]
  Decode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
