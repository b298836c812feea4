//! Outgoing messages and the `MessageSink` trait.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::show::SubscriberId;

/// A labelled link attached to a message (rendered as a button by chat sinks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLink {
  pub label: String,
  pub url:   String,
}

/// One message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
  pub recipient: SubscriberId,
  pub text:      String,
  pub links:     Vec<MessageLink>,
}

/// A message-send primitive. One call is one delivery attempt; there is no
/// contract beyond success or failure.
pub trait MessageSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send<'a>(
    &'a self,
    message: &'a OutgoingMessage,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
