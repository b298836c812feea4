//! Tracked shows: one record per upstream show, binding it to subscribers
//! and to the engine's checkpoint.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::episode::KnownEpisodes;

/// Provider-assigned, stable show identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(pub String);

impl ShowId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ShowId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ShowId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for ShowId {
  fn from(s: String) -> Self { Self(s) }
}

/// A chat or channel identifier understood by the messaging sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl SubscriberId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SubscriberId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for SubscriberId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for SubscriberId {
  fn from(s: String) -> Self { Self(s) }
}

/// Display metadata for a show. Refreshed opportunistically; never used for
/// diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowInfo {
  pub show_id:      ShowId,
  pub name:         String,
  pub publisher:    String,
  pub external_url: Option<String>,
}

/// A subscription record as loaded from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedShow {
  pub info:        ShowInfo,
  pub known:       KnownEpisodes,
  /// Unique subscriber endpoints.
  pub subscribers: Vec<SubscriberId>,
  /// `None` until the first successful reconciliation.
  pub last_check:  Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
}

impl TrackedShow {
  /// A freshly tracked show: no known episodes, never checked.
  pub fn new(info: ShowInfo, created_at: DateTime<Utc>) -> Self {
    Self {
      info,
      known: KnownEpisodes::new(),
      subscribers: Vec::new(),
      last_check: None,
      created_at,
    }
  }

  pub fn id(&self) -> &ShowId { &self.info.show_id }

  /// Whether the next reconciliation seeds the checkpoint instead of
  /// notifying.
  pub fn is_bootstrap(&self) -> bool { self.known.is_empty() }
}
