//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond width
//! and a `Z` suffix, so lexical order in SQL matches chronological order.
//! Known episodes are stored as a compact JSON array.

use chrono::{DateTime, SecondsFormat, Utc};
use podwatch_core::{
  episode::KnownEpisodes,
  show::{ShowId, ShowInfo, SubscriberId, TrackedShow},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `tracked_shows` row.
pub struct RawShow {
  pub show_id:        String,
  pub name:           String,
  pub publisher:      String,
  pub external_url:   Option<String>,
  pub known_episodes: String,
  pub last_check:     Option<String>,
  pub created_at:     String,
}

/// Column list matching [`RawShow::from_row`].
pub const SHOW_COLUMNS: &str =
  "show_id, name, publisher, external_url, known_episodes, last_check, created_at";

impl RawShow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      show_id:        row.get(0)?,
      name:           row.get(1)?,
      publisher:      row.get(2)?,
      external_url:   row.get(3)?,
      known_episodes: row.get(4)?,
      last_check:     row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_show(self, subscribers: Vec<String>) -> Result<TrackedShow> {
    Ok(TrackedShow {
      info:        ShowInfo {
        show_id:      ShowId(self.show_id),
        name:         self.name,
        publisher:    self.publisher,
        external_url: self.external_url,
      },
      known:       KnownEpisodes::from_json(&self.known_episodes)?,
      subscribers: subscribers.into_iter().map(SubscriberId).collect(),
      last_check:  self.last_check.as_deref().map(decode_dt).transpose()?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
