//! Episodes and the append-only set of episodes a tracked show already knows.
//!
//! An episode's identity is its provider-assigned id and nothing else. Titles,
//! links and even release dates may change upstream between two polls; none
//! of that makes an episode "new". For that reason [`Episode`] deliberately
//! does not implement `PartialEq`: comparisons go through [`EpisodeId`].

use std::{
  collections::HashSet,
  fmt,
  str::FromStr,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Provider-assigned, stable episode identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(pub String);

impl EpisodeId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for EpisodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for EpisodeId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for EpisodeId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Release date ────────────────────────────────────────────────────────────

/// How much of a release date the provider actually knows.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatePrecision {
  Year,
  Month,
  Day,
}

/// A provider-supplied release date. Used for ordering only, never identity.
///
/// Coarse dates are anchored at the first day of their period, so `2021-03`
/// orders as `2021-03-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDate {
  pub date:      NaiveDate,
  pub precision: DatePrecision,
}

impl ReleaseDate {
  /// A day-precision release date.
  pub fn day(date: NaiveDate) -> Self {
    Self { date, precision: DatePrecision::Day }
  }

  /// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
  ///
  /// When `precision` is `None` it is inferred from the shape of `raw`.
  pub fn parse(raw: &str, precision: Option<DatePrecision>) -> Result<Self> {
    let raw = raw.trim();
    let invalid = || Error::InvalidReleaseDate(raw.to_owned());

    let precision = precision.unwrap_or(match raw.matches('-').count() {
      0 => DatePrecision::Year,
      1 => DatePrecision::Month,
      _ => DatePrecision::Day,
    });

    let mut parts = raw.splitn(3, '-');
    let mut next = || -> Result<u32> {
      parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)
    };

    let year = next()?;
    let month = match precision {
      DatePrecision::Year => 1,
      _ => next()?,
    };
    let day = match precision {
      DatePrecision::Day => next()?,
      _ => 1,
    };

    let year = i32::try_from(year).map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    Ok(Self { date, precision })
  }
}

impl fmt::Display for ReleaseDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.precision {
      DatePrecision::Year => write!(f, "{}", self.date.format("%Y")),
      DatePrecision::Month => write!(f, "{}", self.date.format("%Y-%m")),
      DatePrecision::Day => write!(f, "{}", self.date.format("%Y-%m-%d")),
    }
  }
}

impl FromStr for ReleaseDate {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s, None) }
}

// ─── Episode ─────────────────────────────────────────────────────────────────

/// One episode of a show, as last reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
  pub id:           EpisodeId,
  pub title:        String,
  pub release_date: ReleaseDate,
  /// Link to the episode on the provider's site.
  pub external_url: Option<String>,
  #[serde(default)]
  pub duration_ms:  Option<u64>,
}

// ─── Known episodes ──────────────────────────────────────────────────────────

/// The ordered, id-unique set of episodes a tracked show has already seen.
///
/// Values are never edited in place: [`KnownEpisodes::merge`] returns a new
/// version containing every existing episode followed by the unseen ones, so
/// the set can only grow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Episode>", into = "Vec<Episode>")]
pub struct KnownEpisodes {
  episodes: Vec<Episode>,
  ids:      HashSet<EpisodeId>,
}

impl KnownEpisodes {
  pub fn new() -> Self { Self::default() }

  /// Build a set from `episodes`, keeping the first occurrence of each id.
  pub fn from_episodes(episodes: impl IntoIterator<Item = Episode>) -> Self {
    Self::new().merge(episodes)
  }

  /// Return a new version with every episode of `incoming` whose id is not
  /// yet known appended, in the order given.
  pub fn merge(&self, incoming: impl IntoIterator<Item = Episode>) -> Self {
    let mut next = self.clone();
    for episode in incoming {
      if next.ids.insert(episode.id.clone()) {
        next.episodes.push(episode);
      }
    }
    next
  }

  pub fn contains(&self, id: &EpisodeId) -> bool { self.ids.contains(id) }

  pub fn ids(&self) -> &HashSet<EpisodeId> { &self.ids }

  pub fn len(&self) -> usize { self.episodes.len() }

  pub fn is_empty(&self) -> bool { self.episodes.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &Episode> { self.episodes.iter() }

  /// The most recently released known episode.
  pub fn latest(&self) -> Option<&Episode> {
    // `max_by_key` keeps the last maximum; later-appended wins on ties.
    self.episodes.iter().max_by_key(|e| e.release_date.date)
  }

  /// Serialise as a JSON array, the form stored by document-style backends.
  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(&self.episodes)?) }

  pub fn from_json(s: &str) -> Result<Self> {
    let episodes: Vec<Episode> = serde_json::from_str(s)?;
    Ok(Self::from_episodes(episodes))
  }
}

impl From<Vec<Episode>> for KnownEpisodes {
  fn from(episodes: Vec<Episode>) -> Self { Self::from_episodes(episodes) }
}

impl From<KnownEpisodes> for Vec<Episode> {
  fn from(known: KnownEpisodes) -> Self { known.episodes }
}
