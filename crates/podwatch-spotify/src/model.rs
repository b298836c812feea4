//! Spotify Web API wire types and their conversion into core types.

use std::time::Duration;

use podwatch_core::{
  episode::{DatePrecision, Episode, ReleaseDate},
  show::{ShowId, ShowInfo},
};
use serde::Deserialize;

use crate::token::AccessToken;

/// `POST /api/token` response body.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  /// Lifetime in seconds.
  pub expires_in:   u64,
}

impl TokenResponse {
  pub fn into_token(self) -> AccessToken {
    AccessToken::new(self.access_token, Duration::from_secs(self.expires_in))
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExternalUrls {
  pub spotify: Option<String>,
}

/// `GET /shows/{id}` response body, minus the embedded episode page.
#[derive(Debug, Deserialize)]
pub struct ShowObject {
  pub id:            String,
  pub name:          String,
  #[serde(default)]
  pub publisher:     String,
  #[serde(default)]
  pub external_urls: ExternalUrls,
}

impl From<ShowObject> for ShowInfo {
  fn from(show: ShowObject) -> Self {
    ShowInfo {
      show_id:      ShowId(show.id),
      name:         show.name,
      publisher:    show.publisher,
      external_url: show.external_urls.spotify,
    }
  }
}

/// `GET /shows/{id}/episodes` response body.
///
/// Spotify occasionally returns `null` entries for episodes that are not
/// available in the requested market.
#[derive(Debug, Deserialize)]
pub struct EpisodePage {
  pub items: Vec<Option<EpisodeObject>>,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeObject {
  pub id:                     String,
  pub name:                   String,
  pub release_date:           String,
  pub release_date_precision: Option<String>,
  #[serde(default)]
  pub external_urls:          ExternalUrls,
  pub duration_ms:            Option<u64>,
}

impl EpisodeObject {
  pub fn into_episode(self) -> podwatch_core::Result<Episode> {
    let precision = self
      .release_date_precision
      .as_deref()
      .map(|p| {
        p.parse::<DatePrecision>()
          .map_err(|_| podwatch_core::Error::UnknownPrecision(p.to_owned()))
      })
      .transpose()?;

    Ok(Episode {
      id:           self.id.into(),
      title:        self.name,
      release_date: ReleaseDate::parse(&self.release_date, precision)?,
      external_url: self.external_urls.spotify,
      duration_ms:  self.duration_ms,
    })
  }
}
