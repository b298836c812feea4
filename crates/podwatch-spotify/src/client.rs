//! Async HTTP client wrapping the Spotify Web API catalog endpoints.

use std::{fmt, sync::Arc, time::Duration};

use podwatch_core::{
  episode::Episode,
  provider::ContentProvider,
  show::{ShowId, ShowInfo},
};
use reqwest::{Client, Response, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;

use crate::{
  Error, Result,
  link::is_valid_id,
  model::{EpisodePage, ShowObject, TokenResponse},
  token::{AccessToken, TokenCache},
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Upper bound Spotify accepts for `limit` on episode listings.
pub const MAX_EPISODE_LIMIT: u32 = 50;

/// Connection settings for the Spotify Web API.
#[derive(Clone)]
pub struct SpotifyConfig {
  pub client_id:            String,
  pub client_secret:        String,
  pub api_base_url:         String,
  pub token_url:            String,
  /// ISO 3166-1 country code sent as `market` on catalog queries.
  pub market:               String,
  pub timeout:              Duration,
  /// Tokens expiring within this window are refreshed before use.
  pub token_refresh_margin: Duration,
}

impl SpotifyConfig {
  /// Production endpoints, `US` market, 30 s timeout, 5 min refresh margin.
  pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
    Self {
      client_id:            client_id.into(),
      client_secret:        client_secret.into(),
      api_base_url:         DEFAULT_API_BASE_URL.to_owned(),
      token_url:            DEFAULT_TOKEN_URL.to_owned(),
      market:               "US".to_owned(),
      timeout:              Duration::from_secs(30),
      token_refresh_margin: Duration::from_secs(300),
    }
  }
}

impl fmt::Debug for SpotifyConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SpotifyConfig")
      .field("client_id", &self.client_id)
      .field("client_secret", &"<redacted>")
      .field("api_base_url", &self.api_base_url)
      .field("token_url", &self.token_url)
      .field("market", &self.market)
      .field("timeout", &self.timeout)
      .field("token_refresh_margin", &self.token_refresh_margin)
      .finish()
  }
}

/// Async HTTP client for the Spotify catalog.
///
/// Cheap to clone; the inner [`reqwest::Client`] and the token cache are
/// `Arc`-based, so clones share one token.
#[derive(Clone)]
pub struct SpotifyClient {
  http:   Client,
  config: Arc<SpotifyConfig>,
  tokens: Arc<TokenCache>,
}

impl SpotifyClient {
  pub fn new(config: SpotifyConfig) -> Result<Self> {
    let http = Client::builder().timeout(config.timeout).build()?;
    Ok(Self {
      http,
      tokens: Arc::new(TokenCache::new(config.token_refresh_margin)),
      config: Arc::new(config),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
  }

  // ── Auth ──────────────────────────────────────────────────────────────────

  /// A bearer token valid for at least the refresh margin.
  pub async fn access_token(&self) -> Result<String> {
    self.tokens.get_or_refresh(|| self.request_token()).await
  }

  /// `POST <token_url>` with `grant_type=client_credentials`.
  async fn request_token(&self) -> Result<AccessToken> {
    let resp = self
      .http
      .post(&self.config.token_url)
      .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
      .form(&[("grant_type", "client_credentials")])
      .send()
      .await?;

    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
      return Err(rate_limited(&resp));
    }
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      tracing::error!(%status, "spotify access token error");
      return Err(Error::Credentials(format!("{status}: {body}")));
    }

    let token: TokenResponse = decode(resp, "token").await?;
    tracing::debug!(expires_in = token.expires_in, "refreshed spotify access token");
    Ok(token.into_token())
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T> {
    let token = self.access_token().await?;
    let resp = self
      .http
      .get(self.url(path))
      .bearer_auth(token)
      .query(query)
      .send()
      .await?;

    match resp.status() {
      s if s.is_success() => decode(resp, path).await,
      StatusCode::TOO_MANY_REQUESTS => Err(rate_limited(&resp)),
      StatusCode::UNAUTHORIZED => {
        // Re-authenticate on the next call instead of retrying here.
        self.tokens.invalidate().await;
        Err(Error::Unauthorized)
      }
      StatusCode::NOT_FOUND => Err(Error::NotFound(path.to_owned())),
      s => Err(Error::Status { status: s.as_u16(), endpoint: path.to_owned() }),
    }
  }

  /// `GET /shows/{id}?market=<market>`
  pub async fn fetch_show(&self, show_id: &ShowId) -> Result<ShowInfo> {
    let path = show_path(show_id, "")?;
    let show: ShowObject = self
      .get_json(&path, &[("market", self.config.market.clone())])
      .await?;
    Ok(show.into())
  }

  /// `GET /shows/{id}/episodes?market=<market>&limit=<limit>`
  ///
  /// Returns the newest `limit` episodes (clamped to
  /// [`MAX_EPISODE_LIMIT`]) in the order Spotify lists them. Unavailable
  /// entries and episodes with an unreadable release date are skipped.
  pub async fn fetch_episodes(&self, show_id: &ShowId, limit: u32) -> Result<Vec<Episode>> {
    let path = show_path(show_id, "/episodes")?;
    let limit = limit.clamp(1, MAX_EPISODE_LIMIT);
    let page: EpisodePage = self
      .get_json(
        &path,
        &[("market", self.config.market.clone()), ("limit", limit.to_string())],
      )
      .await?;

    let episodes = page
      .items
      .into_iter()
      .flatten()
      .filter_map(|raw| {
        let id = raw.id.clone();
        match raw.into_episode() {
          Ok(episode) => Some(episode),
          Err(e) => {
            tracing::warn!(show_id = %show_id, episode_id = %id, error = %e, "skipping episode");
            None
          }
        }
      })
      .collect();
    Ok(episodes)
  }
}

fn show_path(show_id: &ShowId, suffix: &str) -> Result<String> {
  if !is_valid_id(show_id.as_str()) {
    return Err(Error::NotFound(show_id.to_string()));
  }
  Ok(format!("/shows/{show_id}{suffix}"))
}

fn rate_limited(resp: &Response) -> Error {
  let retry_after = resp
    .headers()
    .get(RETRY_AFTER)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.trim().parse().ok())
    .map(Duration::from_secs);
  Error::RateLimited { retry_after }
}

async fn decode<T: DeserializeOwned>(resp: Response, endpoint: &str) -> Result<T> {
  let body = resp.bytes().await?;
  serde_json::from_slice(&body).map_err(|source| Error::Decode {
    endpoint: endpoint.to_owned(),
    source,
  })
}

// ─── ContentProvider impl ────────────────────────────────────────────────────

impl ContentProvider for SpotifyClient {
  type Error = Error;

  async fn show_episodes(&self, show_id: &ShowId, limit: u32) -> Result<Vec<Episode>> {
    self.fetch_episodes(show_id, limit).await
  }

  async fn show_info(&self, show_id: &ShowId) -> Result<ShowInfo> {
    self.fetch_show(show_id).await
  }

  fn is_credential_failure(error: &Error) -> bool { error.is_credential_failure() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{
    collections::HashMap,
    sync::{
      Mutex,
      atomic::{AtomicU16, AtomicUsize, Ordering},
    },
  };

  use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode as AxumStatus, header},
    response::{IntoResponse, Response as AxumResponse},
    routing::{get, post},
  };
  use serde_json::json;
  use tokio::net::TcpListener;

  /// base64("client:secret")
  const BASIC: &str = "Basic Y2xpZW50OnNlY3JldA==";

  #[derive(Default)]
  struct Mock {
    token_calls:   AtomicUsize,
    catalog_calls: AtomicUsize,
    /// 0 → succeed; otherwise the status to answer catalog calls with.
    catalog_fail:  AtomicU16,
    /// 0 → succeed; otherwise the status to answer token calls with.
    token_fail:    AtomicU16,
    last_query:    Mutex<HashMap<String, String>>,
  }

  async fn token(
    State(mock): State<Arc<Mock>>,
    headers: HeaderMap,
    body: String,
  ) -> AxumResponse {
    let n = mock.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let fail = mock.token_fail.load(Ordering::SeqCst);
    if fail != 0 {
      return (AxumStatus::from_u16(fail).unwrap(), "nope").into_response();
    }
    assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), BASIC);
    assert_eq!(body, "grant_type=client_credentials");
    // Give concurrent callers a chance to pile up behind the refresh.
    tokio::time::sleep(Duration::from_millis(20)).await;
    Json(json!({
      "access_token": format!("token-{n}"),
      "token_type": "Bearer",
      "expires_in": 3600
    }))
    .into_response()
  }

  fn catalog_gate(mock: &Mock, headers: &HeaderMap) -> Option<AxumResponse> {
    mock.catalog_calls.fetch_add(1, Ordering::SeqCst);
    assert!(
      headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer token-"))
    );
    match mock.catalog_fail.load(Ordering::SeqCst) {
      0 => None,
      429 => Some(
        (AxumStatus::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "7")], "slow down")
          .into_response(),
      ),
      s => Some(AxumStatus::from_u16(s).unwrap().into_response()),
    }
  }

  async fn show(
    State(mock): State<Arc<Mock>>,
    Path(id): Path<String>,
    headers: HeaderMap,
  ) -> AxumResponse {
    if let Some(r) = catalog_gate(&mock, &headers) { return r; }
    Json(json!({
      "id": id,
      "name": "Example Show",
      "publisher": "Example Media",
      "external_urls": { "spotify": format!("https://open.spotify.com/show/{id}") }
    }))
    .into_response()
  }

  async fn episodes(
    State(mock): State<Arc<Mock>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
  ) -> AxumResponse {
    if let Some(r) = catalog_gate(&mock, &headers) { return r; }
    *mock.last_query.lock().unwrap() = query;
    Json(json!({
      "items": [
        { "id": format!("{id}-3"), "name": "Third", "release_date": "2024-01-15",
          "release_date_precision": "day" },
        null,
        { "id": format!("{id}-bad"), "name": "Broken", "release_date": "someday" },
        { "id": format!("{id}-1"), "name": "First", "release_date": "2024-01-01",
          "release_date_precision": "day" }
      ],
      "next": null
    }))
    .into_response()
  }

  async fn spawn_mock() -> (Arc<Mock>, SpotifyClient) {
    let mock = Arc::new(Mock::default());
    let app = Router::new()
      .route("/api/token", post(token))
      .route("/v1/shows/{id}", get(show))
      .route("/v1/shows/{id}/episodes", get(episodes))
      .with_state(Arc::clone(&mock));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let mut config = SpotifyConfig::new("client", "secret");
    config.api_base_url = format!("http://{addr}/v1");
    config.token_url = format!("http://{addr}/api/token");
    (mock, SpotifyClient::new(config).unwrap())
  }

  #[tokio::test]
  async fn fetches_episodes_in_provider_order() {
    let (mock, client) = spawn_mock().await;

    let episodes = client.fetch_episodes(&"s1".into(), 200).await.unwrap();
    let ids: Vec<&str> = episodes.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["s1-3", "s1-1"]);

    let query = mock.last_query.lock().unwrap().clone();
    assert_eq!(query.get("market").map(String::as_str), Some("US"));
    assert_eq!(query.get("limit").map(String::as_str), Some("50"));
  }

  #[tokio::test]
  async fn fetches_show_info() {
    let (_mock, client) = spawn_mock().await;
    let info = client.fetch_show(&"s1".into()).await.unwrap();
    assert_eq!(info.name, "Example Show");
    assert_eq!(info.external_url.as_deref(), Some("https://open.spotify.com/show/s1"));
  }

  #[tokio::test]
  async fn token_is_reused_across_calls() {
    let (mock, client) = spawn_mock().await;
    client.fetch_episodes(&"s1".into(), 10).await.unwrap();
    client.fetch_show(&"s1".into()).await.unwrap();
    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mock.catalog_calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn concurrent_queries_refresh_once() {
    let (mock, client) = spawn_mock().await;
    let ids: Vec<ShowId> = (0..8).map(|i| ShowId(format!("show{i}"))).collect();

    let results = futures::future::join_all(
      ids.iter().map(|id| client.fetch_episodes(id, 5)),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn rate_limit_surfaces_retry_after() {
    let (mock, client) = spawn_mock().await;
    mock.catalog_fail.store(429, Ordering::SeqCst);

    let err = client.fetch_episodes(&"s1".into(), 10).await.unwrap_err();
    assert!(matches!(
      err,
      Error::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(7)
    ));
    assert!(!SpotifyClient::is_credential_failure(&err));

    // Rate limiting must not discard a good token.
    mock.catalog_fail.store(0, Ordering::SeqCst);
    client.fetch_episodes(&"s1".into(), 10).await.unwrap();
    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn unauthorized_invalidates_token() {
    let (mock, client) = spawn_mock().await;
    mock.catalog_fail.store(401, Ordering::SeqCst);

    let err = client.fetch_show(&"s1".into()).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
    assert!(SpotifyClient::is_credential_failure(&err));

    mock.catalog_fail.store(0, Ordering::SeqCst);
    client.fetch_show(&"s1".into()).await.unwrap();
    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn rejected_credentials() {
    let (mock, client) = spawn_mock().await;
    mock.token_fail.store(400, Ordering::SeqCst);

    let err = client.fetch_episodes(&"s1".into(), 10).await.unwrap_err();
    assert!(matches!(err, Error::Credentials(_)));
    assert!(err.is_credential_failure());
    assert_eq!(mock.catalog_calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn server_errors_map_to_status() {
    let (mock, client) = spawn_mock().await;
    mock.catalog_fail.store(503, Ordering::SeqCst);

    let err = client.fetch_episodes(&"s1".into(), 10).await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }));
  }

  #[tokio::test]
  async fn invalid_show_id_never_hits_the_network() {
    let (mock, client) = spawn_mock().await;
    let err = client.fetch_episodes(&"../me".into(), 10).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(mock.token_calls.load(Ordering::SeqCst), 0);
  }
}
