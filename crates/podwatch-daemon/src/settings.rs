//! On-disk / environment configuration for the `podwatch` binary.

use std::{path::PathBuf, time::Duration};

use anyhow::ensure;
use podwatch_engine::EngineConfig;
use podwatch_spotify::SpotifyConfig;
use podwatch_telegram::TelegramConfig;
use serde::Deserialize;

/// Top-level configuration, deserialised from `podwatch.toml` and
/// `PODWATCH_*` environment variables.
#[derive(Debug, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  pub spotify:    SpotifySettings,
  pub telegram:   TelegramSettings,
  #[serde(default)]
  pub engine:     EngineConfig,
}

#[derive(Deserialize)]
pub struct SpotifySettings {
  pub client_id:                 String,
  pub client_secret:             String,
  #[serde(default = "default_market")]
  pub market:                    String,
  #[serde(default = "default_spotify_api")]
  pub api_base_url:              String,
  #[serde(default = "default_token_url")]
  pub token_url:                 String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:              u64,
  #[serde(default = "default_refresh_margin_secs")]
  pub token_refresh_margin_secs: u64,
}

#[derive(Deserialize)]
pub struct TelegramSettings {
  pub bot_token:     String,
  /// Chat that receives operator alerts.
  #[serde(default)]
  pub admin_chat_id: Option<String>,
  #[serde(default = "default_telegram_api")]
  pub api_base_url:  String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:  u64,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/podwatch/podwatch.db") }
fn default_market() -> String { "US".to_owned() }
fn default_spotify_api() -> String { podwatch_spotify::DEFAULT_API_BASE_URL.to_owned() }
fn default_token_url() -> String { podwatch_spotify::DEFAULT_TOKEN_URL.to_owned() }
fn default_telegram_api() -> String { podwatch_telegram::DEFAULT_API_BASE_URL.to_owned() }
fn default_timeout_secs() -> u64 { 30 }
fn default_refresh_margin_secs() -> u64 { 300 }

impl Settings {
  /// Reject blank credentials that deserialised fine.
  pub fn validate(&self) -> anyhow::Result<()> {
    ensure!(!self.spotify.client_id.trim().is_empty(), "spotify.client_id is empty");
    ensure!(!self.spotify.client_secret.trim().is_empty(), "spotify.client_secret is empty");
    ensure!(!self.telegram.bot_token.trim().is_empty(), "telegram.bot_token is empty");
    Ok(())
  }
}

impl SpotifySettings {
  pub fn to_config(&self) -> SpotifyConfig {
    SpotifyConfig {
      api_base_url: self.api_base_url.clone(),
      token_url: self.token_url.clone(),
      market: self.market.clone(),
      timeout: Duration::from_secs(self.timeout_secs),
      token_refresh_margin: Duration::from_secs(self.token_refresh_margin_secs),
      ..SpotifyConfig::new(&self.client_id, &self.client_secret)
    }
  }
}

impl TelegramSettings {
  pub fn to_config(&self) -> TelegramConfig {
    TelegramConfig {
      api_base_url: self.api_base_url.clone(),
      timeout: Duration::from_secs(self.timeout_secs),
      ..TelegramConfig::new(&self.bot_token)
    }
  }
}

// Secrets stay out of debug output.
impl std::fmt::Debug for SpotifySettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SpotifySettings")
      .field("client_id", &self.client_id)
      .field("market", &self.market)
      .field("api_base_url", &self.api_base_url)
      .finish_non_exhaustive()
  }
}

impl std::fmt::Debug for TelegramSettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TelegramSettings")
      .field("admin_chat_id", &self.admin_chat_id)
      .field("api_base_url", &self.api_base_url)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> Result<Settings, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()?
      .try_deserialize()
  }

  #[test]
  fn minimal_file_uses_defaults() {
    let settings = parse(
      r#"
        [spotify]
        client_id = "id"
        client_secret = "secret"

        [telegram]
        bot_token = "123:abc"
      "#,
    )
    .unwrap();

    settings.validate().unwrap();
    assert_eq!(settings.spotify.market, "US");
    assert_eq!(settings.engine.batch_size, 50);
    assert_eq!(settings.engine.poll_interval_secs, 120);
    assert!(settings.telegram.admin_chat_id.is_none());

    let spotify = settings.spotify.to_config();
    assert_eq!(spotify.token_refresh_margin, Duration::from_secs(300));
    assert_eq!(spotify.client_secret, "secret");
  }

  #[test]
  fn engine_section_overrides_defaults() {
    let settings = parse(
      r#"
        store_path = "/var/lib/podwatch.db"
        [spotify]
        client_id = "id"
        client_secret = "secret"
        market = "DE"
        [telegram]
        bot_token = "123:abc"
        admin_chat_id = "-100"
        [engine]
        batch_size = 10
        concurrency = 2
      "#,
    )
    .unwrap();

    assert_eq!(settings.store_path, PathBuf::from("/var/lib/podwatch.db"));
    assert_eq!(settings.engine.batch_size, 10);
    assert_eq!(settings.engine.concurrency, 2);
    assert_eq!(settings.engine.retry_delay_secs, 300);
    assert_eq!(settings.spotify.to_config().market, "DE");
    assert_eq!(settings.telegram.admin_chat_id.as_deref(), Some("-100"));
  }

  #[test]
  fn missing_credentials_fail() {
    assert!(parse("[telegram]\nbot_token = \"x\"").is_err());

    let blank = parse(
      r#"
        [spotify]
        client_id = " "
        client_secret = "secret"
        [telegram]
        bot_token = "x"
      "#,
    )
    .unwrap();
    assert!(blank.validate().is_err());
  }

  #[test]
  fn debug_hides_secrets() {
    let settings = parse(
      r#"
        [spotify]
        client_id = "id"
        client_secret = "hunter2"
        [telegram]
        bot_token = "123:tok"
      "#,
    )
    .unwrap();
    let rendered = format!("{settings:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(!rendered.contains("123:tok"));
  }
}
