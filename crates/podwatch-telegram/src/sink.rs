//! [`TelegramSink`] delivers [`OutgoingMessage`]s through `sendMessage`.

use std::{fmt, sync::Arc, time::Duration};

use podwatch_core::notify::{MessageSink, OutgoingMessage};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Bot API connection settings.
#[derive(Clone)]
pub struct TelegramConfig {
  pub bot_token:    String,
  pub api_base_url: String,
  pub timeout:      Duration,
}

impl TelegramConfig {
  pub fn new(bot_token: impl Into<String>) -> Self {
    Self {
      bot_token:    bot_token.into(),
      api_base_url: DEFAULT_API_BASE_URL.to_owned(),
      timeout:      Duration::from_secs(30),
    }
  }
}

impl fmt::Debug for TelegramConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TelegramConfig")
      .field("bot_token", &"<redacted>")
      .field("api_base_url", &self.api_base_url)
      .field("timeout", &self.timeout)
      .finish()
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SendMessage<'a> {
  chat_id:      &'a str,
  text:         &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  reply_markup: Option<InlineKeyboard<'a>>,
}

#[derive(Serialize)]
struct InlineKeyboard<'a> {
  inline_keyboard: Vec<Vec<UrlButton<'a>>>,
}

#[derive(Serialize)]
struct UrlButton<'a> {
  text: &'a str,
  url:  &'a str,
}

impl<'a> From<&'a OutgoingMessage> for SendMessage<'a> {
  fn from(message: &'a OutgoingMessage) -> Self {
    let buttons: Vec<UrlButton<'a>> = message
      .links
      .iter()
      .map(|l| UrlButton { text: &l.label, url: &l.url })
      .collect();
    Self {
      chat_id:      message.recipient.as_str(),
      text:         &message.text,
      reply_markup: (!buttons.is_empty())
        .then(|| InlineKeyboard { inline_keyboard: vec![buttons] }),
    }
  }
}

/// The envelope every Bot API method answers with.
#[derive(Deserialize)]
struct ApiReply {
  ok:          bool,
  description: Option<String>,
  error_code:  Option<u16>,
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Sends messages as a Telegram bot.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct TelegramSink {
  http:   Client,
  config: Arc<TelegramConfig>,
}

impl TelegramSink {
  pub fn new(config: TelegramConfig) -> Result<Self> {
    let http = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { http, config: Arc::new(config) })
  }

  fn endpoint(&self, method: &str) -> String {
    format!(
      "{}/bot{}/{method}",
      self.config.api_base_url.trim_end_matches('/'),
      self.config.bot_token
    )
  }

  /// `POST /bot<token>/sendMessage`
  pub async fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
    let resp = self
      .http
      .post(self.endpoint("sendMessage"))
      .json(&SendMessage::from(message))
      .send()
      .await?;

    let status = resp.status();
    let body = resp.bytes().await?;
    let reply: ApiReply = serde_json::from_slice(&body)?;
    if reply.ok {
      tracing::debug!(chat_id = %message.recipient, "telegram message sent");
      return Ok(());
    }

    let code = reply.error_code.unwrap_or(status.as_u16());
    let description = reply.description.unwrap_or_default();
    tracing::debug!(chat_id = %message.recipient, code, %description, "sendMessage failed");
    // 403: blocked / kicked. 400 "chat not found": the chat is gone.
    if code == 403 || (code == 400 && description.contains("chat not found")) {
      return Err(Error::Unreachable(description));
    }
    Err(Error::Rejected { code, description })
  }
}

impl MessageSink for TelegramSink {
  type Error = Error;

  async fn send(&self, message: &OutgoingMessage) -> Result<()> {
    self.send_message(message).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;

  use axum::{Json, Router, extract::State, routing::post};
  use podwatch_core::notify::MessageLink;
  use serde_json::{Value, json};
  use tokio::net::TcpListener;

  #[derive(Default)]
  struct Mock {
    received: Mutex<Vec<Value>>,
  }

  async fn send_message(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Json<Value> {
    mock.received.lock().unwrap().push(body.clone());
    match body["chat_id"].as_str() {
      Some("blocked") => Json(json!({
        "ok": false,
        "error_code": 403,
        "description": "Forbidden: bot was blocked by the user"
      })),
      Some("gone") => Json(json!({
        "ok": false,
        "error_code": 400,
        "description": "Bad Request: chat not found"
      })),
      Some("flood") => Json(json!({
        "ok": false,
        "error_code": 429,
        "description": "Too Many Requests: retry after 3",
        "parameters": { "retry_after": 3 }
      })),
      _ => Json(json!({ "ok": true, "result": { "message_id": 1 } })),
    }
  }

  async fn spawn_mock() -> (Arc<Mock>, TelegramSink) {
    let mock = Arc::new(Mock::default());
    let app = Router::new()
      .route("/botTEST/sendMessage", post(send_message))
      .with_state(Arc::clone(&mock));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let mut config = TelegramConfig::new("TEST");
    config.api_base_url = format!("http://{addr}");
    (mock, TelegramSink::new(config).unwrap())
  }

  fn message(recipient: &str, links: Vec<MessageLink>) -> OutgoingMessage {
    OutgoingMessage {
      recipient: recipient.into(),
      text: "New episode available".into(),
      links,
    }
  }

  #[tokio::test]
  async fn sends_text_and_link_buttons() {
    let (mock, sink) = spawn_mock().await;
    let links = vec![
      MessageLink { label: "Podcast Page".into(), url: "https://example.com/show".into() },
      MessageLink { label: "Play Episode".into(), url: "https://example.com/ep".into() },
    ];

    sink.send(&message("42", links)).await.unwrap();

    let received = mock.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["chat_id"], "42");
    assert_eq!(received[0]["text"], "New episode available");
    let row = &received[0]["reply_markup"]["inline_keyboard"][0];
    assert_eq!(row[0]["text"], "Podcast Page");
    assert_eq!(row[1]["url"], "https://example.com/ep");
  }

  #[tokio::test]
  async fn omits_keyboard_without_links() {
    let (mock, sink) = spawn_mock().await;
    sink.send(&message("42", vec![])).await.unwrap();
    let received = mock.received.lock().unwrap();
    assert!(received[0].get("reply_markup").is_none());
  }

  #[tokio::test]
  async fn blocked_and_missing_chats_are_unreachable() {
    let (_mock, sink) = spawn_mock().await;
    let blocked = sink.send(&message("blocked", vec![])).await.unwrap_err();
    assert!(matches!(blocked, Error::Unreachable(d) if d.contains("blocked")));
    let gone = sink.send(&message("gone", vec![])).await.unwrap_err();
    assert!(matches!(gone, Error::Unreachable(_)));
  }

  #[tokio::test]
  async fn other_failures_are_rejections() {
    let (_mock, sink) = spawn_mock().await;
    let err = sink.send(&message("flood", vec![])).await.unwrap_err();
    assert!(matches!(err, Error::Rejected { code: 429, .. }));
  }

  #[test]
  fn debug_redacts_token() {
    let config = TelegramConfig::new("123:secret");
    assert!(!format!("{config:?}").contains("secret"));
  }
}
