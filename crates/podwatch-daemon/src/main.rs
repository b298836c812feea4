//! podwatch daemon binary.
//!
//! Reads `podwatch.toml` (or the path given with `--config`) layered under
//! `PODWATCH_*` environment variables, opens the SQLite store, and polls
//! tracked shows for new episodes, announcing them over Telegram.
//!
//! ```text
//! PODWATCH_SPOTIFY__CLIENT_SECRET=... podwatch --config /etc/podwatch.toml
//! podwatch once
//! podwatch track https://open.spotify.com/show/<id> <chat-id>
//! ```

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use podwatch_core::{show::SubscriberId, store::SubscriptionStore as _};
use podwatch_engine::Scheduler;
use podwatch_spotify::{SpotifyClient, parse_show_ref};
use podwatch_store_sqlite::SqliteStore;
use podwatch_telegram::TelegramSink;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Parser)]
#[command(author, version, about = "Podcast new-episode notifier")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "podwatch.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Poll until interrupted (the default).
  Run,
  /// Run exactly one reconciliation cycle and exit.
  Once,
  /// Subscribe a chat to a show.
  Track {
    /// Show link, `spotify:show:` URI or bare id.
    show:       String,
    /// Chat id that will receive notifications.
    subscriber: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings: Settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("PODWATCH")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("invalid configuration (are the Spotify and Telegram credentials set?)")?;
  settings.validate()?;

  let store_path = expand_tilde(&settings.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let spotify =
    SpotifyClient::new(settings.spotify.to_config()).context("failed to build Spotify client")?;

  let command = cli.command.unwrap_or(Command::Run);
  if let Command::Track { show, subscriber } = &command {
    return track(&store, &spotify, show, subscriber.as_str().into()).await;
  }

  let sink = TelegramSink::new(settings.telegram.to_config())
    .context("failed to build Telegram client")?;
  let operator = settings.telegram.admin_chat_id.clone().map(SubscriberId::from);

  let scheduler = Scheduler::new(
    Arc::new(store),
    Arc::new(spotify),
    Arc::new(sink),
    settings.engine,
  )
  .with_operator(operator);

  match command {
    Command::Once => {
      let summary = scheduler.run_cycle().await.context("cycle failed")?;
      if summary.failed > 0 {
        tracing::warn!(failed = summary.failed, "some shows were skipped");
      }
    }
    _ => scheduler.run_until(shutdown_signal()).await,
  }

  Ok(())
}

/// Resolve a show reference and record the subscription.
async fn track(
  store: &SqliteStore,
  spotify: &SpotifyClient,
  show: &str,
  subscriber: SubscriberId,
) -> anyhow::Result<()> {
  let show_id = parse_show_ref(show)
    .with_context(|| format!("{show:?} is not a Spotify show link, URI or id"))?;
  let info = spotify
    .fetch_show(&show_id)
    .await
    .with_context(|| format!("failed to look up show {show_id}"))?;

  let name = info.name.clone();
  let added = store
    .track(info, subscriber.clone())
    .await
    .context("failed to record subscription")?;

  if added {
    tracing::info!(%show_id, %subscriber, "now tracking {name}");
  } else {
    tracing::info!(%show_id, %subscriber, "already tracking {name}");
  }
  Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "cannot listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
