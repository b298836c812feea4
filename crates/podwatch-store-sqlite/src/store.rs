//! [`SqliteStore`]: the SQLite implementation of [`SubscriptionStore`].

use std::path::Path;

use chrono::Utc;
use podwatch_core::{
  episode::{Episode, KnownEpisodes},
  show::{ShowId, ShowInfo, SubscriberId, TrackedShow},
  store::{CheckpointUpdate, DueQuery, SubscriptionStore},
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{RawShow, SHOW_COLUMNS, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A podwatch subscription store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All access
/// goes through one connection thread, which serialises updates per show.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn load_subscribers(
  conn: &rusqlite::Connection,
  show_id: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare_cached(
    "SELECT subscriber_id FROM subscribers
     WHERE show_id = ?1
     ORDER BY subscribed_at, subscriber_id",
  )?;
  stmt
    .query_map(rusqlite::params![show_id], |row| row.get(0))?
    .collect()
}

fn other(e: podwatch_core::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── SubscriptionStore impl ──────────────────────────────────────────────────

impl SubscriptionStore for SqliteStore {
  type Error = Error;

  async fn find_due(&self, query: DueQuery) -> Result<Vec<TrackedShow>> {
    let due_before = encode_dt(query.due_before);
    let limit      = i64::try_from(query.limit).unwrap_or(i64::MAX);

    let raws: Vec<(RawShow, Vec<String>)> = self
      .conn
      .call(move |conn| {
        // `last_check IS NOT NULL` sorts never-checked shows first.
        let sql = format!(
          "SELECT {SHOW_COLUMNS} FROM tracked_shows
           WHERE last_check IS NULL OR last_check < ?1
           ORDER BY last_check IS NOT NULL, last_check ASC, created_at ASC
           LIMIT ?2"
        );
        let shows = conn
          .prepare(&sql)?
          .query_map(rusqlite::params![due_before, limit], RawShow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(shows.len());
        for show in shows {
          let subscribers = load_subscribers(conn, &show.show_id)?;
          rows.push((show, subscribers));
        }
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, subscribers)| raw.into_show(subscribers))
      .collect()
  }

  async fn update(&self, show_id: &ShowId, update: CheckpointUpdate) -> Result<()> {
    let id_str         = show_id.as_str().to_owned();
    let last_check_str = encode_dt(update.last_check);
    let incoming: Vec<Episode> = update.known_episodes.into();
    let info           = update.info;

    // `None` → show missing; `Some(stale)` → committed, with `stale` set when
    // the stored checkpoint was already ahead of the incoming one.
    let committed: Option<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current: Option<(String, Option<String>)> = tx
          .query_row(
            "SELECT known_episodes, last_check FROM tracked_shows WHERE show_id = ?1",
            rusqlite::params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let Some((known_json, stored_check)) = current else {
          return Ok(None);
        };

        // Union, never replace: the stored set is the prefix of the result.
        let stored = KnownEpisodes::from_json(&known_json).map_err(other)?;
        let merged = stored.merge(incoming).to_json().map_err(other)?;

        let (last_check, stale) = match stored_check {
          Some(prev) if prev > last_check_str => (prev, true),
          _ => (last_check_str, false),
        };

        tx.execute(
          "UPDATE tracked_shows SET known_episodes = ?2, last_check = ?3
           WHERE show_id = ?1",
          rusqlite::params![id_str, merged, last_check],
        )?;

        if let Some(info) = info {
          tx.execute(
            "UPDATE tracked_shows SET name = ?2, publisher = ?3, external_url = ?4
             WHERE show_id = ?1",
            rusqlite::params![id_str, info.name, info.publisher, info.external_url],
          )?;
        }

        tx.commit()?;
        Ok(Some(stale))
      })
      .await?;

    match committed {
      None => Err(Error::ShowNotFound(show_id.to_string())),
      Some(true) => {
        tracing::warn!(show_id = %show_id, "stored checkpoint was newer; last_check kept");
        Ok(())
      }
      Some(false) => Ok(()),
    }
  }

  async fn get(&self, show_id: &ShowId) -> Result<Option<TrackedShow>> {
    let id_str = show_id.as_str().to_owned();

    let raw: Option<(RawShow, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {SHOW_COLUMNS} FROM tracked_shows WHERE show_id = ?1");
        let show = conn
          .query_row(&sql, rusqlite::params![id_str], RawShow::from_row)
          .optional()?;
        match show {
          Some(show) => {
            let subscribers = load_subscribers(conn, &show.show_id)?;
            Ok(Some((show, subscribers)))
          }
          None => Ok(None),
        }
      })
      .await?;

    raw
      .map(|(raw, subscribers)| raw.into_show(subscribers))
      .transpose()
  }

  async fn track(&self, info: ShowInfo, subscriber: SubscriberId) -> Result<bool> {
    let now_str = encode_dt(Utc::now());

    let inserted: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO tracked_shows (show_id, name, publisher, external_url, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(show_id) DO UPDATE SET
             name         = excluded.name,
             publisher    = excluded.publisher,
             external_url = excluded.external_url",
          rusqlite::params![
            info.show_id.as_str(),
            info.name,
            info.publisher,
            info.external_url,
            now_str,
          ],
        )?;
        let inserted = tx.execute(
          "INSERT OR IGNORE INTO subscribers (show_id, subscriber_id, subscribed_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![info.show_id.as_str(), subscriber.as_str(), now_str],
        )?;
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    Ok(inserted > 0)
  }
}
