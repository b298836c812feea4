//! The `SubscriptionStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `podwatch-store-sqlite`).
//! The reconciliation engine depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  episode::KnownEpisodes,
  show::{ShowId, ShowInfo, SubscriberId, TrackedShow},
};

// ─── Query / update types ────────────────────────────────────────────────────

/// Parameters for [`SubscriptionStore::find_due`].
#[derive(Debug, Clone, Copy)]
pub struct DueQuery {
  /// Shows last checked strictly before this instant (or never) are due.
  pub due_before: DateTime<Utc>,
  pub limit:      usize,
}

/// A new checkpoint for one show, handed to [`SubscriptionStore::update`].
#[derive(Debug, Clone)]
pub struct CheckpointUpdate {
  /// The full next version of the known-episode set.
  pub known_episodes: KnownEpisodes,
  pub last_check:     DateTime<Utc>,
  /// Refreshed display metadata, if any was fetched.
  pub info:           Option<ShowInfo>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the persistence of tracked shows.
///
/// Backends must apply [`update`](Self::update) atomically per show and must
/// never shrink the known-episode set nor move `last_check` backwards, even
/// when handed an older checkpoint.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait SubscriptionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Shows never checked or checked before `query.due_before`, ordered by
  /// `last_check` ascending with never-checked shows first, at most
  /// `query.limit` of them.
  fn find_due(
    &self,
    query: DueQuery,
  ) -> impl Future<Output = Result<Vec<TrackedShow>, Self::Error>> + Send + '_;

  /// Commit a checkpoint for `show_id`.
  fn update<'a>(
    &'a self,
    show_id: &'a ShowId,
    update: CheckpointUpdate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Retrieve one show by id. Returns `None` if it is not tracked.
  fn get<'a>(
    &'a self,
    show_id: &'a ShowId,
  ) -> impl Future<Output = Result<Option<TrackedShow>, Self::Error>> + Send + 'a;

  /// Track `info` on behalf of `subscriber`, creating the show record if
  /// needed. Returns `false` if the subscriber was already subscribed.
  fn track(
    &self,
    info: ShowInfo,
    subscriber: SubscriberId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
