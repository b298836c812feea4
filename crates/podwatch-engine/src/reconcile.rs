//! Per-show reconciliation: fetch, diff, notify, commit.

use chrono::{DateTime, Utc};
use podwatch_core::{
  diff::{diff, sort_by_release},
  episode::KnownEpisodes,
  notify::MessageSink,
  provider::ContentProvider,
  show::{ShowId, ShowInfo, TrackedShow},
  store::{CheckpointUpdate, SubscriptionStore},
};
use tracing::Instrument;

use crate::{DeliveryRecord, ReconcileError, Scheduler};

/// What a successful reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
  /// First check: the snapshot was adopted without notifying anyone.
  Bootstrapped { adopted: usize },
  /// Nothing new; only `last_check` advanced.
  UpToDate,
  /// `count` new episodes were dispatched and committed.
  NewEpisodes { count: usize },
}

/// The result of reconciling one show within a cycle.
#[derive(Debug)]
pub struct ShowReport {
  pub show_id:    ShowId,
  /// Every delivery attempted for this show, in dispatch order.
  pub deliveries: Vec<DeliveryRecord>,
  pub result:     Result<ReconcileOutcome, ReconcileError>,
}

impl ShowReport {
  pub fn is_ok(&self) -> bool { self.result.is_ok() }

  pub fn notifications_sent(&self) -> usize {
    self.deliveries.iter().filter(|d| d.outcome.is_delivered()).count()
  }

  pub fn notifications_failed(&self) -> usize {
    self.deliveries.len() - self.notifications_sent()
  }
}

impl<St, P, K> Scheduler<St, P, K>
where
  St: SubscriptionStore,
  P: ContentProvider,
  K: MessageSink,
{
  /// Reconcile a single show against the provider as of `now`.
  ///
  /// Never fails: the outcome, or the reason the show was skipped, is in the
  /// returned report. If the fetch fails or comes back empty nothing is
  /// written and nobody is notified.
  pub async fn reconcile_one(&self, show: TrackedShow, now: DateTime<Utc>) -> ShowReport {
    let show_id = show.id().clone();
    let span = tracing::info_span!("reconcile", show_id = %show_id);

    let mut deliveries = Vec::new();
    let result = self
      .reconcile_inner(show, now, &mut deliveries)
      .instrument(span.clone())
      .await;

    span.in_scope(|| match &result {
      Ok(ReconcileOutcome::Bootstrapped { adopted }) => {
        tracing::info!(adopted, "bootstrapped known episodes");
      }
      Ok(ReconcileOutcome::UpToDate) => tracing::debug!("no new episodes"),
      Ok(ReconcileOutcome::NewEpisodes { count }) => {
        tracing::info!(
          count,
          delivered = deliveries.iter().filter(|d| d.outcome.is_delivered()).count(),
          attempted = deliveries.len(),
          "new episodes dispatched"
        );
      }
      Err(e) => tracing::warn!(error = %e, "show skipped this cycle"),
    });

    ShowReport { show_id, deliveries, result }
  }

  async fn reconcile_inner(
    &self,
    show: TrackedShow,
    now: DateTime<Utc>,
    deliveries: &mut Vec<DeliveryRecord>,
  ) -> Result<ReconcileOutcome, ReconcileError> {
    let fresh = self
      .provider
      .show_episodes(show.id(), self.config.episode_limit)
      .await
      .map_err(|e| ReconcileError::Upstream {
        credential: P::is_credential_failure(&e),
        source:     Box::new(e),
      })?;

    if fresh.is_empty() {
      return Err(ReconcileError::EmptyUpstreamResult);
    }

    if show.is_bootstrap() {
      let known = KnownEpisodes::from_episodes(sort_by_release(fresh));
      let adopted = known.len();
      if let Some(latest) = known.latest() {
        tracing::debug!(
          latest_id = %latest.id,
          latest_release = %latest.release_date,
          "checkpoint seeded"
        );
      }
      let info = self.refresh_info(&show).await;
      self.commit(show.id(), known, now, info).await?;
      return Ok(ReconcileOutcome::Bootstrapped { adopted });
    }

    let new = diff(show.known.ids(), &fresh);
    if new.is_empty() {
      let TrackedShow { info, known, .. } = show;
      self.commit(&info.show_id, known, now, None).await?;
      return Ok(ReconcileOutcome::UpToDate);
    }

    let refreshed = self.refresh_info(&show).await;
    let display = refreshed.as_ref().unwrap_or(&show.info);
    deliveries.extend(
      self
        .dispatcher
        .dispatch_all(display, &new, &show.subscribers)
        .await,
    );

    let count = new.len();
    let known = show.known.merge(new);
    self.commit(show.id(), known, now, refreshed).await?;
    Ok(ReconcileOutcome::NewEpisodes { count })
  }

  async fn commit(
    &self,
    show_id: &ShowId,
    known_episodes: KnownEpisodes,
    now: DateTime<Utc>,
    info: Option<ShowInfo>,
  ) -> Result<(), ReconcileError> {
    let update = CheckpointUpdate { known_episodes, last_check: now, info };
    self
      .store
      .update(show_id, update)
      .await
      .map_err(|e| ReconcileError::Persistence(Box::new(e)))
  }

  /// Fetch current display metadata. Returns `Some` only when it differs
  /// from what is stored; failures are logged and ignored.
  async fn refresh_info(&self, show: &TrackedShow) -> Option<ShowInfo> {
    match self.provider.show_info(show.id()).await {
      Ok(mut info) => {
        info.show_id = show.id().clone();
        (info != show.info).then_some(info)
      }
      Err(e) => {
        tracing::debug!(error = %e, "show metadata refresh failed");
        None
      }
    }
  }
}
