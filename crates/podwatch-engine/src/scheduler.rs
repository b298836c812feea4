//! The periodic reconciliation loop.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use podwatch_core::{
  notify::MessageSink,
  provider::ContentProvider,
  show::SubscriberId,
  store::{DueQuery, SubscriptionStore},
};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

use crate::{CycleError, EngineConfig, NotificationDispatcher, ShowReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
  Idle,
  Running,
}

/// What one cycle did.
#[derive(Debug)]
pub struct CycleSummary {
  pub cycle_id:             Uuid,
  pub selected:             usize,
  pub succeeded:            usize,
  pub bootstrapped:         usize,
  pub failed:               usize,
  pub notifications_sent:   usize,
  pub notifications_failed: usize,
  pub elapsed:              Duration,
  /// One report per selected show, in completion order.
  pub reports:              Vec<ShowReport>,
}

impl CycleSummary {
  fn new(cycle_id: Uuid, reports: Vec<ShowReport>, elapsed: Duration) -> Self {
    use crate::ReconcileOutcome::Bootstrapped;

    let succeeded = reports.iter().filter(|r| r.is_ok()).count();
    Self {
      cycle_id,
      selected: reports.len(),
      succeeded,
      bootstrapped: reports
        .iter()
        .filter(|r| matches!(r.result, Ok(Bootstrapped { .. })))
        .count(),
      failed: reports.len() - succeeded,
      notifications_sent: reports.iter().map(ShowReport::notifications_sent).sum(),
      notifications_failed: reports.iter().map(ShowReport::notifications_failed).sum(),
      elapsed,
      reports,
    }
  }
}

/// Clears the running flag when a cycle ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self(flag))
  }
}

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

/// Drives reconciliation cycles over explicit store, provider and sink
/// handles.
///
/// At most one cycle runs at a time; a trigger that arrives while a cycle is
/// running is rejected with [`CycleError::AlreadyRunning`] rather than queued.
pub struct Scheduler<St, P, K> {
  pub(crate) store:      Arc<St>,
  pub(crate) provider:   Arc<P>,
  pub(crate) dispatcher: NotificationDispatcher<K>,
  pub(crate) config:     EngineConfig,
  operator:              Option<SubscriberId>,
  running:               AtomicBool,
}

impl<St, P, K> Scheduler<St, P, K>
where
  St: SubscriptionStore,
  P: ContentProvider,
  K: MessageSink,
{
  pub fn new(store: Arc<St>, provider: Arc<P>, sink: Arc<K>, config: EngineConfig) -> Self {
    let dispatcher = NotificationDispatcher::new(sink, config.delivery_concurrency());
    Self {
      store,
      provider,
      dispatcher,
      config,
      operator: None,
      running: AtomicBool::new(false),
    }
  }

  /// Send an alert to `operator` when a cycle hits a credential failure.
  pub fn with_operator(mut self, operator: Option<SubscriberId>) -> Self {
    self.operator = operator;
    self
  }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn state(&self) -> SchedulerState {
    if self.running.load(Ordering::Acquire) {
      SchedulerState::Running
    } else {
      SchedulerState::Idle
    }
  }

  pub async fn run_cycle(&self) -> Result<CycleSummary, CycleError> {
    self.run_cycle_at(Utc::now()).await
  }

  /// Run one cycle treating `now` as the current time.
  pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleSummary, CycleError> {
    let _guard = RunningGuard::acquire(&self.running).ok_or(CycleError::AlreadyRunning)?;

    let cycle_id = Uuid::new_v4();
    let span = tracing::info_span!("cycle", %cycle_id);
    self.cycle(cycle_id, now).instrument(span).await
  }

  async fn cycle(&self, cycle_id: Uuid, now: DateTime<Utc>) -> Result<CycleSummary, CycleError> {
    let started = Instant::now();

    let due_before = now.checked_sub_signed(self.config.retry_delay()).unwrap_or(now);
    let query = DueQuery { due_before, limit: self.config.batch_size };
    let shows = self
      .store
      .find_due(query)
      .await
      .map_err(|e| CycleError::Store(Box::new(e)))?;

    tracing::debug!(selected = shows.len(), %due_before, "selected due shows");

    let reports: Vec<ShowReport> = stream::iter(shows)
      .map(|show| self.reconcile_one(show, now))
      .buffer_unordered(self.config.concurrency())
      .collect()
      .await;

    let summary = CycleSummary::new(cycle_id, reports, started.elapsed());
    self.alert_on_credential_failure(&summary).await;

    tracing::info!(
      selected = summary.selected,
      succeeded = summary.succeeded,
      bootstrapped = summary.bootstrapped,
      failed = summary.failed,
      notifications_sent = summary.notifications_sent,
      notifications_failed = summary.notifications_failed,
      elapsed_ms = summary.elapsed.as_millis() as u64,
      "cycle complete"
    );
    Ok(summary)
  }

  async fn alert_on_credential_failure(&self, summary: &CycleSummary) {
    let Some(operator) = &self.operator else { return };
    let Some(error) = summary
      .reports
      .iter()
      .find_map(|r| r.result.as_ref().err().filter(|e| e.is_credential_failure()))
    else {
      return;
    };

    let text = format!(
      "podwatch: the content provider rejected our credentials during cycle {}.\n\n{error}",
      summary.cycle_id
    );
    self.dispatcher.alert(operator, text).await;
  }

  /// Run a cycle on every timer tick until `shutdown` resolves.
  ///
  /// The first tick fires immediately. A tick whose deadline passed while a
  /// cycle was running is dropped, so the next cycle starts on the first
  /// deadline after the previous one finished. Shutdown wins over a ready
  /// tick; an in-flight cycle is allowed to finish.
  pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
    let mut idle_since = Instant::now();
    let mut ticker = tokio::time::interval(self.config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    tracing::info!(
      poll_interval_secs = self.config.poll_interval().as_secs(),
      "scheduler started"
    );

    loop {
      let deadline = tokio::select! {
        biased;
        _ = &mut shutdown => break,
        deadline = ticker.tick() => deadline,
      };

      // Skip only re-anchors the schedule; the overdue tick itself still
      // fires once.
      if deadline < idle_since {
        tracing::debug!(
          late_ms = idle_since.duration_since(deadline).as_millis() as u64,
          "stale tick dropped"
        );
        continue;
      }

      match self.run_cycle().await {
        Ok(_) => {}
        Err(CycleError::AlreadyRunning) => {
          tracing::debug!("cycle still running; trigger dropped");
        }
        Err(e) => tracing::error!(error = %e, "cycle failed"),
      }
      idle_since = Instant::now();
    }

    tracing::info!("scheduler stopped");
  }
}
