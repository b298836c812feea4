//! Error types for `podwatch-engine`.
//!
//! None of these escape a cycle: per-show errors end up in a
//! [`ShowReport`](crate::ShowReport) and are logged, cycle errors are logged by
//! the run loop.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why one show could not be reconciled this cycle.
#[derive(Debug, Error)]
pub enum ReconcileError {
  /// Rate limit, network or auth failure. Nothing was written.
  #[error("upstream unavailable: {source}")]
  Upstream {
    source:     BoxError,
    /// The provider rejected our credentials.
    credential: bool,
  },

  /// The provider answered with no episodes. Nothing was written.
  #[error("upstream returned no episodes")]
  EmptyUpstreamResult,

  /// Notifications (if any) went out but the checkpoint was not committed.
  #[error("failed to persist checkpoint: {0}")]
  Persistence(#[source] BoxError),
}

impl ReconcileError {
  pub fn is_credential_failure(&self) -> bool {
    matches!(self, Self::Upstream { credential: true, .. })
  }
}

/// Why a whole cycle did not run.
#[derive(Debug, Error)]
pub enum CycleError {
  #[error("a cycle is already running")]
  AlreadyRunning,

  #[error("failed to select due shows: {0}")]
  Store(#[source] BoxError),
}
