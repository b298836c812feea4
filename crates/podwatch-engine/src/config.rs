//! Engine tuning knobs, deserialised from the `[engine]` config section.

use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

/// Longest accepted retry delay. Larger values are clamped so `now - delay`
/// stays a representable, store-comparable timestamp.
pub const MAX_RETRY_DELAY_SECS: u64 = 30 * 24 * 60 * 60;

/// Runtime configuration for the [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Seconds between timer firings.
  pub poll_interval_secs:   u64,
  /// A show checked less than this many seconds ago is not due.
  pub retry_delay_secs:     u64,
  /// Maximum shows selected per cycle.
  pub batch_size:           usize,
  /// Episodes requested per show; the provider may cap it further.
  pub episode_limit:        u32,
  /// Shows reconciled in parallel within one cycle.
  pub concurrency:          usize,
  /// Sends in flight at once for one episode.
  pub delivery_concurrency: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      poll_interval_secs:   120,
      retry_delay_secs:     300,
      batch_size:           50,
      episode_limit:        50,
      concurrency:          4,
      delivery_concurrency: 4,
    }
  }
}

impl EngineConfig {
  /// Never zero; `tokio::time::interval` panics on a zero period.
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs.max(1))
  }

  /// Clamped to [`MAX_RETRY_DELAY_SECS`].
  pub fn retry_delay(&self) -> TimeDelta {
    // Fits an i64 after the clamp.
    TimeDelta::seconds(self.retry_delay_secs.min(MAX_RETRY_DELAY_SECS) as i64)
  }

  pub fn concurrency(&self) -> usize { self.concurrency.max(1) }

  pub fn delivery_concurrency(&self) -> usize { self.delivery_concurrency.max(1) }
}
