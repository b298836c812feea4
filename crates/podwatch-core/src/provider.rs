//! The `ContentProvider` trait: the upstream show/episode catalog.

use std::future::Future;

use crate::{
  episode::Episode,
  show::{ShowId, ShowInfo},
};

/// Read access to an external catalog of shows and episodes.
///
/// Implementations never retry internally: a failed call surfaces as an error
/// and the caller decides when to try again.
pub trait ContentProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The most recent `limit` episodes of a show, in provider order. The
  /// provider may cap `limit`; this is never a full history.
  fn show_episodes<'a>(
    &'a self,
    show_id: &'a ShowId,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<Episode>, Self::Error>> + Send + 'a;

  /// Current display metadata for a show.
  fn show_info<'a>(
    &'a self,
    show_id: &'a ShowId,
  ) -> impl Future<Output = Result<ShowInfo, Self::Error>> + Send + 'a;

  /// Whether `error` means the provider rejected our credentials, as opposed
  /// to a transient or rate-limit failure.
  fn is_credential_failure(_error: &Self::Error) -> bool { false }
}
