//! Notification fan-out: one message per (episode, subscriber) pair.

use std::sync::Arc;

use futures::{StreamExt, stream};
use podwatch_core::{
  episode::{Episode, EpisodeId},
  notify::{MessageLink, MessageSink, OutgoingMessage},
  show::{ShowInfo, SubscriberId},
};

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
  Delivered,
  /// The sink refused or could not reach the recipient.
  Failed(String),
}

impl DeliveryOutcome {
  pub fn is_delivered(&self) -> bool { matches!(self, Self::Delivered) }
}

#[derive(Debug, Clone)]
pub struct DeliveryRecord {
  pub episode_id: EpisodeId,
  pub subscriber: SubscriberId,
  pub outcome:    DeliveryOutcome,
}

/// Delivers episode notifications through a [`MessageSink`], absorbing
/// per-recipient failures.
pub struct NotificationDispatcher<K> {
  sink:  Arc<K>,
  /// Sends in flight at once for one episode.
  limit: usize,
}

impl<K> Clone for NotificationDispatcher<K> {
  fn clone(&self) -> Self { Self { sink: Arc::clone(&self.sink), limit: self.limit } }
}

impl<K: MessageSink> NotificationDispatcher<K> {
  /// `limit` is raised to 1 if zero.
  pub fn new(sink: Arc<K>, limit: usize) -> Self { Self { sink, limit: limit.max(1) } }

  /// Exactly one delivery attempt. Never fails; a failure is logged and
  /// returned as [`DeliveryOutcome::Failed`].
  pub async fn dispatch(
    &self,
    show: &ShowInfo,
    episode: &Episode,
    subscriber: &SubscriberId,
  ) -> DeliveryOutcome {
    let message = render_episode(show, episode, subscriber);
    match self.sink.send(&message).await {
      Ok(()) => {
        tracing::debug!(
          show_id = %show.show_id,
          episode_id = %episode.id,
          subscriber = %subscriber,
          "notification delivered"
        );
        DeliveryOutcome::Delivered
      }
      Err(e) => {
        tracing::warn!(
          show_id = %show.show_id,
          episode_id = %episode.id,
          subscriber = %subscriber,
          error = %e,
          "notification failed"
        );
        DeliveryOutcome::Failed(e.to_string())
      }
    }
  }

  /// Notify every subscriber of every episode.
  ///
  /// Episodes go out strictly in the given order: all attempts for one
  /// episode finish before the next episode starts. Subscribers of one
  /// episode are attempted concurrently, at most `limit` at a time.
  pub async fn dispatch_all(
    &self,
    show: &ShowInfo,
    episodes: &[Episode],
    subscribers: &[SubscriberId],
  ) -> Vec<DeliveryRecord> {
    let mut records = Vec::with_capacity(episodes.len() * subscribers.len());
    for episode in episodes {
      let outcomes: Vec<DeliveryOutcome> = stream::iter(subscribers)
        .map(|subscriber| self.dispatch(show, episode, subscriber))
        .buffered(self.limit)
        .collect()
        .await;

      records.extend(subscribers.iter().zip(outcomes).map(|(subscriber, outcome)| {
        DeliveryRecord {
          episode_id: episode.id.clone(),
          subscriber: subscriber.clone(),
          outcome,
        }
      }));
    }
    records
  }

  /// Send a plain-text operator alert.
  pub async fn alert(&self, operator: &SubscriberId, text: String) -> DeliveryOutcome {
    let message = OutgoingMessage { recipient: operator.clone(), text, links: Vec::new() };
    match self.sink.send(&message).await {
      Ok(()) => DeliveryOutcome::Delivered,
      Err(e) => {
        tracing::error!(operator = %operator, error = %e, "operator alert failed");
        DeliveryOutcome::Failed(e.to_string())
      }
    }
  }
}

/// The default notification body with show and episode links.
pub fn render_episode(
  show: &ShowInfo,
  episode: &Episode,
  recipient: &SubscriberId,
) -> OutgoingMessage {
  let text = format!(
    "New episode available for: {}\n\nTitle: {}\nRelease Date: {}",
    show.name, episode.title, episode.release_date
  );

  let links = [
    ("Podcast Page", show.external_url.as_ref()),
    ("Play Episode", episode.external_url.as_ref()),
  ]
  .into_iter()
  .filter_map(|(label, url)| {
    url.map(|url| MessageLink { label: label.to_owned(), url: url.clone() })
  })
  .collect();

  OutgoingMessage { recipient: recipient.clone(), text, links }
}
