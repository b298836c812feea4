//! Expiry-tagged access token cache with single-flight refresh.

use std::{fmt, future::Future, time::Duration};

use tokio::{sync::Mutex, time::Instant};

/// A bearer token and the instant it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
  pub value:      String,
  pub expires_at: Instant,
}

impl AccessToken {
  /// A token valid for `expires_in` from now.
  pub fn new(value: impl Into<String>, expires_in: Duration) -> Self {
    Self { value: value.into(), expires_at: Instant::now() + expires_in }
  }

  /// Whether the token is still valid for at least `margin` after `now`.
  pub fn is_usable(&self, margin: Duration, now: Instant) -> bool {
    now + margin < self.expires_at
  }
}

impl fmt::Debug for AccessToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AccessToken")
      .field("value", &"<redacted>")
      .field("expires_at", &self.expires_at)
      .finish()
  }
}

/// Holds at most one [`AccessToken`].
///
/// The lock is held for the whole refresh, so callers arriving while a
/// refresh is in flight wait for it and then reuse its result instead of
/// starting their own.
#[derive(Debug)]
pub struct TokenCache {
  slot:   Mutex<Option<AccessToken>>,
  margin: Duration,
}

impl TokenCache {
  /// `margin` is how long before expiry a token is considered stale.
  pub fn new(margin: Duration) -> Self {
    Self { slot: Mutex::new(None), margin }
  }

  /// Return the cached token value, running `refresh` first if the cache is
  /// empty or the token expires within the margin.
  ///
  /// A failed refresh leaves the cache empty.
  pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<String, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<AccessToken, E>>,
  {
    let mut slot = self.slot.lock().await;
    if let Some(token) = slot.as_ref()
      && token.is_usable(self.margin, Instant::now())
    {
      return Ok(token.value.clone());
    }

    *slot = None;
    let token = refresh().await?;
    let value = token.value.clone();
    *slot = Some(token);
    Ok(value)
  }

  /// Drop the cached token so the next caller refreshes.
  pub async fn invalidate(&self) { *self.slot.lock().await = None; }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  const MARGIN: Duration = Duration::from_secs(300);

  async fn counted_refresh(
    calls: &AtomicUsize,
    expires_in: Duration,
  ) -> Result<AccessToken, String> {
    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(AccessToken::new(format!("token-{n}"), expires_in))
  }

  #[tokio::test]
  async fn reuses_fresh_token() {
    let cache = TokenCache::new(MARGIN);
    let calls = AtomicUsize::new(0);

    let a = cache.get_or_refresh(|| counted_refresh(&calls, Duration::from_secs(3600))).await;
    let b = cache.get_or_refresh(|| counted_refresh(&calls, Duration::from_secs(3600))).await;

    assert_eq!(a.unwrap(), "token-1");
    assert_eq!(b.unwrap(), "token-1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn token_inside_margin_is_refreshed() {
    let cache = TokenCache::new(MARGIN);
    let calls = AtomicUsize::new(0);

    // Valid for one minute, but the margin is five.
    cache.get_or_refresh(|| counted_refresh(&calls, Duration::from_secs(60))).await.unwrap();
    let second = cache
      .get_or_refresh(|| counted_refresh(&calls, Duration::from_secs(60)))
      .await
      .unwrap();

    assert_eq!(second, "token-2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn concurrent_callers_share_one_refresh() {
    let cache = Arc::new(TokenCache::new(MARGIN));
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..16)
      .map(|_| {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
          cache
            .get_or_refresh(|| counted_refresh(&calls, Duration::from_secs(3600)))
            .await
        })
      })
      .collect();

    for task in tasks {
      assert_eq!(task.await.unwrap().unwrap(), "token-1");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn failed_refresh_is_retried_by_next_caller() {
    let cache = TokenCache::new(MARGIN);

    let err = cache
      .get_or_refresh(|| async { Err::<AccessToken, _>("boom") })
      .await
      .unwrap_err();
    assert_eq!(err, "boom");

    let ok = cache
      .get_or_refresh(|| async { Ok::<_, &str>(AccessToken::new("t", Duration::from_secs(3600))) })
      .await
      .unwrap();
    assert_eq!(ok, "t");
  }

  #[tokio::test]
  async fn invalidate_forces_refresh() {
    let cache = TokenCache::new(MARGIN);
    let calls = AtomicUsize::new(0);

    cache.get_or_refresh(|| counted_refresh(&calls, Duration::from_secs(3600))).await.unwrap();
    cache.invalidate().await;
    let v = cache
      .get_or_refresh(|| counted_refresh(&calls, Duration::from_secs(3600)))
      .await
      .unwrap();

    assert_eq!(v, "token-2");
  }

  #[test]
  fn debug_redacts_value() {
    let token = AccessToken::new("secret-value", Duration::from_secs(10));
    assert!(!format!("{token:?}").contains("secret-value"));
  }
}
