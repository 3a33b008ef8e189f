//! Lazily resolved user entity of the active session.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ClientError, HttpFailure};
use crate::framework::container::{settled, Promise};
use crate::model::Entity;

#[derive(Default)]
struct CacheState {
    /// Bumped on every invalidation so late results of an older session are dropped.
    generation: u64,
    user_id: Option<String>,
    value: Option<Entity>,
    pending: Option<Promise<Entity>>,
}

/// Caches `$currentUser` keyed by the session's user id.
#[derive(Clone, Default)]
pub struct CurrentUserCache {
    state: Arc<Mutex<CacheState>>,
}

impl CurrentUserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The best-known user, `None` while unresolved.
    pub fn current(&self) -> Option<Entity> {
        self.state.lock().value.clone()
    }

    /// Resolves the user for `user_id`, sharing one request between callers.
    ///
    /// `fetch` is only called on a miss. Without a user id the result is a
    /// local stub 401 and `fetch` is never called.
    pub fn ensure<F>(&self, user_id: Option<String>, fetch: F) -> Promise<Entity>
    where
        F: FnOnce() -> BoxFuture<'static, Result<Entity, ClientError>>,
    {
        let Some(user_id) = user_id else {
            return settled(Err(ClientError::Http(HttpFailure::stub_unauthorized())));
        };

        let mut state = self.state.lock();
        if state.user_id.as_deref() == Some(user_id.as_str()) {
            if let Some(pending) = &state.pending {
                return pending.clone();
            }
        }

        state.generation += 1;
        state.user_id = Some(user_id.clone());
        state.value = None;
        let generation = state.generation;
        debug!(%user_id, generation, "Resolving current user");

        let request = fetch();
        let cache = Arc::clone(&self.state);
        let promise = async move {
            let result = request.await;
            let mut state = cache.lock();
            if state.generation == generation {
                match &result {
                    Ok(user) => state.value = Some(user.clone()),
                    Err(_) => state.pending = None,
                }
            }
            result
        }
        .boxed()
        .shared();

        state.pending = Some(promise.clone());
        drop(state);

        // The request runs to completion even if nobody awaits the promise.
        tokio::spawn(promise.clone());
        promise
    }

    /// Stores a user delivered alongside the access token.
    pub fn seed(&self, user_id: String, user: Entity) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.user_id = Some(user_id);
        state.value = Some(user.clone());
        state.pending = Some(settled(Ok(user)));
    }

    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.user_id = None;
        state.value = None;
        state.pending = None;
    }
}

impl std::fmt::Debug for CurrentUserCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CurrentUserCache")
            .field("user_id", &state.user_id)
            .field("resolved", &state.value.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn user(email: &str) -> Entity {
        json!({"id": 1, "email": email}).as_object().cloned().unwrap()
    }

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        email: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Entity, ClientError>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ClientError>(user(email)) }.boxed()
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_request() {
        let cache = CurrentUserCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.ensure(Some("1".into()), counting_fetch(&calls, "a@example.com"));
        let second = cache.ensure(Some("1".into()), counting_fetch(&calls, "b@example.com"));
        assert!(cache.current().is_none());

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.current().unwrap()["email"], "a@example.com");
    }

    #[tokio::test]
    async fn missing_session_yields_stub_without_fetching() {
        let cache = CurrentUserCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let err = cache
            .ensure(None, counting_fetch(&calls, "a@example.com"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(err.as_http().unwrap().is_stub());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalidation_forces_a_fresh_request() {
        let cache = CurrentUserCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .ensure(Some("1".into()), counting_fetch(&calls, "a@example.com"))
            .await
            .unwrap();

        cache.invalidate();
        assert!(cache.current().is_none());

        cache
            .ensure(Some("1".into()), counting_fetch(&calls, "a@example.com"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn late_result_of_invalidated_session_is_dropped() {
        let cache = CurrentUserCache::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<Entity>();
        let promise = cache.ensure(Some("1".into()), move || {
            async move { rx.await.map_err(|_| ClientError::Closed) }.boxed()
        });

        cache.invalidate();
        tx.send(user("stale@example.com")).unwrap();
        promise.await.unwrap();
        assert!(cache.current().is_none());
    }

    #[tokio::test]
    async fn failed_resolution_is_retried() {
        let cache = CurrentUserCache::new();
        let failed = cache.ensure(Some("1".into()), || {
            async { Err::<Entity, _>(ClientError::Transport("offline".into())) }.boxed()
        });
        assert!(failed.await.is_err());

        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .ensure(Some("1".into()), counting_fetch(&calls, "a@example.com"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn seeded_user_is_returned_without_fetching() {
        let cache = CurrentUserCache::new();
        cache.seed("1".into(), user("seed@example.com"));
        let calls = Arc::new(AtomicUsize::new(0));
        let resolved = cache
            .ensure(Some("1".into()), counting_fetch(&calls, "other@example.com"))
            .await
            .unwrap();
        assert_eq!(resolved["email"], "seed@example.com");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
