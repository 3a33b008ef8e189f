//! # Result Containers
//!
//! Every generated action returns a container immediately. The container is
//! populated once the spawned request settles; until then it holds its initial
//! value (empty collection, or the data that was sent) and
//! [`ResultContainer::resolved`] is `false`.
//!
//! The container's [`Promise`] is a [`Shared`] future, so any number of callers
//! can await the same settlement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::ClientError;
use crate::model::Entity;

/// Awaitable settlement of a container; cheap to clone.
pub type Promise<T> = Shared<BoxFuture<'static, Result<T, ClientError>>>;

/// A promise that is already settled.
pub fn settled<T>(result: Result<T, ClientError>) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    futures::future::ready(result).boxed().shared()
}

/// Builds the promise side of a oneshot channel.
pub(crate) fn channel_promise<T>() -> (oneshot::Sender<Result<T, ClientError>>, Promise<T>)
where
    T: Clone + Send + Sync + 'static,
{
    let (tx, rx) = oneshot::channel();
    let promise = async move {
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Closed),
        }
    }
    .boxed()
    .shared();
    (tx, promise)
}

type SuccessFn = Box<dyn FnOnce(&Value) + Send>;
type ErrorFn = Box<dyn FnOnce(&ClientError) + Send>;

/// Optional success/error callbacks of an action call.
///
/// The success callback receives the raw response body and runs after the
/// container has been populated; both run before the promise settles.
#[derive(Default)]
pub struct Callbacks {
    pub(crate) on_success: Option<SuccessFn>,
    pub(crate) on_error: Option<ErrorFn>,
}

impl Callbacks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(&Value) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&ClientError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

struct Slot<T> {
    value: RwLock<T>,
    resolved: AtomicBool,
    promise: Mutex<Promise<T>>,
}

/// Value plus `$promise`/`$resolved`, shared between the caller and the task
/// that fills it.
pub struct ResultContainer<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for ResultContainer<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> ResultContainer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// An unresolved container whose promise is `promise`.
    pub(crate) fn pending(initial: T, promise: Promise<T>) -> Self {
        Self {
            slot: Arc::new(Slot {
                value: RwLock::new(initial),
                resolved: AtomicBool::new(false),
                promise: Mutex::new(promise),
            }),
        }
    }

    /// A container that is already resolved to `value`.
    pub(crate) fn ready(value: T) -> Self {
        let container = Self::pending(value.clone(), settled(Ok(value)));
        container.slot.resolved.store(true, Ordering::SeqCst);
        container
    }

    /// Snapshot of the current value.
    pub fn value(&self) -> T {
        self.slot.value.read().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.value.read())
    }

    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.slot.value.write())
    }

    pub fn resolved(&self) -> bool {
        self.slot.resolved.load(Ordering::SeqCst)
    }

    pub fn promise(&self) -> Promise<T> {
        self.slot.promise.lock().clone()
    }

    /// Starts a new round trip on this container (used by `$save`).
    pub(crate) fn rearm(&self, promise: Promise<T>) {
        self.slot.resolved.store(false, Ordering::SeqCst);
        *self.slot.promise.lock() = promise;
    }

    pub(crate) fn resolve(&self, value: T) {
        *self.slot.value.write() = value;
        self.slot.resolved.store(true, Ordering::SeqCst);
    }
}

/// Ordered result of a collection action.
pub type Collection = ResultContainer<Vec<Entity>>;

impl ResultContainer<Vec<Entity>> {
    pub fn len(&self) -> usize {
        self.slot.value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn item(&self, index: usize) -> Option<Entity> {
        self.slot.value.read().get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pending_container_resolves_through_channel() {
        let (tx, promise) = channel_promise::<Vec<Entity>>();
        let container = ResultContainer::pending(Vec::new(), promise);
        assert!(!container.resolved());
        assert!(container.is_empty());

        let mut entity = Entity::new();
        entity.insert("name".into(), "a".into());
        container.resolve(vec![entity.clone()]);
        tx.send(Ok(vec![entity])).unwrap();

        let first = container.promise().await.unwrap();
        let second = container.promise().await.unwrap();
        assert_eq!(first, second);
        assert!(container.resolved());
        assert_eq!(container.len(), 1);
    }

    #[tokio::test]
    async fn dropped_sender_rejects_with_closed() {
        let (tx, promise) = channel_promise::<Entity>();
        drop(tx);
        assert!(matches!(promise.await, Err(ClientError::Closed)));
    }

    #[test]
    fn ready_container_is_resolved() {
        let container = ResultContainer::ready(Entity::new());
        assert!(container.resolved());
    }
}
