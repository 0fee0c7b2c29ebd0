//! Computation Coalescing
//!
//! Keeps one shared pending result per key so concurrent misses on the same
//! fingerprint wait on a single computation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::debug;

use crate::cache::CacheStore;
use crate::error::{CacheError, Result};

/// Outcome of a computation, cloneable for every waiter.
pub(crate) type PendingResult<V> = Shared<BoxFuture<'static, Result<V>>>;

// == In-Flight Registry ==
/// Map from key to the pending result of its running computation.
pub(crate) struct InFlightRegistry<V> {
    pending: HashMap<String, PendingResult<V>>,
}

impl<V> InFlightRegistry<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Returns a handle on the computation running under `key`, if any.
    pub(crate) fn join(&self, key: &str) -> Option<PendingResult<V>> {
        self.pending.get(key).cloned()
    }

    /// Registers a new computation for `key` and returns the sender that
    /// settles it together with a handle for the caller.
    ///
    /// The handle yields `ComputationAborted` if the sender is dropped
    /// without sending.
    pub(crate) fn register(&mut self, key: &str) -> (oneshot::Sender<Result<V>>, PendingResult<V>) {
        let (tx, rx) = oneshot::channel();
        let aborted_key = key.to_string();
        let pending = async move {
            rx.await
                .unwrap_or_else(|_| Err(CacheError::ComputationAborted(aborted_key)))
        }
        .boxed()
        .shared();

        self.pending.insert(key.to_string(), pending.clone());
        (tx, pending)
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.pending.remove(key).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

// == Shared State ==
/// Everything a cache instance mutates, behind a single lock so a lookup and
/// the in-flight check happen atomically.
pub(crate) struct CacheState<V> {
    pub(crate) store: CacheStore<V>,
    pub(crate) in_flight: InFlightRegistry<V>,
}

impl<V> CacheState<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    pub(crate) fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            store: CacheStore::new(max_size, default_ttl),
            in_flight: InFlightRegistry::new(),
        }
    }
}

// == Completion Guard ==
/// Settles one registered computation.
///
/// `complete` writes the outcome into the store, unregisters the key and only
/// then wakes the waiters. If the guard is dropped unsettled (the compute
/// future panicked or its task was cancelled) the key is unregistered and the
/// waiters observe `ComputationAborted`.
pub(crate) struct CompletionGuard<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    state: Arc<Mutex<CacheState<V>>>,
    key: String,
    tx: Option<oneshot::Sender<Result<V>>>,
}

impl<V> CompletionGuard<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    pub(crate) fn new(
        state: Arc<Mutex<CacheState<V>>>,
        key: String,
        tx: oneshot::Sender<Result<V>>,
    ) -> Self {
        Self {
            state,
            key,
            tx: Some(tx),
        }
    }

    /// Stores a successful value, unregisters the key and notifies waiters.
    pub(crate) fn complete(mut self, outcome: anyhow::Result<V>) {
        let result = {
            let mut state = self.state.lock();
            state.in_flight.remove(&self.key);
            match outcome {
                Ok(value) => {
                    state.store.set(self.key.clone(), value.clone());
                    Ok(value)
                }
                Err(cause) => Err(CacheError::computation(self.key.clone(), cause)),
            }
        };

        debug!(key = %self.key, ok = result.is_ok(), "computation settled");

        if let Some(tx) = self.tx.take() {
            // Every waiter may have gone away; the store is already updated.
            let _ = tx.send(result);
        }
    }
}

impl<V> Drop for CompletionGuard<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.state.lock().in_flight.remove(&self.key);
            debug!(key = %self.key, "computation aborted before settling");
        }
    }
}
