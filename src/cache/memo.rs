//! Memoizing Cache
//!
//! Public entry point: a bounded, expiring result cache that coalesces
//! concurrent computations of the same key.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::coalesce::{CacheState, CompletionGuard, PendingResult};
use crate::cache::{fingerprint, CacheStats};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_reaper;

// == Cache ==
/// Memoization cache for expensive computations.
///
/// Each instance owns its entries, its in-flight registry and its background
/// reaper; instances never share state. Wrap in an `Arc` to hand one cache to
/// several consumers. Dropping the cache stops the reaper.
///
/// Computations run on the runtime the cache was created in, so the cache
/// can be awaited from any executor afterwards.
///
/// # Example
/// ```no_run
/// # async fn run() -> calc_cache::Result<()> {
/// use calc_cache::{Cache, CacheConfig};
///
/// let cache: Cache<f64> = Cache::new(CacheConfig::default())?;
/// let total = cache
///     .compute_with_cache("roof-cost:{\"area\":120}", || async { Ok(120.0 * 42.5) })
///     .await?;
/// assert_eq!(cache.get("roof-cost:{\"area\":120}"), Some(total));
/// # Ok(())
/// # }
/// ```
pub struct Cache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    state: Arc<Mutex<CacheState<V>>>,
    config: CacheConfig,
    runtime: Handle,
    reaper: Option<JoinHandle<()>>,
}

impl<V> Cache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache and starts its background reaper.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - `InvalidConfig` if the TTL or cleanup interval is zero
    /// - `NoRuntime` when no tokio runtime is running
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let state = Arc::new(Mutex::new(CacheState::new(config.max_size, config.ttl)));
        let reaper = spawn_reaper(&runtime, Arc::downgrade(&state), config.cleanup_interval);

        debug!(
            max_size = config.max_size,
            ttl_ms = config.ttl.as_millis() as u64,
            cleanup_interval_ms = config.cleanup_interval.as_millis() as u64,
            "cache created"
        );

        Ok(Self {
            state,
            config,
            runtime,
            reaper: Some(reaper),
        })
    }

    // == Direct Access ==
    /// Returns the cached value for `key`, counting a hit or a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        self.state.lock().store.get(key)
    }

    /// Stores `value` under `key` with the configured TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.state.lock().store.set(key, value);
    }

    /// Stores `value` under `key` with an explicit TTL.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.state.lock().store.set_with_ttl(key, value, ttl);
    }

    /// Removes `key` if present. Computations in flight are unaffected.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().store.remove(key)
    }

    /// Drops every entry. Counters and in-flight computations are kept.
    pub fn clear(&self) {
        self.state.lock().store.clear();
    }

    /// Runs one expiry pass immediately, independent of the reaper timer.
    pub fn purge_expired(&self) -> usize {
        self.state.lock().store.purge_expired()
    }

    // == Telemetry ==
    pub fn stats(&self) -> CacheStats {
        self.state.lock().store.stats()
    }

    pub fn reset_stats(&self) {
        self.state.lock().store.reset_stats();
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().store.is_empty()
    }

    /// Checks presence without counting a hit or refreshing recency.
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().store.contains(key)
    }

    /// Number of computations currently running.
    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Compute With Cache ==
    /// Returns the cached value for `key`, computing it on a miss.
    ///
    /// Concurrent calls for the same uncached key share one run of
    /// `compute`: the first caller starts it, later callers wait on it. The
    /// computation runs as its own tokio task, so a caller giving up on the
    /// returned future does not cancel it and its result is still cached.
    ///
    /// Failures are handed to every waiter as `CacheError::Computation` and
    /// are never cached; the next call for the key computes again. If the
    /// cache's runtime has shut down, waiters get `ComputationAborted`.
    pub async fn compute_with_cache<F, Fut>(&self, key: impl Into<String>, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let key = key.into();

        let (tx, pending) = match self.begin(&key) {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Joined(pending) => {
                debug!(key = %key, "joined computation in flight");
                return pending.await;
            }
            Lookup::Started(tx, pending) => (tx, pending),
        };

        // Built before calling `compute` so a panic there still unregisters
        let guard = CompletionGuard::new(Arc::clone(&self.state), key.clone(), tx);
        debug!(key = %key, "starting computation");
        let computation = compute();
        self.runtime.spawn(async move {
            let outcome = computation.await;
            guard.complete(outcome);
        });

        pending.await
    }

    /// Store lookup and in-flight check under one lock acquisition.
    fn begin(&self, key: &str) -> Lookup<V> {
        let mut state = self.state.lock();
        if let Some(value) = state.store.lookup(key) {
            return Lookup::Hit(value);
        }
        if let Some(pending) = state.in_flight.join(key) {
            state.store.telemetry_mut().record_coalesced();
            return Lookup::Joined(pending);
        }
        state.store.telemetry_mut().record_miss();
        let (tx, pending) = state.in_flight.register(key);
        Lookup::Started(tx, pending)
    }

    // == Memoize ==
    /// Derives a key from `operation` and `inputs`, then behaves like
    /// [`Cache::compute_with_cache`].
    pub async fn memoize<I, F, Fut>(&self, operation: &str, inputs: &I, compute: F) -> Result<V>
    where
        I: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let key = fingerprint(operation, inputs)?;
        self.compute_with_cache(key, compute).await
    }

    // == Shutdown ==
    /// Stops the background reaper. Lazy expiry on reads keeps working.
    pub fn shutdown(&mut self) {
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
            debug!("cache reaper stopped");
        }
    }

    pub fn is_reaper_running(&self) -> bool {
        self.reaper.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

enum Lookup<V> {
    Hit(V),
    Joined(PendingResult<V>),
    Started(oneshot::Sender<Result<V>>, PendingResult<V>),
}

impl<V> Drop for Cache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
