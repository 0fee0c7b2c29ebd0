//! TTL Reaper Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheState;

/// Spawns a background task that periodically purges expired cache entries.
///
/// The task sleeps for `cleanup_interval` between passes and locks the cache
/// state for the duration of each pass. It only holds a weak reference, so it
/// ends by itself once the owning cache is dropped.
///
/// # Arguments
/// * `runtime` - Runtime the task runs on
/// * `state` - Weak reference to the cache's shared state
/// * `cleanup_interval` - Time between two passes
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort it.
pub(crate) fn spawn_reaper<V>(
    runtime: &Handle,
    state: Weak<Mutex<CacheState<V>>>,
    cleanup_interval: Duration,
) -> JoinHandle<()>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    runtime.spawn(async move {
        debug!(
            interval_ms = cleanup_interval.as_millis() as u64,
            "starting TTL reaper"
        );

        loop {
            tokio::time::sleep(cleanup_interval).await;

            let Some(state) = state.upgrade() else {
                debug!("cache dropped, TTL reaper exiting");
                break;
            };

            let (removed, remaining) = {
                let mut guard = state.lock();
                let removed = guard.store.purge_expired();
                (removed, guard.store.len())
            };

            if removed > 0 {
                info!(removed, remaining, "TTL reaper purged expired entries");
            } else {
                debug!(remaining, "TTL reaper found no expired entries");
            }
        }
    })
}
