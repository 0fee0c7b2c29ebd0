//! Cache Module
//!
//! Provides in-memory memoization with TTL expiration, LRU eviction and
//! coalescing of concurrent computations.

mod coalesce;
mod entry;
mod fingerprint;
mod lru;
mod memo;
mod stats;
mod store;


// Re-export public types
pub use entry::{estimate_size, CacheEntry};
pub use fingerprint::fingerprint;
pub use lru::LruTracker;
pub use memo::Cache;
pub use stats::{CacheStats, Telemetry};
pub use store::CacheStore;

pub(crate) use coalesce::CacheState;
