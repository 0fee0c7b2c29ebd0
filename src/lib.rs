//! calc_cache - Memoization engine for expensive calculator runs
//!
//! Deduplicates concurrent computations of the same fingerprint, bounds
//! memory with LRU eviction, expires entries by TTL and reports hit/miss
//! telemetry.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{fingerprint, Cache, CacheStats, CacheStore};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
