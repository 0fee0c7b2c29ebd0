//! Cache Statistics Module
//!
//! Tracks cache performance counters and builds derived snapshots.

use serde::Serialize;

// == Telemetry ==
/// Lifetime counters owned by a cache instance.
///
/// Counters only move forward; `reset` is the sole way to zero them.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    coalesced: u64,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A read served from the store.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// A read that found nothing, or a miss that triggered a computation.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// An entry dropped to respect the size bound.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// An entry dropped because its TTL elapsed.
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    /// A caller that joined a computation already in flight.
    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // == Snapshot ==
    /// Builds a stats snapshot from the counters and live store figures.
    pub fn snapshot(&self, size: usize, memory_usage: usize) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
            coalesced: self.coalesced,
            hit_rate: self.hit_rate(),
            size,
            memory_usage,
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of cache performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads served from the store
    pub hits: u64,
    /// Reads that found nothing, plus misses that triggered a computation
    pub misses: u64,
    /// Entries evicted by the LRU policy
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Callers that reused another caller's in-flight computation
    pub coalesced: u64,
    /// hits / (hits + misses), 0.0 before the first request
    pub hit_rate: f64,
    /// Current number of entries
    pub size: usize,
    /// Sum of entry size estimates in bytes
    pub memory_usage: usize,
}
