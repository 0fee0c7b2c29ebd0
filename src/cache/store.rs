//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::cache::{CacheEntry, CacheStats, LruTracker, Telemetry};

// == Cache Store ==
/// Bounded result storage with LRU eviction and TTL support.
///
/// Eviction is purely count based and happens right after an insertion pushes
/// the entry count above `max_size`.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Fingerprint to entry storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance counters
    telemetry: Telemetry,
    /// Maximum number of entries allowed
    max_size: usize,
    /// TTL for entries stored without an explicit TTL
    default_ttl: Duration,
}

impl<V> CacheStore<V>
where
    V: Clone + Serialize,
{
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries (0 turns every set into an eviction)
    /// * `default_ttl` - TTL for entries stored without an explicit TTL
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            telemetry: Telemetry::new(),
            max_size,
            default_ttl,
        }
    }

    // == Get ==
    /// Retrieves a clone of the value stored under `key`.
    ///
    /// Returns None if the key is absent or expired; both count as a miss.
    /// Expired entries are removed on the spot.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let value = self.lookup(key);
        if value.is_none() {
            self.telemetry.record_miss();
        }
        value
    }

    /// Same as `get` but leaves miss accounting to the caller.
    ///
    /// Hits and expirations are still recorded.
    pub(crate) fn lookup(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entry = self.entries.get_mut(key)?;

        if entry.is_expired_at(now) {
            self.entries.remove(key);
            self.lru.remove(key);
            self.telemetry.record_expiration();
            trace!(key, "expired entry dropped on read");
            return None;
        }

        entry.record_access(now);
        let value = entry.value.clone();
        self.lru.touch(key);
        self.telemetry.record_hit();
        Some(value)
    }

    // == Set ==
    /// Stores a value under `key` with the default TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, self.default_ttl);
    }

    /// Stores a value under `key` with an explicit TTL.
    ///
    /// A zero TTL stores an entry that no later `get` will return.
    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert(key.into(), value, ttl);
    }

    fn insert(&mut self, key: String, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl, Instant::now());

        // Replacing a key resets created_at and ttl along with the value
        self.lru.touch(&key);
        self.entries.insert(key, entry);

        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.max_size {
            let Some(key) = self.lru.evict_oldest() else {
                break;
            };
            self.entries.remove(&key);
            self.telemetry.record_eviction();
            trace!(key = %key, "evicted least recently used entry");
        }
    }
}

impl<V> CacheStore<V> {
    // == Remove ==
    /// Removes an entry by key. Returns false if nothing was stored.
    pub fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Drops every entry. Counters are left untouched.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.lru.remove(key);
            self.telemetry.record_expiration();
        }

        expired_keys.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let memory_usage = self.entries.values().map(|e| e.size_estimate).sum();
        self.telemetry.snapshot(self.entries.len(), memory_usage)
    }

    /// Zeroes every counter.
    pub fn reset_stats(&mut self) {
        self.telemetry.reset();
    }

    pub(crate) fn telemetry_mut(&mut self) -> &mut Telemetry {
        &mut self.telemetry
    }

    // == Inspection ==
    /// Returns the entry for `key` without touching recency or counters.
    ///
    /// Expired entries that have not been purged yet are still returned.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    /// Checks presence without touching recency or counters.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
