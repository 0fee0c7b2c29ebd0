//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::io;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single memoized result with its metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored computation result
    pub value: V,
    /// When the entry was stored
    pub created_at: Instant,
    /// Lifetime of the entry, counted from `created_at`
    pub ttl: Duration,
    /// Last successful read (or the store time if never read)
    pub last_accessed_at: Instant,
    /// Number of successful reads, for diagnostics only
    pub access_count: u64,
    /// Approximate serialized size of `value` in bytes
    pub size_estimate: usize,
}

impl<V: Serialize> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stored at `now`.
    ///
    /// # Arguments
    /// * `value` - The computation result
    /// * `ttl` - Lifetime of the entry
    /// * `now` - Store time, also used as the initial access time
    pub fn new(value: V, ttl: Duration, now: Instant) -> Self {
        let size_estimate = estimate_size(&value);

        Self {
            value,
            created_at: now,
            ttl,
            last_accessed_at: now,
            access_count: 0,
            size_estimate,
        }
    }
}

impl<V> CacheEntry<V> {
    // == Expiry ==
    /// Instant at which the entry stops being served.
    ///
    /// `None` when `created_at + ttl` is not representable; such entries
    /// never expire.
    pub fn expires_at(&self) -> Option<Instant> {
        self.created_at.checked_add(self.ttl)
    }

    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now >= created_at + ttl`,
    /// so a zero TTL is expired immediately.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at() {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Record Access ==
    /// Marks a successful read at `now`.
    pub fn record_access(&mut self, now: Instant) {
        self.last_accessed_at = now;
        self.access_count += 1;
    }
}

// == Size Estimation ==
/// Best-effort byte size of a value's JSON serialization.
///
/// Values that fail to serialize report 0; the estimate is used for reporting
/// only.
pub fn estimate_size<V: Serialize + ?Sized>(value: &V) -> usize {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        Err(_) => 0,
    }
}

/// Writer that only counts bytes.
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
