//! Configuration Module
//!
//! Handles loading and validating cache configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Environment variable holding the maximum entry count.
pub const ENV_MAX_SIZE: &str = "CACHE_MAX_SIZE";
/// Environment variable holding the default TTL in milliseconds.
pub const ENV_TTL_MS: &str = "CACHE_TTL_MS";
/// Environment variable holding the reaper interval in milliseconds.
pub const ENV_CLEANUP_INTERVAL_MS: &str = "CACHE_CLEANUP_INTERVAL_MS";

const DEFAULT_MAX_SIZE: usize = 1000;
const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60 * 1000;

/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold (0 disables caching)
    pub max_size: usize,
    /// Default TTL for entries stored without an explicit TTL
    pub ttl: Duration,
    /// Interval between background reaper passes
    pub cleanup_interval: Duration,
}

impl CacheConfig {
    // == Constructor ==
    /// Creates a validated configuration.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries
    /// * `ttl` - Default TTL, must be non-zero
    /// * `cleanup_interval` - Reaper cadence, must be non-zero
    pub fn new(max_size: usize, ttl: Duration, cleanup_interval: Duration) -> Result<Self> {
        let config = Self {
            max_size,
            ttl,
            cleanup_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates a configuration by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Reaper interval in milliseconds (default: 60000)
    ///
    /// Unset variables fall back to their defaults; values that are set but
    /// do not parse are rejected.
    pub fn from_env() -> Result<Self> {
        let max_size = env_or(ENV_MAX_SIZE, DEFAULT_MAX_SIZE)?;
        let ttl_ms = env_or(ENV_TTL_MS, DEFAULT_TTL_MS)?;
        let cleanup_ms = env_or(ENV_CLEANUP_INTERVAL_MS, DEFAULT_CLEANUP_INTERVAL_MS)?;

        Self::new(
            max_size,
            Duration::from_millis(ttl_ms),
            Duration::from_millis(cleanup_ms),
        )
    }

    // == Validate ==
    /// Rejects zero TTL and zero cleanup interval.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig(
                "ttl must be a positive duration".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval must be a positive duration".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: Duration::from_millis(DEFAULT_TTL_MS),
            cleanup_interval: Duration::from_millis(DEFAULT_CLEANUP_INTERVAL_MS),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            CacheError::InvalidConfig(format!("{} has an invalid value: {:?}", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
