//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cache instance.
//!
//! # Tasks
//! - TTL Reaper: Removes expired cache entries at the configured interval

mod reaper;

pub(crate) use reaper::spawn_reaper;
