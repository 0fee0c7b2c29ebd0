//! Integration Tests for the Memoization Cache
//!
//! Exercises the public API end to end: direct access, coalesced
//! computations, expiry, eviction and telemetry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use calc_cache::{fingerprint, Cache, CacheConfig, CacheError};
use serde::Serialize;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

// == Helper Functions ==

fn config(max_size: usize, ttl_ms: u64, cleanup_ms: u64) -> CacheConfig {
    CacheConfig::new(
        max_size,
        Duration::from_millis(ttl_ms),
        Duration::from_millis(cleanup_ms),
    )
    .unwrap()
}

fn create_cache<V>(max_size: usize, ttl_ms: u64) -> Cache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    Cache::new(config(max_size, ttl_ms, 60_000)).unwrap()
}

// == Direct Access ==

#[tokio::test]
async fn test_set_then_get_returns_value() {
    let cache: Cache<String> = create_cache(10, 60_000);

    cache.set("bmi:{\"h\":1.8,\"w\":75}", "23.1".to_string());

    assert_eq!(
        cache.get("bmi:{\"h\":1.8,\"w\":75}").as_deref(),
        Some("23.1")
    );
}

#[tokio::test]
async fn test_lru_scenario_evicts_least_recently_accessed() {
    let cache: Cache<i32> = create_cache(2, 60_000);

    cache.set("a", 1);
    cache.set("b", 2);
    assert_eq!(cache.get("a"), Some(1));
    cache.set("c", 3);

    assert_eq!(cache.len(), 2);
    assert!(cache.contains("a"));
    assert!(!cache.contains("b"));
    assert!(cache.contains("c"));
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_scenario_expires_without_reaper() {
    let cache: Cache<String> = create_cache(10, 100);

    cache.set("x", "v".to_string());
    tokio::time::advance(Duration::from_millis(150)).await;

    assert_eq!(cache.get("x"), None);
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 0);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_ttl_overrides_default() {
    let cache: Cache<u8> = create_cache(10, 60_000);

    cache.set_with_ttl("short", 1, Duration::from_millis(20));
    cache.set("long", 2);
    tokio::time::advance(Duration::from_millis(30)).await;

    assert_eq!(cache.get("short"), None);
    assert_eq!(cache.get("long"), Some(2));
}

#[tokio::test]
async fn test_zero_ttl_entry_is_never_served() {
    let cache: Cache<u8> = create_cache(10, 60_000);

    cache.set_with_ttl("now", 1, Duration::ZERO);

    assert_eq!(cache.get("now"), None);
}

#[tokio::test]
async fn test_remove_and_clear() {
    let cache: Cache<u8> = create_cache(10, 60_000);

    cache.set("a", 1);
    cache.set("b", 2);
    assert!(cache.remove("a"));
    assert!(!cache.remove("a"));
    assert_eq!(cache.len(), 1);

    cache.get("b");
    cache.clear();
    cache.clear();

    assert!(cache.is_empty());
    let stats = cache.stats();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.memory_usage, 0);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_zero_capacity_cache_never_hits() {
    let cache: Cache<u8> = create_cache(0, 60_000);

    cache.set("a", 1);

    assert_eq!(cache.get("a"), None);
    assert!(cache.is_empty());
}

// == Telemetry ==

#[tokio::test]
async fn test_hit_rate_and_reset() {
    let cache: Cache<u8> = create_cache(10, 60_000);
    assert_eq!(cache.stats().hit_rate, 0.0);

    cache.set("a", 1);
    cache.get("a");
    cache.get("a");
    cache.get("a");
    cache.get("missing");

    let stats = cache.stats();
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate, 0.75);

    cache.reset_stats();
    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.hit_rate, 0.0);
    assert_eq!(stats.size, 1);
}

#[tokio::test]
async fn test_memory_usage_tracks_live_entries() {
    #[derive(Clone, Serialize)]
    struct Summary {
        mean: f64,
        n: u32,
    }

    let cache: Cache<Summary> = create_cache(10, 60_000);
    let summary = Summary { mean: 2.5, n: 4 };
    let size = serde_json::to_vec(&summary).unwrap().len();

    cache.set("s1", summary.clone());
    cache.set("s2", summary);
    assert_eq!(cache.stats().memory_usage, 2 * size);

    cache.remove("s1");
    assert_eq!(cache.stats().memory_usage, size);
}

// == Coalescing ==

#[tokio::test(start_paused = true)]
async fn test_concurrent_scenario_runs_slow_function_once() {
    let cache: Cache<u32> = create_cache(10, 60_000);
    let calls = Arc::new(AtomicUsize::new(0));

    let slow_fn = |calls: Arc<AtomicUsize>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            Ok(42)
        }
    };

    let (first, second) = tokio::join!(
        cache.compute_with_cache("y", slow_fn(calls.clone())),
        cache.compute_with_cache("y", slow_fn(calls.clone())),
    );

    assert_eq!(assert_ok!(first), 42);
    assert_eq!(assert_ok!(second), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get("y"), Some(42));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_spawned_callers_share_one_computation() {
    let cache: Arc<Cache<u64>> = Arc::new(create_cache(10, 60_000));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..32 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            cache
                .compute_with_cache("monte-carlo:{\"paths\":10000}", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_millis(100)).await;
                    Ok(7_777)
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 7_777);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let stats = cache.stats();
    assert_eq!(stats.misses + stats.coalesced + stats.hits, 32);
    assert_eq!(stats.misses, 1);
    assert_eq!(cache.in_flight_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_reaches_all_waiters_then_retries() {
    #[derive(Debug, thiserror::Error)]
    #[error("negative discount rate")]
    struct NegativeRate;

    let cache: Cache<f64> = create_cache(10, 60_000);
    let calls = Arc::new(AtomicUsize::new(0));

    let npv = |calls: Arc<AtomicUsize>, fail: bool| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(20)).await;
            if fail {
                Err(anyhow::Error::new(NegativeRate))
            } else {
                Ok(1_042.17)
            }
        }
    };

    let (a, b) = tokio::join!(
        cache.compute_with_cache("npv", npv(calls.clone(), true)),
        cache.compute_with_cache("npv", npv(calls.clone(), true)),
    );

    for result in [a, b] {
        let err = assert_err!(result);
        let cause = err.computation_cause().expect("computation error");
        assert!(cause.downcast_ref::<NegativeRate>().is_some());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!cache.contains("npv"));

    let value = assert_ok!(
        cache
            .compute_with_cache("npv", npv(calls.clone(), false))
            .await
    );
    assert_eq!(value, 1_042.17);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_caller_timeout_does_not_cancel_computation() {
    let cache: Cache<u32> = create_cache(10, 60_000);

    let result = tokio::time::timeout(
        Duration::from_millis(5),
        cache.compute_with_cache("regression", || async {
            sleep(Duration::from_millis(40)).await;
            Ok(99)
        }),
    )
    .await;
    assert!(result.is_err());

    sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.get("regression"), Some(99));
}

#[tokio::test]
async fn test_memoize_shares_entries_for_equal_inputs() {
    #[derive(Serialize)]
    struct Inputs {
        principal: u32,
        years: u8,
    }

    let cache: Cache<u32> = create_cache(10, 60_000);
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        let payment = cache
            .memoize(
                "loan",
                &Inputs {
                    principal: 100_000,
                    years: 15,
                },
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(791)
                },
            )
            .await;
        assert_eq!(assert_ok!(payment), 791);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let key = fingerprint("loan", &serde_json::json!({ "years": 15, "principal": 100_000 }))
        .unwrap();
    assert!(cache.contains(&key));
}

// == Reaper ==

#[tokio::test(start_paused = true)]
async fn test_reaper_purges_entries_nobody_reads() {
    let cache: Cache<u8> = Cache::new(config(10, 100, 50)).unwrap();

    cache.set("forgotten", 1);
    cache.set_with_ttl("kept", 2, Duration::from_secs(60));

    sleep(Duration::from_millis(200)).await;

    assert_eq!(cache.len(), 1);
    assert!(!cache.contains("forgotten"));
    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_purge_expired_on_demand() {
    let cache: Cache<u8> = create_cache(10, 60_000);

    cache.set_with_ttl("a", 1, Duration::ZERO);
    cache.set_with_ttl("b", 2, Duration::ZERO);
    cache.set("c", 3);

    assert_eq!(cache.purge_expired(), 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_shutdown_and_independent_instances() {
    let mut first: Cache<u8> = create_cache(10, 60_000);
    let second: Cache<u8> = create_cache(10, 60_000);

    first.set("shared-key", 1);
    assert_eq!(second.get("shared-key"), None);

    assert!(first.is_reaper_running());
    first.shutdown();
    assert!(!first.is_reaper_running());
    assert!(second.is_reaper_running());
}

// == Construction ==

#[tokio::test]
async fn test_invalid_configuration_fails_fast() {
    let bad = CacheConfig {
        max_size: 10,
        ttl: Duration::from_millis(100),
        cleanup_interval: Duration::ZERO,
    };

    let result: Result<Cache<u8>, CacheError> = Cache::new(bad);
    assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
}
