//! calc_cache demo runner
//!
//! Runs a simulated cost estimator through the memoization cache and reports
//! the resulting telemetry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use calc_cache::{Cache, CacheConfig};

/// Inputs of the simulated renovation cost estimator.
#[derive(Debug, Clone, Serialize)]
struct EstimateInputs {
    area_m2: f64,
    material: String,
    labor_rate: f64,
}

/// Output of the simulated estimator.
#[derive(Debug, Clone, Serialize)]
struct CostEstimate {
    materials: f64,
    labor: f64,
    total: f64,
}

/// Stand-in for an expensive calculator run.
async fn estimate_cost(
    inputs: EstimateInputs,
    runs: Arc<AtomicUsize>,
) -> anyhow::Result<CostEstimate> {
    runs.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(250)).await;

    let unit_price = match inputs.material.as_str() {
        "oak" => 85.0,
        "tile" => 42.0,
        "vinyl" => 19.5,
        other => anyhow::bail!("no price list for material '{}'", other),
    };
    let materials = inputs.area_m2 * unit_price;
    let labor = inputs.area_m2 * 0.6 * inputs.labor_rate;

    Ok(CostEstimate {
        materials,
        labor,
        total: materials + labor,
    })
}

/// Entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache (starts the TTL reaper)
/// 4. Fire duplicate and distinct estimator requests concurrently
/// 5. Log the cache statistics and stop the reaper
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calc_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env().context("loading cache configuration")?;
    info!(
        "Configuration loaded: max_size={}, ttl={:?}, cleanup_interval={:?}",
        config.max_size, config.ttl, config.cleanup_interval
    );

    let cache: Arc<Cache<CostEstimate>> = Arc::new(Cache::new(config)?);
    let runs = Arc::new(AtomicUsize::new(0));

    let requests = vec![
        ("oak", 32.0),
        ("oak", 32.0),
        ("tile", 12.5),
        ("oak", 32.0),
        ("vinyl", 48.0),
        ("tile", 12.5),
        ("marble", 10.0),
    ];

    let mut tasks = Vec::with_capacity(requests.len());
    for (material, area_m2) in requests {
        let cache = Arc::clone(&cache);
        let runs = Arc::clone(&runs);
        let inputs = EstimateInputs {
            area_m2,
            material: material.to_string(),
            labor_rate: 38.0,
        };

        tasks.push(tokio::spawn(async move {
            let compute_inputs = inputs.clone();
            let result = cache
                .memoize("renovation-cost", &inputs, move || {
                    estimate_cost(compute_inputs, runs)
                })
                .await;
            (inputs, result)
        }));
    }

    for task in tasks {
        let (inputs, result) = task.await.context("estimator task panicked")?;
        match result {
            Ok(estimate) => info!(
                material = %inputs.material,
                area_m2 = inputs.area_m2,
                total = estimate.total,
                "estimate ready"
            ),
            Err(err) => info!(material = %inputs.material, error = %err, "estimate failed"),
        }
    }

    // Second pass is served from the cache
    let repeat = EstimateInputs {
        area_m2: 32.0,
        material: "oak".to_string(),
        labor_rate: 38.0,
    };
    let runs_for_repeat = Arc::clone(&runs);
    let repeat_inputs = repeat.clone();
    cache
        .memoize("renovation-cost", &repeat, move || {
            estimate_cost(repeat_inputs, runs_for_repeat)
        })
        .await?;

    let stats = cache.stats();
    info!(
        calculator_runs = runs.load(Ordering::SeqCst),
        "Cache stats: {}",
        serde_json::to_string(&stats)?
    );

    if let Ok(mut cache) = Arc::try_unwrap(cache) {
        cache.shutdown();
    }
    info!("Demo complete");

    Ok(())
}
