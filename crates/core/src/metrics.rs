//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Reconciliation (stream outcomes, cache hits, suppressed failures)
//! - Remote source calls
//! - Query coordination (debounced dispatches, cancellations)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Reconciliation
// =============================================================================

/// Terminal outcome of a reconciliation stream.
pub static RECONCILE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cinecache_reconcile_outcomes_total",
            "Reconciliation stream outcomes",
        ),
        &["operation", "source"], // operation: "trending" | "search"; source: "network" | "cache" | "error"
    )
    .unwrap()
});

/// Cached trending lists shown before the network answered.
pub static CACHE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinecache_trending_cache_hits_total",
        "Trending reads answered from cache first",
    )
    .unwrap()
});

/// Network failures hidden because cached data was already shown.
pub static SUPPRESSED_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinecache_suppressed_failures_total",
        "Network failures suppressed by a cache hit",
    )
    .unwrap()
});

/// Rows removed by age-based eviction.
pub static EVICTED_ROWS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinecache_evicted_rows_total",
        "Cached movies removed by eviction",
    )
    .unwrap()
});

// =============================================================================
// Remote source
// =============================================================================

/// Remote call duration in seconds.
pub static REMOTE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cinecache_remote_duration_seconds",
            "Remote source call duration",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// Remote calls by operation and result.
pub static REMOTE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cinecache_remote_requests_total", "Remote source calls"),
        &["operation", "result"], // result: "success" | "failure"
    )
    .unwrap()
});

// =============================================================================
// Query coordination
// =============================================================================

/// Tasks started by coordinators.
pub static COORDINATOR_DISPATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cinecache_coordinator_dispatches_total",
            "Tasks started by query coordinators",
        ),
        &["kind"], // "search" | "trending"
    )
    .unwrap()
});

/// In-flight tasks cancelled by a newer one.
pub static COORDINATOR_CANCELLATIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinecache_coordinator_cancellations_total",
        "In-flight tasks superseded by a newer task",
    )
    .unwrap()
});

/// All core metrics, for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Reconciliation
        Box::new(RECONCILE_OUTCOMES.clone()),
        Box::new(CACHE_HITS.clone()),
        Box::new(SUPPRESSED_FAILURES.clone()),
        Box::new(EVICTED_ROWS.clone()),
        // Remote
        Box::new(REMOTE_DURATION.clone()),
        Box::new(REMOTE_REQUESTS.clone()),
        // Coordination
        Box::new(COORDINATOR_DISPATCHES.clone()),
        Box::new(COORDINATOR_CANCELLATIONS.clone()),
    ]
}
