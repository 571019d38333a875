//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the cinecache server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket session metrics
//! - Cache size and connectivity (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tracing::error;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cinecache_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cinecache_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "cinecache_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket sessions.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "cinecache_ws_connections_active",
        "Number of active WebSocket sessions",
    )
    .unwrap()
});

/// Total WebSocket sessions (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinecache_ws_connections_total",
        "Total WebSocket sessions since startup",
    )
    .unwrap()
});

/// State snapshots pushed to clients.
pub static WS_STATES_SENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinecache_ws_states_sent_total",
        "List state snapshots pushed to WebSocket clients",
    )
    .unwrap()
});

/// Client messages received, by type.
pub static WS_MESSAGES_RECEIVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cinecache_ws_messages_received_total",
            "WebSocket client messages received",
        ),
        &["type"],
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics
// =============================================================================

/// Movies currently cached (collected dynamically).
pub static CACHED_MOVIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("cinecache_cached_movies", "Number of cached movies").unwrap()
});

/// 1 when the remote source is reachable (collected dynamically).
pub static ONLINE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("cinecache_online", "Whether the remote source is reachable").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        // WebSocket
        Box::new(WS_CONNECTIONS_ACTIVE.clone()),
        Box::new(WS_CONNECTIONS_TOTAL.clone()),
        Box::new(WS_STATES_SENT.clone()),
        Box::new(WS_MESSAGES_RECEIVED.clone()),
        // Cache
        Box::new(CACHED_MOVIES.clone()),
        Box::new(ONLINE.clone()),
    ];

    // Core metrics (reconciliation, remote source, coordination)
    for collector in collectors
        .into_iter()
        .chain(cinecache_core::metrics::all_metrics())
    {
        if let Err(e) = registry.register(collector) {
            error!("Failed to register metric: {}", e);
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current
/// values from the cache and the connectivity monitor.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(count) = state.cache().count() {
        CACHED_MOVIES.set(count as i64);
    }
    ONLINE.set(if state.connectivity().is_online() { 1 } else { 0 });
}

/// Normalize a path for metric labels (replace ids and free text with
/// placeholders).
pub fn normalize_path(path: &str) -> String {
    let mut normalized = Vec::new();
    let mut previous = "";
    for segment in path.split('/') {
        let replaced = if previous == "history" && !segment.is_empty() {
            "{query}"
        } else if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            "{id}"
        } else {
            segment
        };
        normalized.push(replaced);
        previous = segment;
    }
    normalized.join("/")
}
