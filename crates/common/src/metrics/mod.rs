//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Textspace metrics
pub const METRICS_PREFIX: &str = "textspace";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 25ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms - P50 target
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    5.000,  // 5s
    60.00,  // request timeout
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of function calls"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Function call latency in seconds"
    );

    // Record metrics
    describe_counter!(
        format!("{}_records_created_total", METRICS_PREFIX),
        Unit::Count,
        "Texts and comments created"
    );

    describe_counter!(
        format!("{}_records_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Texts and comments deleted"
    );

    // Auth metrics
    describe_counter!(
        format!("{}_workspace_tokens_issued_total", METRICS_PREFIX),
        Unit::Count,
        "Workspace tokens issued or refreshed"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a created text or comment
pub fn record_created(kind: &'static str) {
    counter!(
        format!("{}_records_created_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}

/// Record a deleted text or comment
pub fn record_deleted(kind: &'static str) {
    counter!(
        format!("{}_records_deleted_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}

/// Record workspace tokens handed out
pub fn record_tokens_issued(count: usize, reason: &'static str) {
    counter!(
        format!("{}_workspace_tokens_issued_total", METRICS_PREFIX),
        "reason" => reason
    )
    .increment(count as u64);
}
