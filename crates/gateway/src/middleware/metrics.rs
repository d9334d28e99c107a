//! Per-request metrics

use axum::{extract::Request, middleware::Next, response::Response};
use textspace_common::metrics::RequestMetrics;

/// Record count and latency of every function call
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let metrics = RequestMetrics::start(request.method().as_str(), request.uri().path());

    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());

    response
}
