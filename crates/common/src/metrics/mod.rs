//! Metrics and observability utilities
//!
//! Prometheus metrics for the ranking service with standardized naming.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all fedirank metrics
pub const METRICS_PREFIX: &str = "fedirank";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_candidates_ranked_total", METRICS_PREFIX),
        Unit::Count,
        "Total candidates aggregated or ranked"
    );

    describe_counter!(
        format!("{}_source_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Data source fetches degraded to a zero payload"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Embedding reads served without calling the remote service"
    );

    describe_counter!(
        format!("{}_embedding_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Embedding reads that reached the remote service"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16, candidates: usize) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        counter!(
            format!("{}_candidates_ranked_total", METRICS_PREFIX),
            "endpoint" => self.endpoint.clone()
        )
        .increment(candidates as u64);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a data source fetch that degraded to a zero payload
pub fn record_source_failure(source: &'static str) {
    counter!(
        format!("{}_source_failures_total", METRICS_PREFIX),
        "source" => source
    )
    .increment(1);
}

/// Record an embedding service request
pub fn record_embedding(duration_secs: f64, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "status" => status,
        "batch" => batch_size.to_string()
    )
    .increment(1);

    if success {
        histogram!(format!("{}_embedding_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    }
}

/// Record an embedding cache read at the given tier
pub fn record_cache(hit: bool, tier: &'static str) {
    if hit {
        counter!(
            format!("{}_embedding_cache_hits_total", METRICS_PREFIX),
            "tier" => tier
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_embedding_cache_misses_total", METRICS_PREFIX),
            "tier" => tier
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("/get_rankings");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(200, 3);
        // Just verify it runs without panic
    }
}
