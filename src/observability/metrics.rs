//! Metrics collection and exposition.
//!
//! # Metrics
//! - `favicon_requests_total` (counter): requests by outcome code
//! - `favicon_request_duration_seconds` (histogram): latency by outcome code
//! - `favicon_rate_limited_total` (counter): requests rejected by the limiter

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished `/favicon` request.
pub fn record_request(code: &'static str, start: Instant) {
    counter!("favicon_requests_total", "code" => code).increment(1);
    histogram!("favicon_request_duration_seconds", "code" => code)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("favicon_rate_limited_total").increment(1);
}
