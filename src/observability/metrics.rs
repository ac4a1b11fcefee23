//! Request metrics.
//!
//! # Metrics
//! - `server_request_total` (counter): by endpoint, status (success/failure), code
//! - `server_request_inflight` (gauge): requests currently executing, by endpoint
//! - `server_request_duration_seconds` (histogram): latency by endpoint
//! - `server_request_latency_microseconds` (histogram): latency by endpoint
//!
//! A response is a failure when its status is above 399.

use std::time::Duration;

use axum::http::StatusCode;

pub const SERVER_REQUEST_TOTAL: &str = "server_request_total";
pub const SERVER_REQUEST_INFLIGHT: &str = "server_request_inflight";
pub const SERVER_REQUEST_DURATION_SECONDS: &str = "server_request_duration_seconds";
pub const SERVER_REQUEST_LATENCY_MICROSECONDS: &str = "server_request_latency_microseconds";

/// `success` or `failure` label for a status.
pub fn outcome(status: StatusCode) -> &'static str {
    if status.as_u16() > 399 {
        "failure"
    } else {
        "success"
    }
}

/// Record a completed request.
pub fn record_request(endpoint: &str, status: StatusCode, elapsed: Duration) {
    metrics::counter!(
        SERVER_REQUEST_TOTAL,
        "endpoint" => endpoint.to_string(),
        "status" => outcome(status),
        "code" => status.as_u16().to_string()
    )
    .increment(1);

    metrics::histogram!(SERVER_REQUEST_DURATION_SECONDS, "endpoint" => endpoint.to_string())
        .record(elapsed.as_secs_f64());
    metrics::histogram!(SERVER_REQUEST_LATENCY_MICROSECONDS, "endpoint" => endpoint.to_string())
        .record(elapsed.as_micros() as f64);
}

/// Holds one unit of the in-flight gauge until dropped.
#[derive(Debug)]
pub struct InflightGuard {
    endpoint: String,
}

impl InflightGuard {
    pub fn new(endpoint: &str) -> Self {
        metrics::gauge!(SERVER_REQUEST_INFLIGHT, "endpoint" => endpoint.to_string()).increment(1.0);
        Self {
            endpoint: endpoint.to_string(),
        }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        metrics::gauge!(SERVER_REQUEST_INFLIGHT, "endpoint" => self.endpoint.clone()).decrement(1.0);
    }
}
