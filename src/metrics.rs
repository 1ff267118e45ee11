// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus self-metrics for the metrics gateway.
//!
//! This module provides metrics collection with the namespace prefix `metrics_gateway_`.
//!
//! # Metrics Categories
//!
//! - **Request Metrics** - Inbound operations and their outcomes
//! - **Error Metrics** - Failures by stable error kind
//! - **Backend Metrics** - Calls made through tunnels to remote backends
//! - **Tunnel Metrics** - Currently open tunnel leases
//!
//! # Example
//!
//! ```rust,no_run
//! use metrics_gateway::metrics::record_request_success;
//!
//! record_request_success("query_cluster", std::time::Duration::from_millis(120));
//! ```

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all gateway metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "metrics_gateway";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Request Metrics
// ============================================================================

/// Total number of inbound requests by operation and outcome
///
/// Labels:
/// - `operation`: `query_cluster`, `query_project`, `list_cluster_names`, `list_project_names`
/// - `outcome`: `success`, `empty`, `error`
pub static REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requests_total"),
        "Total number of requests by operation and outcome",
    );
    let counter = CounterVec::new(opts, &["operation", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of requests in seconds
///
/// Labels:
/// - `operation`: Inbound operation
pub static REQUEST_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_request_duration_seconds"),
        "Duration of requests in seconds by operation",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by operation and error kind
///
/// Labels:
/// - `operation`: Inbound operation
/// - `kind`: Stable error kind (e.g., `BackendTimeout`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by operation and error kind",
    );
    let counter = CounterVec::new(opts, &["operation", "kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Backend Metrics
// ============================================================================

/// Total number of backend calls by endpoint and outcome
///
/// Labels:
/// - `endpoint`: `query_range` or `label_values`
/// - `outcome`: `success` or the error kind
pub static BACKEND_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_backend_requests_total"),
        "Total number of backend calls by endpoint and outcome",
    );
    let counter = CounterVec::new(opts, &["endpoint", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Tunnel Metrics
// ============================================================================

/// Number of tunnel leases currently held
pub static TUNNELS_ACTIVE: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new(
        format!("{METRICS_NAMESPACE}_tunnels_active"),
        "Number of tunnel leases currently held",
    )
    .unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful request
///
/// # Arguments
/// * `operation` - The inbound operation
/// * `duration` - Duration of the request
pub fn record_request_success(operation: &str, duration: Duration) {
    record_request(operation, "success", duration);
}

/// Record a successful range query that returned no series
pub fn record_request_empty(operation: &str, duration: Duration) {
    record_request(operation, "empty", duration);
}

/// Record a failed request
///
/// # Arguments
/// * `operation` - The inbound operation
/// * `kind` - Stable error kind
/// * `duration` - Duration of the request before failure
pub fn record_request_error(operation: &str, kind: &str, duration: Duration) {
    record_request(operation, "error", duration);
    ERRORS_TOTAL.with_label_values(&[operation, kind]).inc();
}

fn record_request(operation: &str, outcome: &str, duration: Duration) {
    REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record a call to a remote backend
///
/// # Arguments
/// * `endpoint` - `query_range` or `label_values`
/// * `outcome` - `success` or the error kind
pub fn record_backend_request(endpoint: &str, outcome: &str) {
    BACKEND_REQUESTS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
