// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the metrics gateway.
//!
//! This module contains the naming conventions, defaults and limits used throughout
//! the codebase. Every value here can be overridden through [`crate::config::GatewayConfig`];
//! the constants only supply the defaults.

// ============================================================================
// Backend Naming Conventions
// ============================================================================

/// Namespace holding the cluster-level monitoring stack
pub const CLUSTER_MONITORING_NAMESPACE: &str = "cattle-prometheus";

/// `ServiceAccount` used to authenticate against the cluster-level backend
pub const CLUSTER_MONITORING_SERVICE_ACCOUNT: &str = "cluster-monitoring";

/// Prefix of the per-project monitoring namespace (`<prefix>-<projectID>`)
pub const PROJECT_MONITORING_NAMESPACE_PREFIX: &str = "cattle-prometheus";

/// `ServiceAccount` used to authenticate against a project-level backend
pub const PROJECT_MONITORING_SERVICE_ACCOUNT: &str = "project-monitoring";

/// Service fronting both the cluster and project Prometheus instances
pub const PROMETHEUS_SERVICE_NAME: &str = "access-prometheus";

/// Port of the Prometheus access service
pub const PROMETHEUS_SERVICE_PORT: u16 = 80;

/// Scheme used to talk to the backend once inside the remote cluster
pub const PROMETHEUS_SERVICE_SCHEME: &str = "http";

/// Separator between cluster and project in a project identifier (`c1:p1`)
pub const PROJECT_ID_SEPARATOR: char = ':';

/// Label whose values enumerate metric names
pub const METRIC_NAME_LABEL: &str = "__name__";

// ============================================================================
// Time Window Defaults
// ============================================================================

/// Default lookback when the caller omits `from` (5 minutes)
pub const DEFAULT_LOOKBACK_SECS: u64 = 300;

/// Number of samples a derived step aims for across the window
pub const DEFAULT_SAMPLE_BUDGET: u32 = 60;

/// Lower bound for a derived step (5 seconds)
pub const DEFAULT_MIN_STEP_SECS: u64 = 5;

/// Relative timestamp anchor understood by the time window resolver
pub const TIME_NOW: &str = "now";

// ============================================================================
// Request Handling Constants
// ============================================================================

/// Deadline covering a whole request, from scope resolution to the backend reply
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest accepted request deadline
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Requested lifetime of a minted `ServiceAccount` token (Kubernetes minimum)
pub const DEFAULT_TOKEN_EXPIRATION_SECS: i64 = 600;

/// `ServiceAccount` subresource used to mint tokens
pub const SERVICE_ACCOUNT_TOKEN_SUBRESOURCE: &str = "token";

// ============================================================================
// HTTP Server Constants
// ============================================================================

/// Default bind address of the gateway HTTP server
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_PATH: &str = "/healthz";

/// Response `type` of a range query
pub const QUERY_OUTPUT_TYPE: &str = "queryMetricOutput";

/// Response `type` of a metric name listing
pub const METRIC_NAMES_OUTPUT_TYPE: &str = "metricNamesOutput";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Hex characters of a token's SHA-256 shown in logs
pub const TOKEN_FINGERPRINT_LEN: usize = 12;

/// Crate version reported by `--version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
