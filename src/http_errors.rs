// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP status mapping for responses from a remote metrics backend.
//!
//! The backend sits behind a tunnel, so a non-success status may come from the
//! backend itself or from the proxy terminating the tunnel inside the remote
//! cluster. This module turns both into a [`GatewayError`].
//!
//! # Usage
//!
//! ```rust
//! use metrics_gateway::http_errors::map_backend_status;
//!
//! let endpoint = "cattle-prometheus/access-prometheus";
//! let err = map_backend_status(400, "c1", endpoint, "parse error", 30_000);
//! assert_eq!(err.kind(), "BackendQueryError");
//!
//! let err = map_backend_status(503, "c1", endpoint, "", 30_000);
//! assert_eq!(err.kind(), "BackendUnreachable");
//! ```

use crate::errors::GatewayError;

/// Map a backend HTTP status code to a gateway error.
///
/// # Arguments
///
/// * `status_code` - HTTP status code returned through the tunnel
/// * `cluster_id` - Remote cluster hosting the backend
/// * `endpoint` - Backend service as `namespace/name`
/// * `detail` - Backend-provided error text, may be empty
/// * `timeout_ms` - Request budget, reported when the proxy gave up waiting
///
/// # HTTP Code Mapping
///
/// | HTTP Code | Kind | Meaning |
/// |-----------|------|---------|
/// | 400 | `BackendQueryError` | Malformed expression or parameters |
/// | 401 | `BackendQueryError` | Credential rejected |
/// | 403 | `BackendQueryError` | Credential lacks permission |
/// | 404 | `BackendUnreachable` | No backend behind the target service |
/// | 422 | `BackendQueryError` | Expression failed to execute |
/// | 502 | `BackendUnreachable` | Tunnel could not reach the service |
/// | 503 | `BackendUnreachable` | Backend unavailable |
/// | 504 | `BackendTimeout` | Backend or proxy timed out |
/// | Other | `BackendQueryError` | Unexpected response |
#[must_use]
pub fn map_backend_status(
    status_code: u16,
    cluster_id: &str,
    endpoint: &str,
    detail: &str,
    timeout_ms: u64,
) -> GatewayError {
    let with_detail = |summary: String| {
        if detail.is_empty() {
            summary
        } else {
            format!("{summary}: {detail}")
        }
    };

    match status_code {
        400 | 422 => GatewayError::BackendQueryError {
            endpoint: endpoint.to_string(),
            reason: with_detail(format!("query rejected (HTTP {status_code})")),
        },
        401 | 403 => GatewayError::BackendQueryError {
            endpoint: endpoint.to_string(),
            reason: with_detail(format!("credential rejected (HTTP {status_code})")),
        },
        404 | 502 | 503 => GatewayError::BackendUnreachable {
            cluster_id: cluster_id.to_string(),
            endpoint: endpoint.to_string(),
            reason: with_detail(format!("backend unavailable (HTTP {status_code})")),
        },
        504 => GatewayError::BackendTimeout {
            endpoint: endpoint.to_string(),
            timeout_ms,
        },
        _ => GatewayError::BackendQueryError {
            endpoint: endpoint.to_string(),
            reason: with_detail(format!("unexpected response (HTTP {status_code})")),
        },
    }
}

/// Map a transport error raised by the HTTP client to a gateway error.
///
/// Timeouts become [`GatewayError::BackendTimeout`], body decoding problems become
/// [`GatewayError::BackendQueryError`] and everything else (connect failures, proxy
/// refusals, broken streams) becomes [`GatewayError::BackendUnreachable`].
#[must_use]
pub fn map_transport_error(
    err: &reqwest::Error,
    cluster_id: &str,
    endpoint: &str,
    timeout_ms: u64,
) -> GatewayError {
    if err.is_timeout() {
        GatewayError::BackendTimeout {
            endpoint: endpoint.to_string(),
            timeout_ms,
        }
    } else if err.is_decode() {
        GatewayError::BackendQueryError {
            endpoint: endpoint.to_string(),
            reason: format!("malformed response: {err}"),
        }
    } else {
        GatewayError::BackendUnreachable {
            cluster_id: cluster_id.to_string(),
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    }
}
