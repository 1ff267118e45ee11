// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Client for a metrics backend reached through a tunnel.
//!
//! A [`BackendClient`] is built per request from a dialed [`TunnelConnection`], the
//! resolved [`BackendTarget`], a freshly minted [`Credential`] and the request deadline.
//! It speaks the Prometheus HTTP API:
//!
//! - `GET /api/v1/query_range` for [`BackendClient::query_range`]
//! - `GET /api/v1/label/<name>/values` for [`BackendClient::label_values`]
//!
//! Every call is bounded by the deadline. When the client is dropped its tunnel lease
//! goes with it.
//!
//! # Errors
//!
//! - [`GatewayError::BackendUnreachable`] - transport or tunnel failure
//! - [`GatewayError::BackendQueryError`] - the backend rejected the query or replied garbage
//! - [`GatewayError::BackendTimeout`] - the deadline expired

pub mod types;

pub use types::{QuerySpec, Sample, Series, SeriesResult};

use std::time::Duration;

use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::credentials::Credential;
use crate::errors::{GatewayError, Result};
use crate::http_errors::{map_backend_status, map_transport_error};
use crate::metrics;
use crate::scope::BackendTarget;
use crate::tunnel::TunnelConnection;
use types::{ApiEnvelope, ApiErrorBody, ApiRangeData};

/// Result type Prometheus uses for range queries
const RESULT_TYPE_MATRIX: &str = "matrix";

/// Envelope status of a successful response
const STATUS_SUCCESS: &str = "success";

/// Longest slice of a non-JSON error body carried into an error message
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Range-query and label-value client for one backend, valid for one request.
#[derive(Debug)]
pub struct BackendClient {
    connection: TunnelConnection,
    target: BackendTarget,
    credential: Credential,
    deadline: Instant,
    /// Configured request timeout, reported when `deadline` expires
    timeout: Duration,
}

impl BackendClient {
    #[must_use]
    pub fn new(
        connection: TunnelConnection,
        target: BackendTarget,
        credential: Credential,
        deadline: Instant,
        timeout: Duration,
    ) -> Self {
        Self {
            connection,
            target,
            credential,
            deadline,
            timeout,
        }
    }

    #[must_use]
    pub fn target(&self) -> &BackendTarget {
        &self.target
    }

    /// Run a range query.
    ///
    /// An empty result is returned as an empty [`SeriesResult`], never as an error.
    ///
    /// # Errors
    ///
    /// See the module documentation.
    pub async fn query_range(&self, spec: &QuerySpec) -> Result<SeriesResult> {
        let url = self.endpoint_url(&["api", "v1", "query_range"])?;
        let params = [
            ("query", spec.expression.clone()),
            (
                "start",
                spec.window
                    .start
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (
                "end",
                spec.window.end.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            ("step", spec.window.step_seconds.to_string()),
        ];

        let data: ApiRangeData = self.get("query_range", url, &params).await?;
        if data.result_type != RESULT_TYPE_MATRIX {
            return Err(self.query_error(format!(
                "expected a {RESULT_TYPE_MATRIX} result, got '{}'",
                data.result_type
            )));
        }

        let series = data
            .result
            .into_iter()
            .map(types::ApiMatrixSeries::into_series)
            .collect::<std::result::Result<SeriesResult, String>>()
            .map_err(|reason| self.query_error(reason))?;

        debug!(
            cluster_id = %self.target.remote_cluster_id,
            endpoint = %self.target.endpoint(),
            series = series.len(),
            "Range query answered"
        );
        Ok(series)
    }

    /// Fetch the distinct values of one label, in the order the backend returns them.
    ///
    /// # Errors
    ///
    /// See the module documentation.
    pub async fn label_values(&self, label: &str) -> Result<Vec<String>> {
        if label.is_empty() {
            return Err(GatewayError::invalid_input("label name is empty"));
        }
        let url = self.endpoint_url(&["api", "v1", "label", label, "values"])?;
        let values: Vec<String> = self.get("label_values", url, &[]).await?;

        debug!(
            cluster_id = %self.target.remote_cluster_id,
            endpoint = %self.target.endpoint(),
            label = %label,
            values = values.len(),
            "Label values answered"
        );
        Ok(values)
    }

    fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.connection.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::BackendUnreachable {
                cluster_id: self.target.remote_cluster_id.clone(),
                endpoint: self.target.endpoint(),
                reason: format!("tunnel base URL '{}' cannot carry a path", self.connection.base_url()),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn timeout_error(&self) -> GatewayError {
        GatewayError::BackendTimeout {
            endpoint: self.target.endpoint(),
            timeout_ms: self.timeout_ms(),
        }
    }

    fn query_error(&self, reason: String) -> GatewayError {
        GatewayError::BackendQueryError {
            endpoint: self.target.endpoint(),
            reason,
        }
    }

    /// Issue an authenticated GET and unwrap the Prometheus envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint_name: &'static str,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T> {
        let result = self.get_inner(url, params).await;
        match &result {
            Ok(_) => metrics::record_backend_request(endpoint_name, "success"),
            Err(e) => {
                warn!(
                    cluster_id = %self.target.remote_cluster_id,
                    endpoint = %self.target.endpoint(),
                    call = endpoint_name,
                    error = %e,
                    "Backend call failed"
                );
                metrics::record_backend_request(endpoint_name, e.kind());
            }
        }
        result
    }

    async fn get_inner<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T> {
        let cluster_id = &self.target.remote_cluster_id;
        let endpoint = self.target.endpoint();
        let budget_ms = self.timeout_ms();

        debug!(
            cluster_id = %cluster_id,
            url = %url,
            credential = %self.credential.fingerprint(),
            remaining = ?self.deadline.saturating_duration_since(Instant::now()),
            "Backend request"
        );

        let request = self
            .connection
            .http()
            .get(url)
            .query(params)
            .bearer_auth(self.credential.token())
            .send();

        let response = tokio::time::timeout_at(self.deadline, request)
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| map_transport_error(&e, cluster_id, &endpoint, budget_ms))?;

        let status = response.status();
        let body = tokio::time::timeout_at(self.deadline, response.text())
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| map_transport_error(&e, cluster_id, &endpoint, budget_ms))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.detail())
                .unwrap_or_else(|_| body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect());
            return Err(map_backend_status(
                status.as_u16(),
                cluster_id,
                &endpoint,
                &detail,
                budget_ms,
            ));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)
            .map_err(|e| self.query_error(format!("malformed response: {e}")))?;

        if envelope.status != STATUS_SUCCESS {
            let detail = ApiErrorBody {
                error_type: envelope.error_type,
                error: envelope.error,
            }
            .detail();
            return Err(self.query_error(if detail.is_empty() {
                format!("backend returned status '{}'", envelope.status)
            } else {
                detail
            }));
        }

        envelope
            .data
            .ok_or_else(|| self.query_error("response has no data".to_string()))
    }
}
