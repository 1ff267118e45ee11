// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Request and response bodies of the inbound API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::backend::SeriesResult;
use crate::constants::{METRIC_NAMES_OUTPUT_TYPE, QUERY_OUTPUT_TYPE};
use crate::errors::GatewayError;

/// Body of `querycluster`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryClusterInput {
    pub cluster_name: String,
    pub from: String,
    pub to: String,
    pub interval: String,
    pub expr: String,
}

/// Body of `queryproject`. `project_name` is `<clusterID>:<projectID>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryProjectInput {
    pub project_name: String,
    pub from: String,
    pub to: String,
    pub interval: String,
    pub expr: String,
}

/// Body of `listclustermetricname`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterMetricNamesInput {
    pub cluster_name: String,
}

/// Body of `listprojectmetricname`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectMetricNamesInput {
    pub project_name: String,
}

/// Successful range query with at least one series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetricOutput {
    #[serde(rename = "type")]
    pub kind: String,
    pub series: SeriesResult,
}

impl QueryMetricOutput {
    #[must_use]
    pub fn new(series: SeriesResult) -> Self {
        Self {
            kind: QUERY_OUTPUT_TYPE.to_string(),
            series,
        }
    }
}

/// Successful metric-name listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricNamesOutput {
    #[serde(rename = "type")]
    pub kind: String,
    pub names: Vec<String>,
}

impl MetricNamesOutput {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self {
            kind: METRIC_NAMES_OUTPUT_TYPE.to_string(),
            names,
        }
    }
}

/// Error body: `{type: "error", code: <kind>, message: <detail>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorOutput {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
    pub message: String,
}

/// A [`GatewayError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorOutput {
            kind: "error".to_string(),
            code: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
