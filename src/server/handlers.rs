// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP route handlers.
//!
//! Time parameters are resolved before anything touches the registry, the identity
//! service or a tunnel, so a malformed window never costs a network call.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::types::{
    ApiError, ClusterMetricNamesInput, MetricNamesOutput, ProjectMetricNamesInput,
    QueryClusterInput, QueryMetricOutput, QueryProjectInput,
};
use crate::backend::SeriesResult;
use crate::context::Context;
use crate::errors::{GatewayError, Result};
use crate::metrics;
use crate::scope::Scope;

const OP_QUERY_CLUSTER: &str = "query_cluster";
const OP_QUERY_PROJECT: &str = "query_project";
const OP_LIST_CLUSTER_NAMES: &str = "list_cluster_names";
const OP_LIST_PROJECT_NAMES: &str = "list_project_names";

/// Handle POST /v3/actions/querycluster
pub async fn handle_query_cluster(
    State(ctx): State<Context>,
    payload: std::result::Result<Json<QueryClusterInput>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result: Result<SeriesResult> = async {
        let Json(input) = payload.map_err(bad_body)?;
        let window = ctx
            .time_windows
            .resolve(&input.from, &input.to, &input.interval)?;
        ctx.executor
            .execute(Scope::cluster(input.cluster_name), window, input.expr)
            .await
    }
    .await;
    query_response(OP_QUERY_CLUSTER, started, result)
}

/// Handle POST /v3/actions/queryproject
pub async fn handle_query_project(
    State(ctx): State<Context>,
    payload: std::result::Result<Json<QueryProjectInput>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result: Result<SeriesResult> = async {
        let Json(input) = payload.map_err(bad_body)?;
        let window = ctx
            .time_windows
            .resolve(&input.from, &input.to, &input.interval)?;
        ctx.executor
            .execute(
                Scope::from_project_ref(&input.project_name),
                window,
                input.expr,
            )
            .await
    }
    .await;
    query_response(OP_QUERY_PROJECT, started, result)
}

/// Handle POST /v3/actions/listclustermetricname
pub async fn handle_list_cluster_metric_names(
    State(ctx): State<Context>,
    payload: std::result::Result<Json<ClusterMetricNamesInput>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result: Result<Vec<String>> = async {
        let Json(input) = payload.map_err(bad_body)?;
        ctx.catalog
            .list_cluster_metric_names(&input.cluster_name)
            .await
    }
    .await;
    names_response(OP_LIST_CLUSTER_NAMES, started, result)
}

/// Handle POST /v3/actions/listprojectmetricname
pub async fn handle_list_project_metric_names(
    State(ctx): State<Context>,
    payload: std::result::Result<Json<ProjectMetricNamesInput>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result: Result<Vec<String>> = async {
        let Json(input) = payload.map_err(bad_body)?;
        let scope = Scope::from_project_ref(&input.project_name);
        ctx.catalog
            .list_project_metric_names(
                scope.cluster_id(),
                scope.project_id().unwrap_or_default(),
            )
            .await
    }
    .await;
    names_response(OP_LIST_PROJECT_NAMES, started, result)
}

/// Handle GET /metrics
pub async fn handle_metrics() -> Response {
    match metrics::gather_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handle GET /healthz
pub async fn handle_healthz() -> &'static str {
    "ok"
}

fn bad_body(rejection: JsonRejection) -> GatewayError {
    GatewayError::invalid_input(format!("invalid request body: {}", rejection.body_text()))
}

/// Render a range query outcome. An empty result is `204 No Content`.
fn query_response(operation: &str, started: Instant, result: Result<SeriesResult>) -> Response {
    match result {
        Ok(series) if series.is_empty() => {
            metrics::record_request_empty(operation, started.elapsed());
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(series) => {
            metrics::record_request_success(operation, started.elapsed());
            Json(QueryMetricOutput::new(series)).into_response()
        }
        Err(e) => error_response(operation, started, e),
    }
}

fn names_response(operation: &str, started: Instant, result: Result<Vec<String>>) -> Response {
    match result {
        Ok(names) => {
            metrics::record_request_success(operation, started.elapsed());
            Json(MetricNamesOutput::new(names)).into_response()
        }
        Err(e) => error_response(operation, started, e),
    }
}

fn error_response(operation: &str, started: Instant, err: GatewayError) -> Response {
    metrics::record_request_error(operation, err.kind(), started.elapsed());
    ApiError(err).into_response()
}
