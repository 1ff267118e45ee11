// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Inbound HTTP API.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `POST /v3/actions/querycluster` | [`handlers::handle_query_cluster`] |
//! | `POST /v3/actions/queryproject` | [`handlers::handle_query_project`] |
//! | `POST /v3/actions/listclustermetricname` | [`handlers::handle_list_cluster_metric_names`] |
//! | `POST /v3/actions/listprojectmetricname` | [`handlers::handle_list_project_metric_names`] |
//! | `GET /metrics` | [`handlers::handle_metrics`] |
//! | `GET /healthz` | [`handlers::handle_healthz`] |

pub mod handlers;
pub mod types;

use anyhow::{Context as _, Result};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::constants::{HEALTH_PATH, METRICS_SERVER_PATH};
use crate::context::Context;
use handlers::{
    handle_healthz, handle_list_cluster_metric_names, handle_list_project_metric_names,
    handle_metrics, handle_query_cluster, handle_query_project,
};

/// Build the router with all routes bound to `ctx`.
pub fn router(ctx: Context) -> Router {
    Router::new()
        .route("/v3/actions/querycluster", post(handle_query_cluster))
        .route("/v3/actions/queryproject", post(handle_query_project))
        .route(
            "/v3/actions/listclustermetricname",
            post(handle_list_cluster_metric_names),
        )
        .route(
            "/v3/actions/listprojectmetricname",
            post(handle_list_project_metric_names),
        )
        .route(METRICS_SERVER_PATH, get(handle_metrics))
        .route(HEALTH_PATH, get(handle_healthz))
        .with_state(ctx)
}

/// Serve the API on `listen_address` until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(ctx: Context, listen_address: &str) -> Result<()> {
    let listener = TcpListener::bind(listen_address)
        .await
        .with_context(|| format!("Failed to bind {listen_address}"))?;
    info!(address = %listener.local_addr()?, "Metrics gateway listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Resolve on SIGTERM (pod termination) or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
