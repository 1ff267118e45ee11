// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Metrics Gateway - Cross-Cluster Metrics Queries for Kubernetes
//!
//! The metrics gateway answers metric queries for workload clusters the control plane
//! cannot route to. Each request is scoped to a whole cluster or to one project inside
//! it, and flows through a fixed pipeline:
//!
//! 1. Resolve the time window (`from`, `to`, `interval`)
//! 2. Resolve the scope to a remote cluster, a backend service and a service account
//! 3. Mint a short-lived token for that service account inside the remote cluster
//! 4. Dial a tunnel into the remote cluster and query the Prometheus backend
//!
//! Project metric-name listings query the project backend and the cluster backend
//! concurrently and merge the results.
//!
//! ## Modules
//!
//! - [`time_window`] - Time window parsing and defaults
//! - [`registry`] - Remote cluster lookup
//! - [`scope`] - Scopes, backend naming and scope resolution
//! - [`credentials`] - Service account tokens via `TokenRequest`
//! - [`tunnel`] - Tunneled transports and leases
//! - [`backend`] - Prometheus HTTP API client
//! - [`executor`] - Range query pipeline
//! - [`catalog`] - Metric-name listings and merging
//! - [`context`] - Wiring shared by all handlers
//! - [`server`] - Inbound HTTP API
//!
//! ## Example
//!
//! ```rust,no_run
//! use metrics_gateway::config::GatewayConfig;
//! use metrics_gateway::context::Context;
//! use metrics_gateway::scope::Scope;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = GatewayConfig::load(None)?;
//! let ctx = Context::from_config(&config);
//!
//! let window = ctx.time_windows.resolve("now-1h", "now", "")?;
//! let series = ctx
//!     .executor
//!     .execute(Scope::cluster("c-abc12"), window, "up")
//!     .await?;
//! println!("{} series", series.len());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod context;
pub mod credentials;
pub mod errors;
pub mod executor;
pub mod http_errors;
pub mod metrics;
pub mod registry;
pub mod scope;
pub mod server;
pub mod time_window;
pub mod tunnel;

#[cfg(test)]
mod catalog_tests;
#[cfg(test)]
mod credentials_tests;
#[cfg(test)]
mod errors_tests;
