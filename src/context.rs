// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all request handlers.
//!
//! Every handler receives a clone of [`Context`]. It holds no mutable state:
//! - Time window resolver with the configured defaults
//! - Query executor (scope resolver, identity service, tunnel provider, timeout)
//! - Catalog merger built on the same executor
//!
//! Collaborators are trait objects so tests can swap in fakes with [`Context::new`].

use std::sync::Arc;

use crate::catalog::CatalogMerger;
use crate::config::GatewayConfig;
use crate::credentials::{IdentityService, TokenRequestIssuer};
use crate::executor::QueryExecutor;
use crate::registry::{ClusterRegistry, StaticClusterRegistry};
use crate::scope::ScopeResolver;
use crate::time_window::TimeWindowResolver;
use crate::tunnel::{ConnectProxyTunnel, TunnelProvider};

/// Shared context passed to all handlers.
#[derive(Clone)]
pub struct Context {
    /// Parses `from`/`to`/`interval` request parameters
    pub time_windows: TimeWindowResolver,

    /// Runs range queries
    pub executor: QueryExecutor,

    /// Lists and merges metric names
    pub catalog: CatalogMerger,
}

impl Context {
    /// Wire a context from explicit collaborators.
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        registry: Arc<dyn ClusterRegistry>,
        identity: Arc<dyn IdentityService>,
        tunnels: Arc<dyn TunnelProvider>,
    ) -> Self {
        let resolver = ScopeResolver::new(registry, config.naming.clone());
        let executor = QueryExecutor::new(resolver, identity, tunnels, config.request_timeout());

        Self {
            time_windows: TimeWindowResolver::new(config.time_window),
            catalog: CatalogMerger::new(executor.clone()),
            executor,
        }
    }

    /// Wire the production collaborators described by `config`.
    ///
    /// Clusters come from the static list in the configuration, credentials from the
    /// `TokenRequest` API and tunnels from each cluster's proxy endpoint.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config,
            Arc::new(StaticClusterRegistry::new(config.clusters.clone())),
            Arc::new(TokenRequestIssuer::new(config.credentials.clone())),
            Arc::new(ConnectProxyTunnel::new()),
        )
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
