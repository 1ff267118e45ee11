// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Query Executor: runs one range query against the backend serving a scope.
//!
//! The pipeline is strictly sequential:
//!
//! 1. Scope resolution (registry lookup, backend and service account naming)
//! 2. Credential issuance for the resolved service account
//! 3. Tunnel dial to the resolved backend
//! 4. Range query
//!
//! One deadline, derived from the configured request timeout, covers all four stages.
//! When it expires the in-flight stage is dropped, which closes its tunnel lease, and
//! the caller gets [`GatewayError::BackendTimeout`] whatever stage was running.
//! Errors are never retried.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, QuerySpec, SeriesResult};
use crate::constants::MAX_REQUEST_TIMEOUT_SECS;
use crate::credentials::IdentityService;
use crate::errors::{GatewayError, Result};
use crate::scope::{ResolvedScope, Scope, ScopeResolver};
use crate::time_window::TimeWindow;
use crate::tunnel::TunnelProvider;

/// Runs range queries for cluster and project scopes.
#[derive(Clone)]
pub struct QueryExecutor {
    resolver: ScopeResolver,
    identity: Arc<dyn IdentityService>,
    tunnels: Arc<dyn TunnelProvider>,
    request_timeout: Duration,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(
        resolver: ScopeResolver,
        identity: Arc<dyn IdentityService>,
        tunnels: Arc<dyn TunnelProvider>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            identity,
            tunnels,
            request_timeout,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Execute a range query over an already resolved window.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidInput`] if `expression` is blank
    /// - any error of the resolver, identity service, tunnel or backend, unchanged
    /// - [`GatewayError::BackendTimeout`] if the request deadline expires
    pub async fn execute(
        &self,
        scope: Scope,
        window: TimeWindow,
        expression: impl Into<String>,
    ) -> Result<SeriesResult> {
        let spec = QuerySpec {
            scope,
            window,
            expression: expression.into(),
        };
        if spec.expression.trim().is_empty() {
            return Err(GatewayError::invalid_input("query expression is empty"));
        }

        let deadline = self.deadline();
        let started = std::time::Instant::now();
        info!(
            scope = %spec.scope,
            start = %spec.window.start,
            end = %spec.window.end,
            step = spec.window.step_seconds,
            "Executing range query"
        );

        let result = tokio::time::timeout_at(deadline, self.run(&spec, deadline))
            .await
            .unwrap_or_else(|_| Err(self.timeout_error(&spec.scope)));

        match &result {
            Ok(series) => info!(
                scope = %spec.scope,
                series = series.len(),
                elapsed = ?started.elapsed(),
                "Range query completed"
            ),
            Err(e) => warn!(
                scope = %spec.scope,
                kind = e.kind(),
                error = %e,
                elapsed = ?started.elapsed(),
                "Range query failed"
            ),
        }
        result
    }

    async fn run(&self, spec: &QuerySpec, deadline: Instant) -> Result<SeriesResult> {
        let resolved = self.resolver.resolve(&spec.scope).await?;
        let backend = self.connect(resolved, deadline).await?;
        backend.query_range(spec).await
    }

    /// Issue a credential and dial a tunnel for a resolved scope.
    ///
    /// The returned client owns the tunnel lease.
    pub(crate) async fn connect(
        &self,
        resolved: ResolvedScope,
        deadline: Instant,
    ) -> Result<BackendClient> {
        let ResolvedScope {
            cluster,
            target,
            service_account,
        } = resolved;

        let credential = self.identity.issue(&cluster, &service_account).await?;
        debug!(
            cluster_id = %cluster.id,
            namespace = %service_account.namespace,
            service_account = %service_account.name,
            credential = %credential.fingerprint(),
            "Credential issued"
        );

        let connection = self.tunnels.dial(&cluster, &target).await?;
        debug!(
            cluster_id = %cluster.id,
            endpoint = %target.endpoint(),
            "Tunnel dialed"
        );

        Ok(BackendClient::new(
            connection,
            target,
            credential,
            deadline,
            self.request_timeout,
        ))
    }

    /// Deadline of a request starting now, capped when the timeout overflows the clock.
    pub(crate) fn deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.request_timeout)
            .unwrap_or_else(|| now + Duration::from_secs(MAX_REQUEST_TIMEOUT_SECS))
    }

    /// Timeout error naming the backend that serves `scope`.
    pub(crate) fn timeout_error(&self, scope: &Scope) -> GatewayError {
        let (target, _) = self.resolver.naming().for_scope(scope);
        GatewayError::BackendTimeout {
            endpoint: target.endpoint(),
            timeout_ms: u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
