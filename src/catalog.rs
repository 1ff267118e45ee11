// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Catalog Merger: metric-name listings for cluster and project scopes.
//!
//! A cluster catalog comes from one backend. A project catalog is the union of the
//! project backend's names and the cluster backend's names, because pod and container
//! metrics of a project's workloads are scraped by the cluster monitoring stack.
//!
//! The two project lookups run concurrently under one deadline. The first failure
//! wins: the sibling lookup is dropped, its tunnel lease released, and the error is
//! returned as is. A partial catalog is never returned.

use std::collections::BTreeSet;

use futures::future::try_join;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::METRIC_NAME_LABEL;
use crate::errors::Result;
use crate::executor::QueryExecutor;
use crate::scope::{ResolvedScope, Scope};

/// Lists metric names, merging backends where a scope spans two.
#[derive(Clone)]
pub struct CatalogMerger {
    executor: QueryExecutor,
}

impl CatalogMerger {
    #[must_use]
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Metric names known to the cluster backend, sorted and deduplicated.
    ///
    /// # Errors
    ///
    /// Any error of the resolver, identity service, tunnel or backend, or
    /// [`crate::errors::GatewayError::BackendTimeout`] when the deadline expires.
    pub async fn list_cluster_metric_names(&self, cluster_id: &str) -> Result<Vec<String>> {
        let scope = Scope::cluster(cluster_id);
        let deadline = self.executor.deadline();

        let lookup = async {
            let resolved = self.executor.resolver().resolve(&scope).await?;
            self.names(resolved, deadline).await
        };
        let names = tokio::time::timeout_at(deadline, lookup)
            .await
            .unwrap_or_else(|_| Err(self.executor.timeout_error(&scope)))
            .inspect_err(|e| warn!(scope = %scope, error = %e, "Cluster catalog failed"))?;

        let catalog = merge_catalogs(names, Vec::new());
        info!(scope = %scope, names = catalog.len(), "Cluster catalog listed");
        Ok(catalog)
    }

    /// Metric names of the project backend and the cluster backend, merged.
    ///
    /// # Errors
    ///
    /// The first error of either lookup. The other lookup is cancelled.
    pub async fn list_project_metric_names(
        &self,
        cluster_id: &str,
        project_id: &str,
    ) -> Result<Vec<String>> {
        let scope = Scope::project(cluster_id, project_id);
        let deadline = self.executor.deadline();

        let lookup = async {
            let (project, cluster) = self
                .executor
                .resolver()
                .resolve_project_catalog(cluster_id, project_id)
                .await?;
            try_join(self.names(project, deadline), self.names(cluster, deadline)).await
        };
        let (project_names, cluster_names) = tokio::time::timeout_at(deadline, lookup)
            .await
            .unwrap_or_else(|_| Err(self.executor.timeout_error(&scope)))
            .inspect_err(|e| warn!(scope = %scope, error = %e, "Project catalog failed"))?;

        debug!(
            scope = %scope,
            project_names = project_names.len(),
            cluster_names = cluster_names.len(),
            "Merging catalogs"
        );
        let catalog = merge_catalogs(project_names, cluster_names);
        info!(scope = %scope, names = catalog.len(), "Project catalog listed");
        Ok(catalog)
    }

    async fn names(&self, resolved: ResolvedScope, deadline: Instant) -> Result<Vec<String>> {
        let backend = self.executor.connect(resolved, deadline).await?;
        backend.label_values(METRIC_NAME_LABEL).await
    }
}

/// Union of two name lists, sorted and deduplicated.
#[must_use]
pub fn merge_catalogs(a: Vec<String>, b: Vec<String>) -> Vec<String> {
    a.into_iter()
        .chain(b)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
