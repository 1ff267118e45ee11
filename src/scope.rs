// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scope resolution: which cluster, which backend, which service account.
//!
//! A query is bound either to a whole cluster or to one project inside it. The
//! [`ScopeResolver`] maps that [`Scope`] onto:
//!
//! - the remote cluster handle (via the [`ClusterRegistry`])
//! - the [`BackendTarget`] that answers the query
//! - the [`ServiceAccountRef`] whose token authenticates the call
//!
//! Backend coordinates follow a fixed naming convention ([`BackendNaming`]) and are
//! recomputed for every request.
//!
//! # Example
//!
//! ```rust
//! use metrics_gateway::scope::{BackendNaming, Scope};
//!
//! let scope = Scope::from_project_ref("c1:p-x7k2");
//! assert_eq!(scope.cluster_id(), "c1");
//!
//! let naming = BackendNaming::default();
//! let target = naming.project_target("c1", "p-x7k2");
//! assert_eq!(target.namespace, "cattle-prometheus-p-x7k2");
//! assert_eq!(target.service_name, "access-prometheus");
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    CLUSTER_MONITORING_NAMESPACE, CLUSTER_MONITORING_SERVICE_ACCOUNT, PROJECT_ID_SEPARATOR,
    PROJECT_MONITORING_NAMESPACE_PREFIX, PROJECT_MONITORING_SERVICE_ACCOUNT,
    PROMETHEUS_SERVICE_NAME, PROMETHEUS_SERVICE_PORT, PROMETHEUS_SERVICE_SCHEME,
};
use crate::errors::{GatewayError, Result};
use crate::registry::{ClusterHandle, ClusterRegistry};

/// Boundary a metrics query is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The whole cluster
    Cluster { cluster_id: String },
    /// One project inside a cluster
    Project {
        cluster_id: String,
        project_id: String,
    },
}

impl Scope {
    #[must_use]
    pub fn cluster(cluster_id: impl Into<String>) -> Self {
        Self::Cluster {
            cluster_id: cluster_id.into(),
        }
    }

    #[must_use]
    pub fn project(cluster_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self::Project {
            cluster_id: cluster_id.into(),
            project_id: project_id.into(),
        }
    }

    /// Split a `<clusterID>:<projectID>` reference.
    ///
    /// A reference without a separator has an empty cluster id; resolution rejects it.
    #[must_use]
    pub fn from_project_ref(project_ref: &str) -> Self {
        match project_ref.split_once(PROJECT_ID_SEPARATOR) {
            Some((cluster_id, project_id)) => Self::project(cluster_id, project_id),
            None => Self::project("", project_ref),
        }
    }

    #[must_use]
    pub fn cluster_id(&self) -> &str {
        match self {
            Self::Cluster { cluster_id } | Self::Project { cluster_id, .. } => cluster_id,
        }
    }

    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::Cluster { .. } => None,
            Self::Project { project_id, .. } => Some(project_id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster { cluster_id } => write!(f, "{cluster_id}"),
            Self::Project {
                cluster_id,
                project_id,
            } => write!(f, "{cluster_id}{PROJECT_ID_SEPARATOR}{project_id}"),
        }
    }
}

/// One metrics backend reachable only from inside a specific remote cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub remote_cluster_id: String,
    pub namespace: String,
    pub service_name: String,
    pub port: u16,
    pub scheme: String,
}

impl BackendTarget {
    /// `namespace/name`, used in logs and error messages.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.namespace, self.service_name)
    }

    /// In-cluster DNS name of the backend service.
    #[must_use]
    pub fn service_host(&self) -> String {
        format!("{}.{}.svc", self.service_name, self.namespace)
    }
}

/// Coordinates of the service account a credential is minted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountRef {
    pub namespace: String,
    pub name: String,
}

/// Naming convention locating the cluster and project monitoring backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendNaming {
    pub cluster_namespace: String,
    pub cluster_service: String,
    pub cluster_service_account: String,
    /// Project namespaces are `<prefix>-<projectID>`
    pub project_namespace_prefix: String,
    pub project_service: String,
    pub project_service_account: String,
    pub service_port: u16,
    pub scheme: String,
}

impl Default for BackendNaming {
    fn default() -> Self {
        Self {
            cluster_namespace: CLUSTER_MONITORING_NAMESPACE.to_string(),
            cluster_service: PROMETHEUS_SERVICE_NAME.to_string(),
            cluster_service_account: CLUSTER_MONITORING_SERVICE_ACCOUNT.to_string(),
            project_namespace_prefix: PROJECT_MONITORING_NAMESPACE_PREFIX.to_string(),
            project_service: PROMETHEUS_SERVICE_NAME.to_string(),
            project_service_account: PROJECT_MONITORING_SERVICE_ACCOUNT.to_string(),
            service_port: PROMETHEUS_SERVICE_PORT,
            scheme: PROMETHEUS_SERVICE_SCHEME.to_string(),
        }
    }
}

impl BackendNaming {
    #[must_use]
    pub fn project_namespace(&self, project_id: &str) -> String {
        format!("{}-{project_id}", self.project_namespace_prefix)
    }

    #[must_use]
    pub fn cluster_target(&self, cluster_id: &str) -> BackendTarget {
        BackendTarget {
            remote_cluster_id: cluster_id.to_string(),
            namespace: self.cluster_namespace.clone(),
            service_name: self.cluster_service.clone(),
            port: self.service_port,
            scheme: self.scheme.clone(),
        }
    }

    #[must_use]
    pub fn project_target(&self, cluster_id: &str, project_id: &str) -> BackendTarget {
        BackendTarget {
            remote_cluster_id: cluster_id.to_string(),
            namespace: self.project_namespace(project_id),
            service_name: self.project_service.clone(),
            port: self.service_port,
            scheme: self.scheme.clone(),
        }
    }

    #[must_use]
    pub fn cluster_service_account(&self) -> ServiceAccountRef {
        ServiceAccountRef {
            namespace: self.cluster_namespace.clone(),
            name: self.cluster_service_account.clone(),
        }
    }

    #[must_use]
    pub fn project_service_account(&self, project_id: &str) -> ServiceAccountRef {
        ServiceAccountRef {
            namespace: self.project_namespace(project_id),
            name: self.project_service_account.clone(),
        }
    }

    /// Backend and service account serving `scope`.
    #[must_use]
    pub fn for_scope(&self, scope: &Scope) -> (BackendTarget, ServiceAccountRef) {
        match scope {
            Scope::Cluster { cluster_id } => (
                self.cluster_target(cluster_id),
                self.cluster_service_account(),
            ),
            Scope::Project {
                cluster_id,
                project_id,
            } => (
                self.project_target(cluster_id, project_id),
                self.project_service_account(project_id),
            ),
        }
    }
}

/// Everything needed to reach and authenticate against one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    pub cluster: ClusterHandle,
    pub target: BackendTarget,
    pub service_account: ServiceAccountRef,
}

/// Maps scopes onto clusters, backends and service accounts.
#[derive(Clone)]
pub struct ScopeResolver {
    registry: Arc<dyn ClusterRegistry>,
    naming: BackendNaming,
}

impl ScopeResolver {
    #[must_use]
    pub fn new(registry: Arc<dyn ClusterRegistry>, naming: BackendNaming) -> Self {
        Self { registry, naming }
    }

    #[must_use]
    pub fn naming(&self) -> &BackendNaming {
        &self.naming
    }

    /// Resolve a scope to its backend and service account.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::UnresolvableScope`] if the cluster id is empty or unknown
    /// - [`GatewayError::InvalidInput`] if a project scope has an empty project id
    pub async fn resolve(&self, scope: &Scope) -> Result<ResolvedScope> {
        validate(scope)?;
        let cluster = self.registry.lookup(scope.cluster_id()).await?;

        let (target, service_account) = self.naming.for_scope(scope);

        debug!(
            scope = %scope,
            endpoint = %target.endpoint(),
            service_account = %format!("{}/{}", service_account.namespace, service_account.name),
            "Resolved scope"
        );

        Ok(ResolvedScope {
            cluster,
            target,
            service_account,
        })
    }

    /// Resolve both backends consulted for a project's metric names.
    ///
    /// Pod and container metrics live in the cluster backend even for project queries,
    /// so a project catalog needs the project target and the cluster target. The
    /// registry is consulted once.
    ///
    /// # Errors
    ///
    /// Same as [`ScopeResolver::resolve`].
    pub async fn resolve_project_catalog(
        &self,
        cluster_id: &str,
        project_id: &str,
    ) -> Result<(ResolvedScope, ResolvedScope)> {
        let project = self
            .resolve(&Scope::project(cluster_id, project_id))
            .await?;
        let cluster = ResolvedScope {
            cluster: project.cluster.clone(),
            target: self.naming.cluster_target(cluster_id),
            service_account: self.naming.cluster_service_account(),
        };
        Ok((project, cluster))
    }
}

/// Reject scopes that can never resolve, before touching the registry.
fn validate(scope: &Scope) -> Result<()> {
    if scope.cluster_id().is_empty() {
        return Err(GatewayError::unresolvable_scope(
            scope.to_string(),
            "clusterName is empty",
        ));
    }
    if scope.project_id().is_some_and(str::is_empty) {
        return Err(GatewayError::invalid_input(format!(
            "project reference '{scope}' has an empty project id"
        )));
    }
    Ok(())
}
