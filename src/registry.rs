// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Registry of remote clusters known to the control plane.
//!
//! The gateway never reaches a workload cluster directly. A [`ClusterRegistry`] turns
//! a cluster identifier into a [`ClusterHandle`] that carries what the tunnel and the
//! identity service need to reach that cluster. Lookups failing here surface as
//! [`GatewayError::UnresolvableScope`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{GatewayError, Result};

/// Handle on a remote cluster's control surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHandle {
    /// Cluster identifier as used in scopes (`c-abc12`)
    pub id: String,
    /// Proxy endpoint that terminates the tunnel inside the remote cluster
    pub tunnel_endpoint: Url,
    /// Kubeconfig context for the cluster's API server, `None` for the current context
    #[serde(default)]
    pub kube_context: Option<String>,
}

/// Capability to look up remote clusters.
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    /// Resolve a cluster identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnresolvableScope`] when the cluster is unknown.
    async fn lookup(&self, cluster_id: &str) -> Result<ClusterHandle>;
}

/// Registry backed by the static cluster list of the gateway configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticClusterRegistry {
    clusters: BTreeMap<String, ClusterHandle>,
}

impl StaticClusterRegistry {
    /// Build a registry from cluster handles. Later duplicates replace earlier ones.
    #[must_use]
    pub fn new(clusters: impl IntoIterator<Item = ClusterHandle>) -> Self {
        Self {
            clusters: clusters
                .into_iter()
                .map(|handle| (handle.id.clone(), handle))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

#[async_trait]
impl ClusterRegistry for StaticClusterRegistry {
    async fn lookup(&self, cluster_id: &str) -> Result<ClusterHandle> {
        if cluster_id.is_empty() {
            return Err(GatewayError::unresolvable_scope(
                cluster_id,
                "clusterName is empty",
            ));
        }
        self.clusters.get(cluster_id).cloned().ok_or_else(|| {
            GatewayError::unresolvable_scope(cluster_id, "cluster is not registered")
        })
    }
}
