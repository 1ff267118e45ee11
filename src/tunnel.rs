// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tunneled network paths into remote clusters.
//!
//! The control plane has no route to a workload cluster's service network. A
//! [`TunnelProvider`] dials a path keyed by the remote cluster and hands back a
//! [`TunnelConnection`]: an HTTP client plus the base URL under which the backend is
//! reachable through that path.
//!
//! Every connection owns a [`TunnelLease`]. Dropping the connection (request finished,
//! request cancelled, deadline expired) drops the lease, which releases the tunnel
//! exactly once.
//!
//! [`ConnectProxyTunnel`] is the production provider: the cluster's tunnel endpoint is
//! an HTTP proxy terminating inside the remote cluster, so in-cluster service DNS names
//! resolve on the far side.

use std::fmt;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, warn};
use url::Url;

use crate::errors::{GatewayError, Result};
use crate::metrics;
use crate::registry::ClusterHandle;
use crate::scope::BackendTarget;

type ReleaseHook = Box<dyn FnOnce() + Send + Sync>;

/// Releases a tunnel when dropped.
#[derive(Default)]
pub struct TunnelLease {
    release: Option<ReleaseHook>,
}

impl TunnelLease {
    /// Lease running `release` when dropped.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Lease with nothing to release.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }
}

impl Drop for TunnelLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for TunnelLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelLease")
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// A live path to one backend.
#[derive(Debug)]
pub struct TunnelConnection {
    base_url: Url,
    http: reqwest::Client,
    _lease: TunnelLease,
}

impl TunnelConnection {
    #[must_use]
    pub fn new(base_url: Url, http: reqwest::Client, lease: TunnelLease) -> Self {
        Self {
            base_url,
            http,
            _lease: lease,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Capability to open a network path into a remote cluster.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    /// Dial a path to `target` inside `cluster`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BackendUnreachable`] if no path can be established.
    /// Anything opened before the failure must be released before returning.
    async fn dial(&self, cluster: &ClusterHandle, target: &BackendTarget)
        -> Result<TunnelConnection>;
}

/// Tunnel through an HTTP proxy that terminates inside the remote cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectProxyTunnel;

impl ConnectProxyTunnel {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Base URL of the backend as seen from inside the remote cluster.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BackendUnreachable`] if the target does not form a valid URL.
    pub fn backend_url(target: &BackendTarget) -> Result<Url> {
        let raw = format!(
            "{}://{}:{}",
            target.scheme,
            target.service_host(),
            target.port
        );
        Url::parse(&raw).map_err(|e| GatewayError::BackendUnreachable {
            cluster_id: target.remote_cluster_id.clone(),
            endpoint: target.endpoint(),
            reason: format!("invalid backend URL '{raw}': {e}"),
        })
    }
}

#[async_trait]
impl TunnelProvider for ConnectProxyTunnel {
    async fn dial(
        &self,
        cluster: &ClusterHandle,
        target: &BackendTarget,
    ) -> Result<TunnelConnection> {
        let unreachable = |reason: String| GatewayError::BackendUnreachable {
            cluster_id: cluster.id.clone(),
            endpoint: target.endpoint(),
            reason,
        };

        let proxy_url = &cluster.tunnel_endpoint;
        let host = proxy_url
            .host_str()
            .ok_or_else(|| unreachable(format!("tunnel endpoint '{proxy_url}' has no host")))?;
        let port = proxy_url
            .port_or_known_default()
            .ok_or_else(|| unreachable(format!("tunnel endpoint '{proxy_url}' has no port")))?;

        // Reachability probe; the stream is dropped right away.
        TcpStream::connect((host, port)).await.map_err(|e| {
            warn!(
                cluster_id = %cluster.id,
                tunnel = %proxy_url,
                error = %e,
                "Tunnel dial failed"
            );
            unreachable(format!("tunnel dial to {host}:{port} failed: {e}"))
        })?;

        let proxy = reqwest::Proxy::all(proxy_url.as_str())
            .map_err(|e| unreachable(format!("invalid tunnel endpoint: {e}")))?;
        let http = reqwest::Client::builder()
            .proxy(proxy)
            .build()
            .map_err(|e| unreachable(format!("failed to build tunnel client: {e}")))?;
        let base_url = Self::backend_url(target)?;

        metrics::TUNNELS_ACTIVE.inc();
        debug!(
            cluster_id = %cluster.id,
            tunnel = %proxy_url,
            backend = %base_url,
            "Tunnel established"
        );

        Ok(TunnelConnection::new(
            base_url,
            http,
            TunnelLease::new(|| metrics::TUNNELS_ACTIVE.dec()),
        ))
    }
}
