// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use metrics_gateway::config::GatewayConfig;
use metrics_gateway::context::Context;
use metrics_gateway::credentials::{Credential, IdentityService};
use metrics_gateway::errors::{GatewayError, Result};
use metrics_gateway::executor::QueryExecutor;
use metrics_gateway::registry::{ClusterHandle, StaticClusterRegistry};
use metrics_gateway::scope::{BackendNaming, BackendTarget, ScopeResolver, ServiceAccountRef};
use metrics_gateway::tunnel::{TunnelConnection, TunnelLease, TunnelProvider};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Cluster known to every test registry
pub const CLUSTER_ID: &str = "c1";

pub fn cluster_handle(id: &str) -> ClusterHandle {
    ClusterHandle {
        id: id.to_string(),
        tunnel_endpoint: Url::parse("http://tunnel.invalid:3128").unwrap(),
        kube_context: None,
    }
}

/// Identity service minting `token-<namespace>-<name>` and recording every request.
#[derive(Default)]
pub struct FakeIdentity {
    issued: Mutex<Vec<ServiceAccountRef>>,
    failure: Option<GatewayError>,
}

impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(err: GatewayError) -> Arc<Self> {
        Arc::new(Self {
            issued: Mutex::default(),
            failure: Some(err),
        })
    }

    pub fn issued(&self) -> usize {
        self.issued.lock().unwrap().len()
    }

    pub fn service_accounts(&self) -> Vec<ServiceAccountRef> {
        self.issued.lock().unwrap().clone()
    }
}

pub fn token_for(service_account: &ServiceAccountRef) -> String {
    format!("token-{}-{}", service_account.namespace, service_account.name)
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn issue(
        &self,
        _cluster: &ClusterHandle,
        service_account: &ServiceAccountRef,
    ) -> Result<Credential> {
        self.issued.lock().unwrap().push(service_account.clone());
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(Credential::new(token_for(service_account), service_account)),
        }
    }
}

/// Tunnel that routes every backend to `<base>/<namespace>/` on one mock server.
///
/// Counts dials and tracks how many leases are open.
pub struct FakeTunnel {
    base: String,
    fail: bool,
    dials: AtomicUsize,
    dialed: Mutex<Vec<BackendTarget>>,
    open: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl FakeTunnel {
    pub fn new(base: &str) -> Arc<Self> {
        Arc::new(Self {
            base: base.trim_end_matches('/').to_string(),
            fail: false,
            dials: AtomicUsize::new(0),
            dialed: Mutex::default(),
            open: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Tunnel whose dial opens a lease, then fails and releases it.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            base: "http://unused.invalid".to_string(),
            fail: true,
            dials: AtomicUsize::new(0),
            dialed: Mutex::default(),
            open: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn dialed_namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .dialed
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.namespace.clone())
            .collect();
        namespaces.sort();
        namespaces
    }

    pub fn opened(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Leases opened and not yet released
    pub fn active(&self) -> usize {
        self.open.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
    }

    fn lease(&self) -> TunnelLease {
        self.open.fetch_add(1, Ordering::SeqCst);
        let released = self.released.clone();
        TunnelLease::new(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}

#[async_trait]
impl TunnelProvider for FakeTunnel {
    async fn dial(
        &self,
        cluster: &ClusterHandle,
        target: &BackendTarget,
    ) -> Result<TunnelConnection> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        self.dialed.lock().unwrap().push(target.clone());

        let lease = self.lease();
        if self.fail {
            drop(lease);
            return Err(GatewayError::BackendUnreachable {
                cluster_id: cluster.id.clone(),
                endpoint: target.endpoint(),
                reason: "tunnel dial refused".to_string(),
            });
        }

        let base_url = Url::parse(&format!("{}/{}/", self.base, target.namespace)).unwrap();
        Ok(TunnelConnection::new(base_url, reqwest::Client::new(), lease))
    }
}

/// Executor over the fakes with cluster `c1` registered.
pub fn executor(
    identity: Arc<FakeIdentity>,
    tunnel: Arc<FakeTunnel>,
    request_timeout: Duration,
) -> QueryExecutor {
    QueryExecutor::new(
        ScopeResolver::new(
            Arc::new(StaticClusterRegistry::new([cluster_handle(CLUSTER_ID)])),
            BackendNaming::default(),
        ),
        identity,
        tunnel,
        request_timeout,
    )
}

/// Handler context over the fakes with cluster `c1` registered.
pub fn context(identity: Arc<FakeIdentity>, tunnel: Arc<FakeTunnel>) -> Context {
    let config = GatewayConfig {
        request_timeout_secs: 5,
        ..GatewayConfig::default()
    };
    Context::new(
        &config,
        Arc::new(StaticClusterRegistry::new([cluster_handle(CLUSTER_ID)])),
        identity,
        tunnel,
    )
}

/// Prometheus label values body
pub fn label_values_body(values: &[&str]) -> serde_json::Value {
    serde_json::json!({ "status": "success", "data": values })
}

/// Prometheus range query body with the given matrix result
pub fn matrix_body(result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "status": "success",
        "data": { "resultType": "matrix", "result": result }
    })
}
