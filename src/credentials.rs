// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Short-lived bearer credentials for remote metrics backends.
//!
//! Each request mints its own [`Credential`] for the service account the scope
//! resolved to. Credentials are never cached or shared between requests and their
//! token never appears in logs; use [`Credential::fingerprint`] to correlate.
//!
//! The production [`IdentityService`] is [`TokenRequestIssuer`], which asks the remote
//! cluster's API server for a token through the `ServiceAccount` `token` subresource.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenRequest, TokenRequestSpec};
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::api::PostParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_TOKEN_EXPIRATION_SECS, SERVICE_ACCOUNT_TOKEN_SUBRESOURCE, TOKEN_FINGERPRINT_LEN,
};
use crate::errors::{GatewayError, Result};
use crate::registry::ClusterHandle;
use crate::scope::ServiceAccountRef;

/// Bearer token bound to one service account, valid for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    /// Service account identity (`system:serviceaccount:<ns>:<name>`)
    pub subject: String,
    /// Namespace the service account lives in
    pub issuing_namespace: String,
}

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>, service_account: &ServiceAccountRef) -> Self {
        Self {
            token: token.into(),
            subject: format!(
                "system:serviceaccount:{}:{}",
                service_account.namespace, service_account.name
            ),
            issuing_namespace: service_account.namespace.clone(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Short SHA-256 prefix of the token, safe to log.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.token.as_bytes());
        let mut digest = format!("{:x}", hasher.finalize());
        digest.truncate(TOKEN_FINGERPRINT_LEN);
        digest
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &format_args!("<redacted:{}>", self.fingerprint()))
            .field("subject", &self.subject)
            .field("issuing_namespace", &self.issuing_namespace)
            .finish()
    }
}

/// Capability to mint credentials inside a remote cluster.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Issue a token for `service_account`, scoped to `cluster`'s own API.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CredentialUnavailable`] if the cluster's control
    /// connection is down or the service account does not exist.
    async fn issue(
        &self,
        cluster: &ClusterHandle,
        service_account: &ServiceAccountRef,
    ) -> Result<Credential>;
}

/// Settings for [`TokenRequestIssuer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Requested token lifetime; the API server may extend it
    pub token_expiration_secs: i64,
    /// Token audiences, empty for the API server's default audience
    pub audiences: Vec<String>,
    /// Kubeconfig holding one context per remote cluster, `None` for the default lookup
    pub kubeconfig: Option<PathBuf>,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            token_expiration_secs: DEFAULT_TOKEN_EXPIRATION_SECS,
            audiences: Vec::new(),
            kubeconfig: None,
        }
    }
}

/// Where [`TokenRequestIssuer`] gets its API clients from.
#[derive(Clone)]
enum ClientSource {
    /// Kubeconfig parsed once, one context per remote cluster
    Kubeconfig(Arc<Kubeconfig>),
    /// The kubeconfig could not be read; every issuance fails with this reason
    Unavailable(String),
    /// One client shared by every cluster
    Fixed(Client),
}

/// Mints tokens through the Kubernetes `TokenRequest` API of the remote cluster.
///
/// The kubeconfig is read once at construction. Clients are built lazily per
/// kubeconfig context and reused afterwards.
#[derive(Clone)]
pub struct TokenRequestIssuer {
    settings: CredentialSettings,
    source: ClientSource,
    clients: Arc<Mutex<HashMap<Option<String>, Client>>>,
}

impl TokenRequestIssuer {
    /// Issuer reading `settings.kubeconfig`, or the default kubeconfig lookup.
    ///
    /// A kubeconfig that cannot be read does not fail construction; each
    /// issuance then reports [`GatewayError::CredentialUnavailable`].
    #[must_use]
    pub fn new(settings: CredentialSettings) -> Self {
        let source = match &settings.kubeconfig {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        }
        .map_or_else(
            |e| {
                warn!(error = %e, "Failed to read kubeconfig, token issuance disabled");
                ClientSource::Unavailable(format!("failed to read kubeconfig: {e}"))
            },
            |kubeconfig| ClientSource::Kubeconfig(Arc::new(kubeconfig)),
        );
        Self::with_source(settings, source)
    }

    /// Issuer sending every `TokenRequest` through `client`.
    #[must_use]
    pub fn with_client(settings: CredentialSettings, client: Client) -> Self {
        Self::with_source(settings, ClientSource::Fixed(client))
    }

    fn with_source(settings: CredentialSettings, source: ClientSource) -> Self {
        Self {
            settings,
            source,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Client for the cluster's kubeconfig context.
    async fn client_for(&self, cluster: &ClusterHandle) -> std::result::Result<Client, String> {
        let kubeconfig = match &self.source {
            ClientSource::Fixed(client) => return Ok(client.clone()),
            ClientSource::Unavailable(reason) => return Err(reason.clone()),
            ClientSource::Kubeconfig(kubeconfig) => kubeconfig,
        };

        if let Some(client) = self
            .clients
            .lock()
            .ok()
            .and_then(|clients| clients.get(&cluster.kube_context).cloned())
        {
            return Ok(client);
        }

        let options = KubeConfigOptions {
            context: cluster.kube_context.clone(),
            ..KubeConfigOptions::default()
        };
        let config = kube::Config::from_custom_kubeconfig(kubeconfig.as_ref().clone(), &options)
            .await
            .map_err(|e| format!("failed to load kubeconfig context: {e}"))?;
        let client =
            Client::try_from(config).map_err(|e| format!("failed to create client: {e}"))?;

        if let Ok(mut clients) = self.clients.lock() {
            clients.insert(cluster.kube_context.clone(), client.clone());
        }
        Ok(client)
    }

    fn token_request(&self) -> TokenRequest {
        TokenRequest {
            spec: TokenRequestSpec {
                audiences: self.settings.audiences.clone(),
                expiration_seconds: Some(self.settings.token_expiration_secs),
                ..TokenRequestSpec::default()
            },
            ..TokenRequest::default()
        }
    }
}

#[async_trait]
impl IdentityService for TokenRequestIssuer {
    async fn issue(
        &self,
        cluster: &ClusterHandle,
        service_account: &ServiceAccountRef,
    ) -> Result<Credential> {
        let unavailable = |reason: String| GatewayError::CredentialUnavailable {
            cluster_id: cluster.id.clone(),
            namespace: service_account.namespace.clone(),
            service_account: service_account.name.clone(),
            reason,
        };

        let client = self.client_for(cluster).await.map_err(unavailable)?;
        let api: Api<ServiceAccount> = Api::namespaced(client, &service_account.namespace);

        let issued: TokenRequest = api
            .create_subresource(
                SERVICE_ACCOUNT_TOKEN_SUBRESOURCE,
                &service_account.name,
                &PostParams::default(),
                &self.token_request(),
            )
            .await
            .map_err(|e| {
                warn!(
                    cluster_id = %cluster.id,
                    namespace = %service_account.namespace,
                    service_account = %service_account.name,
                    error = %e,
                    "TokenRequest failed"
                );
                unavailable(e.to_string())
            })?;

        let token = issued
            .status
            .map(|status| status.token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| unavailable("TokenRequest returned no token".to_string()))?;

        let credential = Credential::new(token, service_account);
        debug!(
            cluster_id = %cluster.id,
            subject = %credential.subject,
            fingerprint = %credential.fingerprint(),
            "Issued service account token"
        );
        Ok(credential)
    }
}
