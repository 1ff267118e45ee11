// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateway configuration.
//!
//! Configuration is a single YAML document. Every field is optional and defaults to
//! the values in [`crate::constants`], so an absent file is a valid configuration.
//!
//! ```yaml
//! listen_address: 0.0.0.0:8080
//! request_timeout_secs: 30
//! time_window:
//!   default_lookback_secs: 300
//!   sample_budget: 60
//!   min_step_secs: 5
//! naming:
//!   cluster_namespace: cattle-prometheus
//!   project_namespace_prefix: cattle-prometheus
//! credentials:
//!   token_expiration_secs: 600
//!   kubeconfig: /etc/metrics-gateway/clusters.kubeconfig
//! clusters:
//!   - id: c-abc12
//!     tunnel_endpoint: http://tunnel-c-abc12.cattle-system.svc:3128
//!     kube_context: c-abc12
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{
    DEFAULT_LISTEN_ADDRESS, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS,
};
use crate::credentials::CredentialSettings;
use crate::registry::ClusterHandle;
use crate::scope::BackendNaming;
use crate::time_window::TimeWindowDefaults;

/// Top-level gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to
    pub listen_address: String,
    /// Deadline covering one inbound request end to end
    pub request_timeout_secs: u64,
    pub time_window: TimeWindowDefaults,
    pub naming: BackendNaming,
    pub credentials: CredentialSettings,
    /// Remote clusters reachable through tunnels
    pub clusters: Vec<ClusterHandle>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            time_window: TimeWindowDefaults::default(),
            naming: BackendNaming::default(),
            credentials: CredentialSettings::default(),
            clusters: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from `path`.
    ///
    /// No path, or a path that does not exist, yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No configuration file given, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        info!(
            path = %path.display(),
            clusters = config.clusters.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a map.
        let config: Self = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML")?
        };
        config.validate()?;
        debug!(config = ?config, "Configuration validated");
        Ok(config)
    }

    /// Check invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            bail!("request_timeout_secs must not exceed {MAX_REQUEST_TIMEOUT_SECS}");
        }
        if self.time_window.sample_budget == 0 {
            bail!("time_window.sample_budget must be greater than zero");
        }
        if self.time_window.min_step_secs == 0 {
            bail!("time_window.min_step_secs must be greater than zero");
        }
        if self.credentials.token_expiration_secs <= 0 {
            bail!("credentials.token_expiration_secs must be greater than zero");
        }

        let mut seen = BTreeSet::new();
        for cluster in &self.clusters {
            if cluster.id.trim().is_empty() {
                bail!("clusters: cluster id must not be empty");
            }
            if !seen.insert(cluster.id.as_str()) {
                bail!("clusters: duplicate cluster id '{}'", cluster.id);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
