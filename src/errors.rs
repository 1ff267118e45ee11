// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy of the metrics gateway.
//!
//! Every failure surfaced to a caller is a [`GatewayError`]. Each variant carries a
//! stable kind tag ([`GatewayError::kind`]) and maps onto an HTTP status
//! ([`GatewayError::status_code`]), so the inbound layer never has to inspect
//! error strings.
//!
//! Nothing in the request path retries. A failing credential or backend call is
//! reported to the caller as-is.

use thiserror::Error;

/// Errors that can occur while answering a metrics query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Missing or malformed request parameter (scope, expression, ...)
    ///
    /// Rejected before any network call is attempted.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Explanation of what is invalid
        reason: String,
    },

    /// The time range could not be parsed or ends before it starts
    #[error("Invalid time range: {reason}")]
    InvalidTimeRange {
        /// Explanation of what is invalid
        reason: String,
    },

    /// The sampling step could not be parsed or is not positive
    #[error("Invalid interval '{interval}': {reason}")]
    InvalidInterval {
        /// The interval as supplied by the caller
        interval: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// The scope does not name a cluster known to the control plane
    #[error("Unresolvable scope '{scope}': {reason}")]
    UnresolvableScope {
        /// The scope identifier that could not be resolved
        scope: String,
        /// Why it could not be resolved
        reason: String,
    },

    /// A bearer credential could not be minted for the service account
    #[error("Credential for service account {namespace}/{service_account} in cluster '{cluster_id}' unavailable: {reason}")]
    CredentialUnavailable {
        /// Remote cluster the credential was requested in
        cluster_id: String,
        /// Namespace of the service account
        namespace: String,
        /// Name of the service account
        service_account: String,
        /// Why the credential could not be issued
        reason: String,
    },

    /// Tunnel or transport failure on the way to the backend
    #[error("Metrics backend {endpoint} in cluster '{cluster_id}' unreachable: {reason}")]
    BackendUnreachable {
        /// Remote cluster hosting the backend
        cluster_id: String,
        /// Backend service as `namespace/name`
        endpoint: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// The backend answered but rejected the query
    #[error("Metrics backend {endpoint} rejected the query: {reason}")]
    BackendQueryError {
        /// Backend service as `namespace/name`
        endpoint: String,
        /// Backend-provided reason or HTTP status
        reason: String,
    },

    /// The request deadline expired before the backend answered
    #[error("Metrics request to {endpoint} timed out after {timeout_ms}ms")]
    BackendTimeout {
        /// Backend service as `namespace/name`, or the operation when no backend was selected yet
        endpoint: String,
        /// Deadline in milliseconds
        timeout_ms: u64,
    },

    /// Two sources disagree in a way a set union cannot reconcile
    ///
    /// Reserved: the catalog merge is a pure set union and never produces it.
    #[error("Merge conflict: {reason}")]
    MergeConflict {
        /// Description of the disagreement
        reason: String,
    },
}

/// Result alias used across the gateway.
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

impl GatewayError {
    /// Shorthand for [`GatewayError::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`GatewayError::InvalidTimeRange`].
    pub fn invalid_time_range(reason: impl Into<String>) -> Self {
        Self::InvalidTimeRange {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`GatewayError::UnresolvableScope`].
    pub fn unresolvable_scope(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvableScope {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable kind tag of this error.
    ///
    /// The tag is part of the response contract and never changes for a variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "InvalidInput",
            Self::InvalidTimeRange { .. } => "InvalidTimeRange",
            Self::InvalidInterval { .. } => "InvalidInterval",
            Self::UnresolvableScope { .. } => "UnresolvableScope",
            Self::CredentialUnavailable { .. } => "CredentialUnavailable",
            Self::BackendUnreachable { .. } => "BackendUnreachable",
            Self::BackendQueryError { .. } => "BackendQueryError",
            Self::BackendTimeout { .. } => "BackendTimeout",
            Self::MergeConflict { .. } => "MergeConflict",
        }
    }

    /// Returns true for errors raised while validating the request itself.
    ///
    /// These are always produced before any registry, credential or backend call.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::InvalidTimeRange { .. } | Self::InvalidInterval { .. }
        )
    }

    /// Returns the HTTP status code used when this error is rendered to a caller.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. }
            | Self::InvalidTimeRange { .. }
            | Self::InvalidInterval { .. } => 400,
            Self::UnresolvableScope { .. } => 404,
            Self::MergeConflict { .. } => 409,
            Self::BackendQueryError { .. } => 422,
            Self::CredentialUnavailable { .. } | Self::BackendUnreachable { .. } => 502,
            Self::BackendTimeout { .. } => 504,
        }
    }
}
