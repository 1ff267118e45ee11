// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for gateway error types.

#[cfg(test)]
mod tests {
    use crate::errors::*;

    fn all_variants() -> Vec<GatewayError> {
        vec![
            GatewayError::invalid_input("expr is empty"),
            GatewayError::invalid_time_range("end before start"),
            GatewayError::InvalidInterval {
                interval: "0s".to_string(),
                reason: "must be positive".to_string(),
            },
            GatewayError::unresolvable_scope("c9", "unknown cluster"),
            GatewayError::CredentialUnavailable {
                cluster_id: "c1".to_string(),
                namespace: "cattle-prometheus".to_string(),
                service_account: "cluster-monitoring".to_string(),
                reason: "not found".to_string(),
            },
            GatewayError::BackendUnreachable {
                cluster_id: "c1".to_string(),
                endpoint: "cattle-prometheus/access-prometheus".to_string(),
                reason: "connection refused".to_string(),
            },
            GatewayError::BackendQueryError {
                endpoint: "cattle-prometheus/access-prometheus".to_string(),
                reason: "bad_data: parse error".to_string(),
            },
            GatewayError::BackendTimeout {
                endpoint: "cattle-prometheus/access-prometheus".to_string(),
                timeout_ms: 30_000,
            },
            GatewayError::MergeConflict {
                reason: "reserved".to_string(),
            },
        ]
    }

    #[test]
    fn test_credential_unavailable_message() {
        let error = GatewayError::CredentialUnavailable {
            cluster_id: "c1".to_string(),
            namespace: "cattle-prometheus".to_string(),
            service_account: "cluster-monitoring".to_string(),
            reason: "ServiceAccount not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Credential for service account cattle-prometheus/cluster-monitoring in cluster 'c1' unavailable: ServiceAccount not found"
        );
    }

    #[test]
    fn test_backend_timeout_message() {
        let error = GatewayError::BackendTimeout {
            endpoint: "cattle-prometheus/access-prometheus".to_string(),
            timeout_ms: 1500,
        };

        assert_eq!(
            error.to_string(),
            "Metrics request to cattle-prometheus/access-prometheus timed out after 1500ms"
        );
    }

    #[test]
    fn test_unresolvable_scope_message() {
        let error = GatewayError::unresolvable_scope("p1", "clusterName is empty");
        assert_eq!(
            error.to_string(),
            "Unresolvable scope 'p1': clusterName is empty"
        );
    }

    #[test]
    fn test_kinds_are_unique() {
        let mut kinds: Vec<&str> = all_variants().iter().map(GatewayError::kind).collect();
        let total = kinds.len();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), total);
    }

    #[test]
    fn test_invalid_input_family() {
        for error in all_variants() {
            let expected = matches!(
                error.kind(),
                "InvalidInput" | "InvalidTimeRange" | "InvalidInterval"
            );
            assert_eq!(error.is_invalid_input(), expected, "{}", error.kind());
            if expected {
                assert_eq!(error.status_code(), 400);
            }
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::unresolvable_scope("c9", "unknown").status_code(),
            404
        );
        assert_eq!(
            GatewayError::BackendQueryError {
                endpoint: "ns/svc".to_string(),
                reason: "bad".to_string(),
            }
            .status_code(),
            422
        );
        assert_eq!(
            GatewayError::BackendUnreachable {
                cluster_id: "c1".to_string(),
                endpoint: "ns/svc".to_string(),
                reason: "dial failed".to_string(),
            }
            .status_code(),
            502
        );
        assert_eq!(
            GatewayError::BackendTimeout {
                endpoint: "ns/svc".to_string(),
                timeout_ms: 10,
            }
            .status_code(),
            504
        );
    }
}
