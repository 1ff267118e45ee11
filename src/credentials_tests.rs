// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for credentials and the `TokenRequest` issuer.

#[cfg(test)]
mod tests {
    use crate::constants::TOKEN_FINGERPRINT_LEN;
    use crate::credentials::*;
    use crate::registry::ClusterHandle;
    use crate::scope::ServiceAccountRef;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_PATH: &str =
        "/api/v1/namespaces/cattle-prometheus/serviceaccounts/cluster-monitoring/token";

    fn sa() -> ServiceAccountRef {
        ServiceAccountRef {
            namespace: "cattle-prometheus".to_string(),
            name: "cluster-monitoring".to_string(),
        }
    }

    fn cluster() -> ClusterHandle {
        ClusterHandle {
            id: "c1".to_string(),
            tunnel_endpoint: Url::parse("http://tunnel.local:3128").unwrap(),
            kube_context: Some("c1".to_string()),
        }
    }

    fn issuer_for(server: &MockServer) -> TokenRequestIssuer {
        let config = kube::Config::new(server.uri().parse().unwrap());
        let client = kube::Client::try_from(config).unwrap();
        TokenRequestIssuer::with_client(
            CredentialSettings {
                token_expiration_secs: 900,
                audiences: vec!["prometheus".to_string()],
                kubeconfig: None,
            },
            client,
        )
    }

    fn token_response(token: &str) -> serde_json::Value {
        json!({
            "apiVersion": "authentication.k8s.io/v1",
            "kind": "TokenRequest",
            "metadata": { "name": "cluster-monitoring", "namespace": "cattle-prometheus" },
            "spec": { "audiences": ["prometheus"], "expirationSeconds": 900 },
            "status": { "token": token, "expirationTimestamp": "2026-10-17T12:00:00Z" }
        })
    }

    #[test]
    fn test_credential_subject() {
        let credential = Credential::new("secret-token", &sa());
        assert_eq!(
            credential.subject,
            "system:serviceaccount:cattle-prometheus:cluster-monitoring"
        );
        assert_eq!(credential.issuing_namespace, "cattle-prometheus");
        assert_eq!(credential.token(), "secret-token");
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::new("secret-token", &sa());
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains(&credential.fingerprint()));
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = Credential::new("token-a", &sa());
        let b = Credential::new("token-b", &sa());
        assert_eq!(a.fingerprint().len(), TOKEN_FINGERPRINT_LEN);
        assert_eq!(a.fingerprint(), Credential::new("token-a", &sa()).fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[tokio::test]
    async fn test_issue_posts_token_request_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_partial_json(json!({
                "kind": "TokenRequest",
                "spec": { "expirationSeconds": 900, "audiences": ["prometheus"] }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(token_response("issued-token")))
            .expect(1)
            .mount(&server)
            .await;

        let credential = issuer_for(&server).issue(&cluster(), &sa()).await.unwrap();

        assert_eq!(credential.token(), "issued-token");
        assert_eq!(
            credential.subject,
            "system:serviceaccount:cattle-prometheus:cluster-monitoring"
        );

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.is_object(), "request body must be a TokenRequest object");
    }

    #[tokio::test]
    async fn test_empty_token_is_credential_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(token_response("")))
            .mount(&server)
            .await;

        let err = issuer_for(&server)
            .issue(&cluster(), &sa())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "CredentialUnavailable");
        assert!(err.to_string().contains("no token"));
    }

    #[tokio::test]
    async fn test_missing_service_account_is_credential_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "kind": "Status",
                "apiVersion": "v1",
                "metadata": {},
                "status": "Failure",
                "message": "serviceaccounts \"cluster-monitoring\" not found",
                "reason": "NotFound",
                "code": 404
            })))
            .mount(&server)
            .await;

        let err = issuer_for(&server)
            .issue(&cluster(), &sa())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "CredentialUnavailable");
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("cattle-prometheus/cluster-monitoring"));
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_is_credential_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = TokenRequestIssuer::new(CredentialSettings {
            kubeconfig: Some(dir.path().join("does-not-exist")),
            ..CredentialSettings::default()
        });

        let err = issuer.issue(&cluster(), &sa()).await.unwrap_err();
        assert_eq!(err.kind(), "CredentialUnavailable");
        assert!(err.to_string().contains("kubeconfig"));
    }
}
