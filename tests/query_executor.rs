// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the range query pipeline.
//!
//! The cluster registry, identity service and tunnel are fakes; the Prometheus
//! backend is a wiremock server.

mod common;

use common::{executor, matrix_body, token_for, FakeIdentity, FakeTunnel, CLUSTER_ID};
use metrics_gateway::errors::GatewayError;
use metrics_gateway::scope::{BackendNaming, Scope};
use metrics_gateway::time_window::TimeWindowResolver;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_cluster_query_with_default_window() {
    let server = MockServer::start().await;
    let naming = BackendNaming::default();
    let token = token_for(&naming.cluster_service_account());

    Mock::given(method("GET"))
        .and(path("/cattle-prometheus/api/v1/query_range"))
        .and(query_param("query", "up"))
        .and(query_param("step", "5"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(matrix_body(json!([
            { "metric": { "__name__": "up", "instance": "node-1" }, "values": [[1700000000, "1"]] }
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::new(&server.uri());
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let series = executor(identity.clone(), tunnel.clone(), TIMEOUT)
        .execute(Scope::cluster(CLUSTER_ID), window, "up")
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].name(), Some("up"));
    assert_eq!(identity.issued(), 1);
    assert_eq!(identity.service_accounts()[0], naming.cluster_service_account());
    assert_eq!(tunnel.dials(), 1);
    assert_eq!(tunnel.active(), 0, "lease must be released after the query");
}

#[tokio::test]
async fn test_project_query_uses_project_backend_and_account() {
    let server = MockServer::start().await;
    Mock::given(path("/cattle-prometheus-p1/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(200).set_body_json(matrix_body(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::new(&server.uri());
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let series = executor(identity.clone(), tunnel.clone(), TIMEOUT)
        .execute(Scope::from_project_ref("c1:p1"), window, "up")
        .await
        .unwrap();

    assert!(series.is_empty());
    let accounts = identity.service_accounts();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].namespace, "cattle-prometheus-p1");
    assert_eq!(accounts[0].name, "project-monitoring");
    assert_eq!(tunnel.dialed_namespaces(), vec!["cattle-prometheus-p1"]);
}

#[tokio::test]
async fn test_unknown_cluster_makes_no_calls() {
    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::new("http://unused.invalid");
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let err = executor(identity.clone(), tunnel.clone(), TIMEOUT)
        .execute(Scope::cluster("c-unknown"), window, "up")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "UnresolvableScope");
    assert_eq!(identity.issued(), 0);
    assert_eq!(tunnel.dials(), 0);
}

#[tokio::test]
async fn test_project_ref_without_cluster_is_unresolvable() {
    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::new("http://unused.invalid");
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let err = executor(identity.clone(), tunnel, TIMEOUT)
        .execute(Scope::from_project_ref("p1"), window, "up")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "UnresolvableScope");
    assert_eq!(identity.issued(), 0);
}

#[tokio::test]
async fn test_empty_expression_is_invalid_input() {
    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::new("http://unused.invalid");
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let err = executor(identity.clone(), tunnel.clone(), TIMEOUT)
        .execute(Scope::cluster(CLUSTER_ID), window, "  ")
        .await
        .unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(identity.issued(), 0);
    assert_eq!(tunnel.dials(), 0);
}

#[tokio::test]
async fn test_credential_failure_propagates_without_dial() {
    let identity = FakeIdentity::failing(GatewayError::CredentialUnavailable {
        cluster_id: CLUSTER_ID.to_string(),
        namespace: "cattle-prometheus".to_string(),
        service_account: "cluster-monitoring".to_string(),
        reason: "serviceaccounts \"cluster-monitoring\" not found".to_string(),
    });
    let tunnel = FakeTunnel::new("http://unused.invalid");
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let err = executor(identity.clone(), tunnel.clone(), TIMEOUT)
        .execute(Scope::cluster(CLUSTER_ID), window, "up")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "CredentialUnavailable");
    assert_eq!(identity.issued(), 1, "no retry");
    assert_eq!(tunnel.dials(), 0);
}

#[tokio::test]
async fn test_tunnel_dial_failure_releases_transport() {
    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::failing();
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let err = executor(identity, tunnel.clone(), TIMEOUT)
        .execute(Scope::cluster(CLUSTER_ID), window, "up")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "BackendUnreachable");
    assert_eq!(tunnel.dials(), 1, "no retry");
    assert_eq!(tunnel.opened(), 1);
    assert_eq!(tunnel.active(), 0);
}

#[tokio::test]
async fn test_backend_rejection_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(path("/cattle-prometheus/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "errorType": "bad_data",
            "error": "1:5: parse error: unclosed left parenthesis"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::new(&server.uri());
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let err = executor(identity, tunnel.clone(), TIMEOUT)
        .execute(Scope::cluster(CLUSTER_ID), window, "sum(")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "BackendQueryError");
    assert!(err.to_string().contains("unclosed left parenthesis"));
    assert_eq!(tunnel.active(), 0);
}

#[tokio::test]
async fn test_deadline_expiry_is_timeout_and_releases_lease() {
    let server = MockServer::start().await;
    Mock::given(path("/cattle-prometheus/api/v1/query_range"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(matrix_body(json!([])))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::new(&server.uri());
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let started = std::time::Instant::now();
    let err = executor(identity, tunnel.clone(), Duration::from_millis(200))
        .execute(Scope::cluster(CLUSTER_ID), window, "up")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "BackendTimeout");
    assert!(err.to_string().contains("timed out after 200ms"));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(tunnel.opened(), 1);
    assert_eq!(tunnel.active(), 0);
}

#[tokio::test]
async fn test_oversized_timeout_does_not_overflow_deadline() {
    let server = MockServer::start().await;
    Mock::given(path("/cattle-prometheus/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(200).set_body_json(matrix_body(json!([
            { "metric": { "__name__": "up" }, "values": [[1700000000, "1"]] }
        ]))))
        .mount(&server)
        .await;

    let identity = FakeIdentity::new();
    let tunnel = FakeTunnel::new(&server.uri());
    let window = TimeWindowResolver::default().resolve("", "", "").unwrap();

    let series = executor(identity, tunnel.clone(), Duration::MAX)
        .execute(Scope::cluster(CLUSTER_ID), window, "up")
        .await
        .unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(tunnel.active(), 0);
}
