// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use authz_broker_core::application::authorizer::{Authorizer, BasicAuthorizer};
use authz_broker_core::application::authz_service::AuthzService;
use authz_broker_core::domain::audit::{AuditBackend, AuditPhase, AuditRecord};
use authz_broker_core::infrastructure::audit::BasicAuditor;
use authz_broker_core::infrastructure::policy_store::PolicyStore;
use authz_broker_core::presentation::plugin_api;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct Harness {
    app: Router,
    audit_log: PathBuf,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let policy = dir.path().join("policy.json");
    std::fs::write(
        &policy,
        r#"{"name":"ops","users":["alice"],"actions":["container"]}
{"name":"viewer","users":["bob"],"actions":["container"],"readonly":true}"#,
    )
    .unwrap();
    let audit_log = dir.path().join("audit").join("audit.log");

    let store = Arc::new(PolicyStore::new(&policy));
    let authorizer = Arc::new(BasicAuthorizer::new(store, None));
    authorizer.init().await.unwrap();
    let auditor = Arc::new(BasicAuditor::new(AuditBackend::File { path: audit_log.clone() }));

    Harness {
        app: plugin_api::app(AuthzService::new(authorizer, auditor)),
        audit_log,
        _dir: dir,
    }
}

async fn post(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/vnd.docker.plugins.v1.2+json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn audit_records(harness: &Harness) -> Vec<AuditRecord> {
    std::fs::read_to_string(&harness.audit_log)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_activate_advertises_authz() {
    let harness = harness().await;
    let (status, body) = post(&harness.app, "/Plugin.Activate", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Implements": ["authz"]}));
}

#[tokio::test]
async fn test_request_allowed_and_audited() {
    let harness = harness().await;
    let request = json!({
        "User": "alice",
        "RequestMethod": "POST",
        "RequestURI": "/v1.41/containers/create?name=web",
    });

    let (status, body) = post(&harness.app, "/AuthZPlugin.AuthZReq", request.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Allow"], true);
    assert!(body["Msg"].as_str().unwrap().contains("container_create"));
    assert!(body.get("Err").is_none());

    let records = audit_records(&harness);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].phase, AuditPhase::Request);
    assert_eq!(records[0].user, "alice");
    assert!(records[0].allow);
}

#[tokio::test]
async fn test_request_denied_is_not_an_error() {
    let harness = harness().await;
    let request = json!({
        "User": "bob",
        "RequestMethod": "POST",
        "RequestURI": "/v1.41/containers/web/rename?name=api",
    });

    let (status, body) = post(&harness.app, "/AuthZPlugin.AuthZReq", request.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Allow"], false);
    assert!(body["Msg"].as_str().unwrap().contains("readonly policy 'viewer'"));
}

#[tokio::test]
async fn test_response_leg_allowed_with_status_code_audited() {
    let harness = harness().await;
    let response = json!({
        "User": "carol",
        "RequestMethod": "DELETE",
        "RequestURI": "/v1.41/images/ubuntu",
        "ResponseStatusCode": 409,
    });

    let (status, body) = post(&harness.app, "/AuthZPlugin.AuthZRes", response.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Allow"], true);

    let records = audit_records(&harness);
    assert_eq!(records[0].phase, AuditPhase::Response);
    assert_eq!(records[0].status_code, Some(409));
}

#[tokio::test]
async fn test_malformed_body_is_an_error_verdict() {
    let harness = harness().await;
    let (status, body) = post(&harness.app, "/AuthZPlugin.AuthZReq", "{not json").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["Allow"], false);
    assert!(body["Err"].as_str().unwrap().contains("invalid authorization request"));

    // Without a request there is nothing to record.
    assert!(!harness.audit_log.exists());
}

#[tokio::test]
async fn test_missing_method_is_an_error_verdict() {
    let harness = harness().await;
    let request = json!({"User": "alice", "RequestURI": "/v1.41/info"});

    let (status, body) = post(&harness.app, "/AuthZPlugin.AuthZReq", request.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["Err"], "request method is missing");
}
