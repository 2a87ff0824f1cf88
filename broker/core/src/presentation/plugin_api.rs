// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Docker authorization plugin endpoints.
//!
//! | Path | Handler |
//! |------|---------|
//! | `POST /Plugin.Activate` | advertises the `authz` capability |
//! | `POST /AuthZPlugin.AuthZReq` | request leg |
//! | `POST /AuthZPlugin.AuthZRes` | response leg |
//!
//! Bodies are decoded by hand: the daemon sends a vendor content type that
//! the `Json` extractor would refuse. A verdict carrying `Err` is answered
//! with HTTP 500.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::application::authz_service::AuthzService;
use crate::domain::audit::AuditPhase;
use crate::domain::authorization::{AuthorizationRequest, Verdict};

pub const ACTIVATE_PATH: &str = "/Plugin.Activate";
pub const AUTHZ_REQUEST_PATH: &str = "/AuthZPlugin.AuthZReq";
pub const AUTHZ_RESPONSE_PATH: &str = "/AuthZPlugin.AuthZRes";

pub fn app(service: AuthzService) -> Router {
    Router::new()
        .route(ACTIVATE_PATH, post(activate))
        .route(AUTHZ_REQUEST_PATH, post(authz_request))
        .route(AUTHZ_RESPONSE_PATH, post(authz_response))
        .with_state(Arc::new(service))
}

async fn activate() -> impl IntoResponse {
    Json(json!({ "Implements": ["authz"] }))
}

async fn authz_request(State(service): State<Arc<AuthzService>>, body: Bytes) -> impl IntoResponse {
    let verdict = match serde_json::from_slice::<AuthorizationRequest>(&body) {
        Ok(request) => service.authorize_request(&request).await,
        Err(e) => {
            service
                .reject_malformed(AuditPhase::Request, format!("invalid authorization request: {}", e))
                .await
        }
    };
    reply(verdict)
}

async fn authz_response(State(service): State<Arc<AuthzService>>, body: Bytes) -> impl IntoResponse {
    let verdict = match serde_json::from_slice::<AuthorizationRequest>(&body) {
        Ok(request) => service.authorize_response(&request).await,
        Err(e) => {
            service
                .reject_malformed(AuditPhase::Response, format!("invalid authorization response: {}", e))
                .await
        }
    };
    reply(verdict)
}

fn reply(verdict: Verdict) -> (StatusCode, Json<Verdict>) {
    let status = if verdict.is_error() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(verdict))
}
