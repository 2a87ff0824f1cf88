// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Authorize-then-audit service used by the plugin transport.
//!
//! Every verdict is recorded immediately after it is produced. An audit
//! failure is logged and the verdict is returned unchanged.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::audit::{AuditPhase, Auditor};
use crate::domain::authorization::{AuthorizationRequest, Verdict};

use super::authorizer::Authorizer;

#[derive(Clone)]
pub struct AuthzService {
    authorizer: Arc<dyn Authorizer>,
    auditor: Arc<dyn Auditor>,
}

impl AuthzService {
    pub fn new(authorizer: Arc<dyn Authorizer>, auditor: Arc<dyn Auditor>) -> Self {
        Self { authorizer, auditor }
    }

    pub async fn authorize_request(&self, request: &AuthorizationRequest) -> Verdict {
        let verdict = self.authorizer.authorize_request(request);
        debug!(
            user = %request.user,
            method = %request.request_method,
            uri = %request.request_uri,
            allow = verdict.allow,
            msg = %verdict.msg,
            "Request authorized"
        );
        self.audit(AuditPhase::Request, Some(request), &verdict).await;
        verdict
    }

    pub async fn authorize_response(&self, request: &AuthorizationRequest) -> Verdict {
        let verdict = self.authorizer.authorize_response(request);
        self.audit(AuditPhase::Response, Some(request), &verdict).await;
        verdict
    }

    /// Answer a call whose payload could not be decoded.
    pub async fn reject_malformed(&self, phase: AuditPhase, reason: impl Into<String>) -> Verdict {
        let verdict = Verdict::error(reason);
        warn!(?phase, err = ?verdict.err, "Malformed authorization payload");
        self.audit(phase, None, &verdict).await;
        verdict
    }

    async fn audit(&self, phase: AuditPhase, request: Option<&AuthorizationRequest>, verdict: &Verdict) {
        let result = match phase {
            AuditPhase::Request => self.auditor.record_request(request, Some(verdict)).await,
            AuditPhase::Response => self.auditor.record_response(request, Some(verdict)).await,
        };
        if let Err(e) = result {
            warn!(error = %e, ?phase, "Failed to record audit entry");
        }
    }
}
