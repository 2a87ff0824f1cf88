// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request and verdict types exchanged with the Docker daemon.
//!
//! Both mirror the daemon's authorization plugin wire format (`PascalCase`
//! JSON). Fields the broker does not evaluate (bodies, peer certificates) are
//! ignored on decode.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One call observed by the daemon, on either the request or the response leg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthorizationRequest {
    /// Authenticated caller identity. Empty when the daemon has none.
    #[serde(default)]
    pub user: String,
    #[serde(default, rename = "UserAuthNMethod")]
    pub user_authn_method: String,
    #[serde(default)]
    pub request_method: String,
    #[serde(default, rename = "RequestURI")]
    pub request_uri: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub request_headers: HashMap<String, String>,
    /// Set by the daemon on the response leg only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status_code: Option<u16>,
}

impl AuthorizationRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            request_method: method.into(),
            request_uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.response_status_code = Some(status);
        self
    }

    /// The request URI without its query string or fragment.
    pub fn path(&self) -> &str {
        request_path(&self.request_uri)
    }
}

/// Strip the query string and fragment from a request URI.
pub fn request_path(uri: &str) -> &str {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    &uri[..end]
}

/// Outcome of one authorization decision.
///
/// `err` is set only when the decision machinery itself failed. A legitimate
/// denial has `allow == false` and no `err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Verdict {
    pub allow: bool,
    #[serde(default)]
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl Verdict {
    pub fn allow(msg: impl Into<String>) -> Self {
        Self { allow: true, msg: msg.into(), err: None }
    }

    pub fn deny(msg: impl Into<String>) -> Self {
        Self { allow: false, msg: msg.into(), err: None }
    }

    pub fn error(err: impl Into<String>) -> Self {
        Self { allow: false, msg: String::new(), err: Some(err.into()) }
    }

    pub fn is_error(&self) -> bool {
        self.err.as_deref().is_some_and(|e| !e.is_empty())
    }
}
