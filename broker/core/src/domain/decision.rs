// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Decision Evaluator
//!
//! Pure evaluation of one [`AuthorizationRequest`] against a [`PolicySet`]
//! snapshot:
//!
//! 1. Classify `(method, path)` into an [`Action`]. Incomplete input is an
//!    error verdict, not a denial.
//! 2. Find the first policy listing the caller. Within it, the first action
//!    pattern matching the action decides: allowed, or denied when the policy
//!    is readonly and the method is not `GET`. No matching pattern is a
//!    terminal deny; later policies are never consulted.
//! 3. No policy lists the caller: deny.

use thiserror::Error;

use super::action::Action;
use super::authorization::{AuthorizationRequest, Verdict};
use super::policy::PolicySet;
use super::route;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    #[error("request method is missing")]
    MissingMethod,

    #[error("request URI is missing")]
    MissingUri,
}

/// Classify a request, rejecting input the classifier cannot work with.
pub fn classify_request(request: &AuthorizationRequest) -> Result<Action, DecisionError> {
    if request.request_method.is_empty() {
        return Err(DecisionError::MissingMethod);
    }
    if request.request_uri.is_empty() {
        return Err(DecisionError::MissingUri);
    }
    Ok(route::classify(&request.request_method, request.path()))
}

/// Decide the request leg of a call.
pub fn decide(request: &AuthorizationRequest, policies: &PolicySet) -> Verdict {
    let action = match classify_request(request) {
        Ok(action) => action,
        Err(e) => return Verdict::error(e.to_string()),
    };
    let user = request.user.as_str();

    let Some(policy) = policies.policy_for(user) else {
        return Verdict::deny(format!("no policy applied (user: '{}' action: '{}')", user, action));
    };

    if policy.matching_pattern(action).is_none() {
        return Verdict::deny(format!(
            "action '{}' denied for user '{}' by policy '{}'",
            action, user, policy.name
        ));
    }

    if policy.readonly && request.request_method != "GET" {
        return Verdict::deny(format!(
            "action '{}' not allowed for user '{}' by readonly policy '{}'",
            action, user, policy.name
        ));
    }

    Verdict::allow(format!(
        "action '{}' allowed for user '{}' by policy '{}'",
        action, user, policy.name
    ))
}

/// Decide the response leg of a call. Responses are never filtered.
pub fn decide_response(_request: &AuthorizationRequest) -> Verdict {
    Verdict::allow("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policies(source: &str) -> PolicySet {
        PolicySet::parse(source).0
    }

    #[test]
    fn test_policy_apply() {
        let set = policies(
            r#"{"name":"policy_1","users":["user_1","user_2"],"actions":["container_create","docker_version"]}
               {"name":"policy_2","users":["user_3","user_4"],"actions":["container_create","container_exec"]}
               {"name":"policy_3","users":["user_5"],"actions":["container"]}
               {"name":"policy_4","users":["user_6"],"actions":["container"], "readonly":true }"#,
        );

        let cases = [
            ("GET", "/v1.21/version", "user_1", true, "policy_1"),
            ("GET", "/v1.21/version", "user_3", false, "policy_2"),
            ("GET", "/v1.21/version", "user_5", false, "policy_3"),
            ("GET", "/v1.21/version", "user_7", false, "no policy applied"),
            ("GET", "/v1.21/containers/id/json", "user_5", true, "policy_3"),
            ("GET", "/v1.21/containers/id/json", "user_6", true, "policy_4"),
            ("POST", "/v1.21/containers/id/rename", "user_6", false, "policy_4"),
        ];

        for (method, uri, user, allow, expected) in cases {
            let verdict = decide(&AuthorizationRequest::new(method, uri, user), &set);
            assert_eq!(verdict.allow, allow, "{} {} as {}: {}", method, uri, user, verdict.msg);
            assert!(verdict.msg.contains(expected), "message '{}' lacks '{}'", verdict.msg, expected);
            assert!(!verdict.is_error());
        }
    }

    #[test]
    fn test_readonly_denial_message() {
        let set = policies(r#"{"name":"p2","users":["bob"],"actions":["container"],"readonly":true}"#);
        let verdict = decide(&AuthorizationRequest::new("POST", "/v1.21/containers/abc/rename", "bob"), &set);
        assert!(!verdict.allow);
        assert!(verdict.msg.contains("not allowed"));
        assert!(verdict.msg.contains("readonly policy 'p2'"));
    }

    #[test]
    fn test_unrecognized_action_is_denied_even_by_wildcard() {
        let set = policies(r#"{"name":"root","users":["admin"],"actions":[".*"]}"#);

        let verdict = decide(&AuthorizationRequest::new("GET", "/v1.41/unknown/endpoint", "admin"), &set);
        assert!(!verdict.allow);
        assert!(verdict.msg.contains("'none'"));

        let verdict = decide(&AuthorizationRequest::new("DELETE", "/v1.41/networks/n1", "admin"), &set);
        assert!(verdict.allow);
    }

    #[test]
    fn test_incomplete_request_is_an_error_not_a_denial() {
        let set = policies(r#"{"name":"root","users":["admin"],"actions":[".*"]}"#);

        let verdict = decide(&AuthorizationRequest::new("", "/v1.41/info", "admin"), &set);
        assert!(verdict.is_error());
        assert_eq!(verdict.err.as_deref(), Some("request method is missing"));

        let verdict = decide(&AuthorizationRequest::new("GET", "", "admin"), &set);
        assert_eq!(verdict.err.as_deref(), Some("request URI is missing"));
    }

    #[test]
    fn test_query_string_does_not_affect_classification() {
        let set = policies(r#"{"name":"viewer","users":["v"],"actions":["container_list"]}"#);
        let verdict = decide(&AuthorizationRequest::new("GET", "/v1.41/containers/json?all=1&size=0", "v"), &set);
        assert!(verdict.allow);
    }

    #[test]
    fn test_response_leg_always_allowed() {
        let request = AuthorizationRequest::new("DELETE", "/v1.41/containers/x", "nobody").with_status_code(204);
        let verdict = decide_response(&request);
        assert!(verdict.allow);
        assert!(!verdict.is_error());
    }
}
