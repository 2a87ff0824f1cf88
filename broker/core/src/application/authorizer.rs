// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Authorizer
//!
//! The seam between the plugin transport and the decision logic. An
//! [`Authorizer`] must be initialized before the first call is accepted;
//! after that both entry points are cheap, in-memory and safe to call
//! concurrently.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::authorization::{AuthorizationRequest, Verdict};
use crate::domain::decision;
use crate::infrastructure::policy_store::{PolicyStore, PolicyStoreError};
use crate::infrastructure::policy_watcher::PolicyWatcher;

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Load the initial policy state and subscribe to change notifications.
    async fn init(&self) -> Result<(), PolicyStoreError>;

    /// Decide a call before it reaches the daemon.
    fn authorize_request(&self, request: &AuthorizationRequest) -> Verdict;

    /// Decide a daemon response before it reaches the client.
    fn authorize_response(&self, request: &AuthorizationRequest) -> Verdict;
}

/// Policy-file backed authorizer.
pub struct BasicAuthorizer {
    store: Arc<PolicyStore>,
    poll_interval: Option<Duration>,
    watcher: Mutex<Option<PolicyWatcher>>,
}

impl BasicAuthorizer {
    pub fn new(store: Arc<PolicyStore>, poll_interval: Option<Duration>) -> Self {
        Self {
            store,
            poll_interval,
            watcher: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    /// Stop watching the policy source.
    pub async fn shutdown(&self) {
        if let Some(watcher) = self.watcher.lock().await.take() {
            watcher.shutdown();
        }
    }
}

#[async_trait]
impl Authorizer for BasicAuthorizer {
    async fn init(&self) -> Result<(), PolicyStoreError> {
        let report = self.store.load()?;
        info!(
            path = %self.store.source().display(),
            policies = self.store.current().len(),
            clean = report.is_clean(),
            "Authorizer initialized"
        );

        let mut watcher = self.watcher.lock().await;
        if watcher.is_none() {
            *watcher = Some(PolicyWatcher::spawn(self.store.clone(), self.poll_interval));
        }
        Ok(())
    }

    fn authorize_request(&self, request: &AuthorizationRequest) -> Verdict {
        decision::decide(request, &self.store.current())
    }

    fn authorize_response(&self, request: &AuthorizationRequest) -> Verdict {
        decision::decide_response(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_loads_policies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, r#"{"name":"ops","users":["alice"],"actions":["container"]}"#).unwrap();

        let authorizer = BasicAuthorizer::new(Arc::new(PolicyStore::new(&path)), None);
        let request = AuthorizationRequest::new("GET", "/v1.41/containers/web/json", "alice");

        assert!(!authorizer.authorize_request(&request).allow);
        authorizer.init().await.unwrap();
        assert!(authorizer.authorize_request(&request).allow);
        assert!(authorizer.authorize_response(&request).allow);

        authorizer.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_fails_on_unreadable_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PolicyStore::new(dir.path().join("missing.json")));
        let authorizer = BasicAuthorizer::new(store, None);
        assert!(authorizer.init().await.is_err());
    }
}
