// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Store
//!
//! Holds the authoritative [`PolicySet`] behind an [`ArcSwap`]. Readers take
//! a snapshot with [`PolicyStore::current`] and never block; a reload parses
//! the whole source into a fresh set and publishes it with a single pointer
//! swap, so a reader sees either the old set or the new one, never a mix.
//!
//! A failed reload leaves the previously published set in place.

use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::policy::{LoadReport, PolicySet};

#[derive(Debug, Error)]
pub enum PolicyStoreError {
    #[error("failed to read policy source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct PolicyStore {
    source: PathBuf,
    current: ArcSwap<PolicySet>,
}

impl PolicyStore {
    /// Create a store with an empty set. Nothing is allowed until the first
    /// successful [`load`](Self::load).
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            current: ArcSwap::from_pointee(PolicySet::empty()),
        }
    }

    /// Create a store and perform the initial load.
    pub fn open(source: impl Into<PathBuf>) -> Result<Self, PolicyStoreError> {
        let store = Self::new(source);
        store.load()?;
        Ok(store)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Read the source, build a new set and publish it. Lines are decoded
    /// one at a time, so a malformed line never hides the ones after it.
    pub fn load(&self) -> Result<LoadReport, PolicyStoreError> {
        let content = std::fs::read(&self.source).map_err(|source| PolicyStoreError::Read {
            path: self.source.clone(),
            source,
        })?;

        let (set, report) = PolicySet::parse(&content);
        let count = set.len();
        self.current.store(Arc::new(set));

        info!(
            path = %self.source.display(),
            policies = count,
            skipped = report.skipped.len(),
            invalid_patterns = report.invalid_patterns.len(),
            duplicate_users = report.duplicate_users.len(),
            "Policy set loaded"
        );
        Ok(report)
    }

    /// Snapshot of the active set. Safe to call during a reload.
    pub fn current(&self) -> Arc<PolicySet> {
        self.current.load_full()
    }

    /// Publish `set` directly, bypassing the source.
    pub fn replace(&self, set: PolicySet) {
        self.current.store(Arc::new(set));
    }

    /// Reload in response to a change notification. Failures are logged and
    /// the previous set stays authoritative.
    pub fn on_change_notification(&self) {
        match self.load() {
            Ok(report) if !report.skipped.is_empty() => {
                warn!(
                    path = %self.source.display(),
                    skipped = report.skipped.len(),
                    "Policy set reloaded with skipped records"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(
                    error = %e,
                    policies = self.current.load().len(),
                    "Policy reload failed; keeping previous policy set"
                );
            }
        }
    }
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("source", &self.source)
            .field("policies", &self.current.load().len())
            .finish()
    }
}
