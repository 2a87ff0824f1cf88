// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Policy source change notification.
//!
//! Triggers flow through one `mpsc` channel into a reload task that owns the
//! receiving end and calls [`PolicyStore::on_change_notification`]. Producers:
//!
//! - a poller comparing the source's modification time and length,
//! - `SIGHUP` (Unix only).
//!
//! Reloads are not rate limited. A burst of triggers may cause redundant
//! reloads, which is harmless because a reload is idempotent.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::policy_store::PolicyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    SourceChanged,
    Signal,
}

/// Identity of the policy source at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl SourceStamp {
    fn read(path: &Path) -> Option<Self> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

/// Running watcher tasks. Dropping the handle does not stop them; call
/// [`shutdown`](Self::shutdown).
pub struct PolicyWatcher {
    tasks: Vec<JoinHandle<()>>,
    trigger: mpsc::Sender<ReloadTrigger>,
}

impl PolicyWatcher {
    /// Start the reload task and its producers. `poll_interval` of `None`
    /// disables polling.
    pub fn spawn(store: Arc<PolicyStore>, poll_interval: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let mut tasks = vec![tokio::spawn(reload_loop(store.clone(), rx))];

        if let Some(interval) = poll_interval {
            tasks.push(tokio::spawn(poll_source(
                store.source().to_path_buf(),
                interval,
                tx.clone(),
            )));
        }

        #[cfg(unix)]
        tasks.push(tokio::spawn(forward_sighup(tx.clone())));

        info!(
            path = %store.source().display(),
            poll_interval_secs = poll_interval.map(|d| d.as_secs()),
            "Watching policy source for changes"
        );

        Self { tasks, trigger: tx }
    }

    /// Request a reload as if the source had changed.
    pub async fn trigger(&self, reason: ReloadTrigger) {
        if self.trigger.send(reason).await.is_err() {
            warn!("Reload task has stopped; trigger dropped");
        }
    }

    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

async fn reload_loop(store: Arc<PolicyStore>, mut rx: mpsc::Receiver<ReloadTrigger>) {
    while let Some(trigger) = rx.recv().await {
        debug!(?trigger, "Reloading policy source");
        store.on_change_notification();
    }
}

async fn poll_source(path: PathBuf, interval: Duration, tx: mpsc::Sender<ReloadTrigger>) {
    let mut last = SourceStamp::read(&path);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let stamp = SourceStamp::read(&path);
        if stamp == last {
            continue;
        }
        last = stamp;

        // A vanished source is reported by the reload itself.
        if tx.send(ReloadTrigger::SourceChanged).await.is_err() {
            break;
        }
    }
}

#[cfg(unix)]
async fn forward_sighup(tx: mpsc::Sender<ReloadTrigger>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGHUP handler; signal reloads disabled");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        info!("Received SIGHUP, reloading policies");
        if tx.send(ReloadTrigger::Signal).await.is_err() {
            break;
        }
    }
}
