// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Plugin server command
//!
//! Loads policies, opens nothing else eagerly (the audit backend is opened on
//! the first record) and serves the plugin socket until SIGINT or SIGTERM.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use authz_broker_core::application::authorizer::{Authorizer, BasicAuthorizer};
use authz_broker_core::application::authz_service::AuthzService;
use authz_broker_core::domain::config::BrokerConfig;
use authz_broker_core::infrastructure::audit::BasicAuditor;
use authz_broker_core::infrastructure::policy_store::PolicyStore;
use authz_broker_core::presentation::plugin_api;
use authz_broker_core::presentation::plugin_server::PluginServer;

pub async fn run(config: BrokerConfig) -> Result<()> {
    config.validate().context("Configuration validation failed")?;

    let store = Arc::new(PolicyStore::new(&config.policy_file));
    let authorizer = Arc::new(BasicAuthorizer::new(store, config.poll_interval()));
    authorizer
        .init()
        .await
        .context("Failed to load initial policies")?;

    let auditor = Arc::new(BasicAuditor::new(config.audit.to_backend()));
    info!(backend = %auditor.backend(), "Audit backend selected");

    let service = AuthzService::new(authorizer.clone(), auditor);
    let server = PluginServer::new(config.plugin.socket_path());

    server
        .serve(plugin_api::app(service), shutdown_signal())
        .await
        .with_context(|| format!("Plugin server on {} failed", server.socket_path().display()))?;

    authorizer.shutdown().await;
    info!("Authorization broker stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
