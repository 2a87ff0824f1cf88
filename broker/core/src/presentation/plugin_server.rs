// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Plugin socket server
//
// Serves the plugin router on `<plugin_dir>/<name>.sock`, where the Docker
// daemon discovers authorization plugins.

use axum::Router;
use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

const PLUGIN_DIR_MODE: u32 = 0o750;

#[derive(Debug, Error)]
pub enum PluginServerError {
    #[error("failed to prepare plugin directory {path}: {source}")]
    PluginDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove stale socket {path}: {source}")]
    StaleSocket {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("plugin server failed: {0}")]
    Serve(#[source] std::io::Error),
}

pub struct PluginServer {
    socket_path: PathBuf,
}

impl PluginServer {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Create the socket directory, drop a stale socket and bind.
    pub fn bind(&self) -> Result<UnixListener, PluginServerError> {
        if let Some(dir) = self.socket_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                std::fs::create_dir_all(dir)
                    .and_then(|_| std::fs::set_permissions(dir, std::fs::Permissions::from_mode(PLUGIN_DIR_MODE)))
                    .map_err(|source| PluginServerError::PluginDir {
                        path: dir.to_path_buf(),
                        source,
                    })?;
            }
        }

        if self.socket_path.exists() {
            warn!(path = %self.socket_path.display(), "Removing stale plugin socket");
            std::fs::remove_file(&self.socket_path).map_err(|source| PluginServerError::StaleSocket {
                path: self.socket_path.clone(),
                source,
            })?;
        }

        UnixListener::bind(&self.socket_path).map_err(|source| PluginServerError::Bind {
            path: self.socket_path.clone(),
            source,
        })
    }

    /// Serve `app` until `shutdown` resolves, then remove the socket.
    pub async fn serve<F>(&self, app: Router, shutdown: F) -> Result<(), PluginServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind()?;
        info!(socket = %self.socket_path.display(), "Authorization plugin listening");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(PluginServerError::Serve);

        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            warn!(error = %e, path = %self.socket_path.display(), "Failed to remove plugin socket");
        }
        result
    }
}
