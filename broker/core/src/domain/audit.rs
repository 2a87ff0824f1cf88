// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Trail
//!
//! Every verdict, on both legs of a call, is handed to an [`Auditor`] right
//! after it is produced. Auditing is best-effort: a failure is returned to the
//! caller for logging, but the verdict has already been decided and is never
//! changed by it.
//!
//! Concrete sinks live in `crate::infrastructure::audit`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use super::authorization::{AuthorizationRequest, Verdict};

pub const DEFAULT_AUDIT_LOG_PATH: &str = "/var/log/authz-broker/audit.log";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit record is missing the request")]
    MissingRequest,

    #[error("audit record is missing the verdict")]
    MissingVerdict,

    #[error("unknown audit backend '{0}' (expected stdout, file or syslog)")]
    UnknownBackend(String),

    #[error("failed to open audit backend {backend}: {source}")]
    Open {
        backend: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write audit record: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Which audit destination to use. Resolved once, at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuditBackend {
    #[default]
    Stdout,
    /// Append-only file. The parent directory is created if missing.
    File { path: PathBuf },
    /// System log. `address` is a Unix datagram socket path or a `host:port`
    /// UDP endpoint; `None` means the local `/dev/log` socket.
    Syslog { address: Option<String> },
}

impl AuditBackend {
    /// Build a backend from its identifier plus the options it may need.
    pub fn from_parts(
        kind: &str,
        path: Option<PathBuf>,
        syslog_address: Option<String>,
    ) -> Result<Self, AuditError> {
        match kind.parse::<AuditBackendKind>()? {
            AuditBackendKind::Stdout => Ok(Self::Stdout),
            AuditBackendKind::File => Ok(Self::File {
                path: path.unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_LOG_PATH)),
            }),
            AuditBackendKind::Syslog => Ok(Self::Syslog { address: syslog_address }),
        }
    }

    pub fn kind(&self) -> AuditBackendKind {
        match self {
            Self::Stdout => AuditBackendKind::Stdout,
            Self::File { .. } => AuditBackendKind::File,
            Self::Syslog { .. } => AuditBackendKind::Syslog,
        }
    }
}

impl fmt::Display for AuditBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::File { path } => write!(f, "file:{}", path.display()),
            Self::Syslog { address: Some(address) } => write!(f, "syslog:{}", address),
            Self::Syslog { address: None } => f.write_str("syslog"),
        }
    }
}

/// Backend identifier as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackendKind {
    #[default]
    Stdout,
    File,
    Syslog,
}

impl FromStr for AuditBackendKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(Self::Stdout),
            "file" => Ok(Self::File),
            "syslog" => Ok(Self::Syslog),
            other => Err(AuditError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for AuditBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdout => "stdout",
            Self::File => "file",
            Self::Syslog => "syslog",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditPhase {
    Request,
    Response,
}

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub phase: AuditPhase,
    pub method: String,
    /// Request path, query string removed.
    pub path: String,
    /// Raw request URI as sent by the client.
    pub uri: String,
    pub user: String,
    pub allow: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    /// Daemon status code, response phase only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl AuditRecord {
    /// Pair a request with its verdict. Both must be present.
    pub fn new(
        phase: AuditPhase,
        request: Option<&AuthorizationRequest>,
        verdict: Option<&Verdict>,
    ) -> Result<Self, AuditError> {
        let request = request.ok_or(AuditError::MissingRequest)?;
        let verdict = verdict.ok_or(AuditError::MissingVerdict)?;

        Ok(Self {
            timestamp: Utc::now(),
            phase,
            method: request.request_method.clone(),
            path: request.path().to_string(),
            uri: request.request_uri.clone(),
            user: request.user.clone(),
            allow: verdict.allow,
            msg: verdict.msg.clone(),
            err: verdict.err.clone(),
            status_code: match phase {
                AuditPhase::Request => None,
                AuditPhase::Response => request.response_status_code,
            },
        })
    }
}

/// Destination for audit records.
#[async_trait]
pub trait Auditor: Send + Sync {
    /// Record the request leg: client -> authorization -> audit -> daemon.
    async fn record_request(
        &self,
        request: Option<&AuthorizationRequest>,
        verdict: Option<&Verdict>,
    ) -> Result<(), AuditError>;

    /// Record the response leg: daemon -> authorization -> audit -> client.
    async fn record_response(
        &self,
        request: Option<&AuthorizationRequest>,
        verdict: Option<&Verdict>,
    ) -> Result<(), AuditError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_parts() {
        assert_eq!(AuditBackend::from_parts("stdout", None, None).unwrap(), AuditBackend::Stdout);
        assert_eq!(
            AuditBackend::from_parts("file", None, None).unwrap(),
            AuditBackend::File { path: PathBuf::from(DEFAULT_AUDIT_LOG_PATH) }
        );
        assert_eq!(
            AuditBackend::from_parts("syslog", None, Some("logs:514".into())).unwrap(),
            AuditBackend::Syslog { address: Some("logs:514".into()) }
        );
        assert!(matches!(
            AuditBackend::from_parts("kafka", None, None),
            Err(AuditError::UnknownBackend(kind)) if kind == "kafka"
        ));
    }

    #[test]
    fn test_record_requires_request_and_verdict() {
        let request = AuthorizationRequest::new("GET", "/v1.41/info", "user");
        let verdict = Verdict::allow("ok");

        assert!(matches!(
            AuditRecord::new(AuditPhase::Request, Some(&request), None),
            Err(AuditError::MissingVerdict)
        ));
        assert!(matches!(
            AuditRecord::new(AuditPhase::Request, None, Some(&verdict)),
            Err(AuditError::MissingRequest)
        ));
    }

    #[test]
    fn test_status_code_only_on_response_phase() {
        let request = AuthorizationRequest::new("GET", "/v1.41/info", "user").with_status_code(200);
        let verdict = Verdict::allow("");

        let record = AuditRecord::new(AuditPhase::Request, Some(&request), Some(&verdict)).unwrap();
        assert_eq!(record.status_code, None);

        let record = AuditRecord::new(AuditPhase::Response, Some(&request), Some(&verdict)).unwrap();
        assert_eq!(record.status_code, Some(200));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["phase"], "response");
        assert_eq!(json["status_code"], 200);
        assert_eq!(json["allow"], true);
        assert!(json.get("err").is_none());
    }

    #[test]
    fn test_record_carries_path_and_raw_uri() {
        let request = AuthorizationRequest::new("GET", "/v1.41/containers/json?all=1", "user");
        let verdict = Verdict::allow("");

        let record = AuditRecord::new(AuditPhase::Request, Some(&request), Some(&verdict)).unwrap();
        assert_eq!(record.path, "/v1.41/containers/json");
        assert_eq!(record.uri, "/v1.41/containers/json?all=1");
    }
}
