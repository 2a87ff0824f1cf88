// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Audit sinks.
//!
//! [`BasicAuditor`] opens its backend on first use and memoizes the handle.
//! A failed open is returned to the caller and retried on the next record;
//! once a handle exists it is reused for the life of the process. Writes are
//! serialized so concurrent records never interleave.

pub mod syslog;

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::domain::audit::{AuditBackend, AuditError, AuditPhase, AuditRecord, Auditor};
use crate::domain::authorization::{AuthorizationRequest, Verdict};

use self::syslog::SyslogWriter;

enum Sink {
    Stdout(Mutex<tokio::io::Stdout>),
    File(Mutex<tokio::fs::File>),
    Syslog(SyslogWriter),
}

impl Sink {
    async fn open(backend: &AuditBackend) -> Result<Self, AuditError> {
        match backend {
            AuditBackend::Stdout => Ok(Self::Stdout(Mutex::new(tokio::io::stdout()))),
            AuditBackend::File { path } => Ok(Self::File(Mutex::new(open_append(path).await?))),
            AuditBackend::Syslog { address } => Ok(Self::Syslog(SyslogWriter::connect(address.as_deref()).await?)),
        }
    }

    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        match self {
            Self::Stdout(out) => {
                let line = json_line(record)?;
                let mut out = out.lock().await;
                out.write_all(line.as_bytes()).await?;
                out.flush().await?;
            }
            Self::File(file) => {
                let line = json_line(record)?;
                let mut file = file.lock().await;
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
            }
            Self::Syslog(writer) => writer.send(record).await?,
        }
        Ok(())
    }
}

fn json_line(record: &AuditRecord) -> Result<String, AuditError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}

async fn open_append(path: &Path) -> Result<tokio::fs::File, AuditError> {
    let open_error = |source| AuditError::Open {
        backend: format!("file:{}", path.display()),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(open_error)?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(open_error)
}

pub struct BasicAuditor {
    backend: AuditBackend,
    sink: OnceCell<Sink>,
}

impl BasicAuditor {
    pub fn new(backend: AuditBackend) -> Self {
        Self {
            backend,
            sink: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> &AuditBackend {
        &self.backend
    }

    async fn record(
        &self,
        phase: AuditPhase,
        request: Option<&AuthorizationRequest>,
        verdict: Option<&Verdict>,
    ) -> Result<(), AuditError> {
        let record = AuditRecord::new(phase, request, verdict)?;
        let sink = self
            .sink
            .get_or_try_init(|| async {
                debug!(backend = %self.backend, "Opening audit backend");
                Sink::open(&self.backend).await
            })
            .await?;
        sink.write(&record).await
    }
}

#[async_trait]
impl Auditor for BasicAuditor {
    async fn record_request(
        &self,
        request: Option<&AuthorizationRequest>,
        verdict: Option<&Verdict>,
    ) -> Result<(), AuditError> {
        self.record(AuditPhase::Request, request, verdict).await
    }

    async fn record_response(
        &self,
        request: Option<&AuthorizationRequest>,
        verdict: Option<&Verdict>,
    ) -> Result<(), AuditError> {
        self.record(AuditPhase::Response, request, verdict).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_backend_creates_directory_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.log");
        let auditor = BasicAuditor::new(AuditBackend::File { path: path.clone() });

        let request = AuthorizationRequest::new("GET", "/v1.41/info", "alice");
        auditor
            .record_request(Some(&request), Some(&Verdict::allow("ok")))
            .await
            .unwrap();
        let response = request.clone().with_status_code(200);
        auditor
            .record_response(Some(&response), Some(&Verdict::allow("")))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<AuditRecord> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].phase, AuditPhase::Request);
        assert_eq!(lines[0].user, "alice");
        assert_eq!(lines[1].phase, AuditPhase::Response);
        assert_eq!(lines[1].status_code, Some(200));
    }

    #[tokio::test]
    async fn test_missing_arguments_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let auditor = BasicAuditor::new(AuditBackend::File { path: path.clone() });

        let request = AuthorizationRequest::new("GET", "/v1.41/info", "alice");
        assert!(matches!(
            auditor.record_request(Some(&request), None).await,
            Err(AuditError::MissingVerdict)
        ));
        assert!(matches!(
            auditor.record_response(None, Some(&Verdict::allow(""))).await,
            Err(AuditError::MissingRequest)
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_open_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let auditor = BasicAuditor::new(AuditBackend::File {
            path: blocker.join("audit.log"),
        });
        let request = AuthorizationRequest::new("GET", "/v1.41/info", "alice");
        let verdict = Verdict::deny("no");

        let result = auditor.record_request(Some(&request), Some(&verdict)).await;
        assert!(matches!(result, Err(AuditError::Open { .. })));

        std::fs::remove_file(&blocker).unwrap();
        auditor.record_request(Some(&request), Some(&verdict)).await.unwrap();
        assert!(blocker.join("audit.log").exists());
    }
}
