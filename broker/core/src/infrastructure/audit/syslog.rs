// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Syslog audit transport
//
// RFC 3164 messages, facility authpriv. Allowed calls are logged at info,
// denied and failed ones at notice.

use chrono::Local;
use std::path::Path;
use tokio::net::{UdpSocket, UnixDatagram};

use crate::domain::audit::{AuditError, AuditRecord};

pub const DEFAULT_SYSLOG_SOCKET: &str = "/dev/log";
const SYSLOG_TAG: &str = "authz-broker";

const FACILITY_AUTHPRIV: u8 = 10;
const SEVERITY_NOTICE: u8 = 5;
const SEVERITY_INFO: u8 = 6;

enum Transport {
    Unix(UnixDatagram),
    Udp(UdpSocket),
}

pub struct SyslogWriter {
    transport: Transport,
    hostname: String,
    pid: u32,
}

impl SyslogWriter {
    /// Connect to `address`: a Unix datagram socket path, or `host:port` for
    /// UDP. `None` uses the local `/dev/log` socket.
    pub async fn connect(address: Option<&str>) -> Result<Self, AuditError> {
        let address = address.unwrap_or(DEFAULT_SYSLOG_SOCKET);
        let open_error = |source| AuditError::Open {
            backend: format!("syslog:{}", address),
            source,
        };

        let transport = if address.starts_with('/') || Path::new(address).exists() {
            let socket = UnixDatagram::unbound().map_err(open_error)?;
            socket.connect(address).map_err(open_error)?;
            Transport::Unix(socket)
        } else {
            let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(open_error)?;
            socket.connect(address).await.map_err(open_error)?;
            Transport::Udp(socket)
        };

        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());

        Ok(Self {
            transport,
            hostname,
            pid: std::process::id(),
        })
    }

    pub async fn send(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let message = self.format(record)?;
        match &self.transport {
            Transport::Unix(socket) => socket.send(message.as_bytes()).await?,
            Transport::Udp(socket) => socket.send(message.as_bytes()).await?,
        };
        Ok(())
    }

    fn format(&self, record: &AuditRecord) -> Result<String, AuditError> {
        let severity = if record.allow { SEVERITY_INFO } else { SEVERITY_NOTICE };
        Ok(format!(
            "<{}>{} {} {}[{}]: {}",
            FACILITY_AUTHPRIV * 8 + severity,
            Local::now().format("%b %e %H:%M:%S"),
            self.hostname,
            SYSLOG_TAG,
            self.pid,
            serde_json::to_string(record)?
        ))
    }
}
