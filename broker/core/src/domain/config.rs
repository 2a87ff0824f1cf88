// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Broker Configuration
//
// YAML configuration for the broker daemon:
// - policy source location and change polling
// - audit backend selection
// - plugin socket placement
// - log verbosity and format
//
// Supplied once at startup. Only the policy source is re-read afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::audit::{AuditBackend, AuditBackendKind, AuditError, DEFAULT_AUDIT_LOG_PATH};

pub const DEFAULT_POLICY_FILE: &str = "/var/lib/authz-broker/policy.json";
pub const DEFAULT_PLUGIN_NAME: &str = "authz-broker";
pub const DEFAULT_PLUGIN_DIR: &str = "/run/docker/plugins";
pub const CONFIG_PATH_ENV: &str = "AUTHZ_BROKER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_yaml::Error),

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Line-delimited JSON policy source.
    pub policy_file: PathBuf,

    /// Seconds between policy source change checks. 0 disables polling;
    /// SIGHUP still triggers a reload.
    pub poll_interval: u64,

    pub audit: AuditConfig,

    pub plugin: PluginConfig,

    /// trace, debug, info, warn or error
    pub log_level: String,

    /// compact or json
    pub log_format: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            policy_file: PathBuf::from(DEFAULT_POLICY_FILE),
            poll_interval: 2,
            audit: AuditConfig::default(),
            plugin: PluginConfig::default(),
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub backend: AuditBackendKind,

    /// File backend destination.
    pub path: PathBuf,

    /// Syslog destination: a Unix socket path or `host:port`. Unset means
    /// the local `/dev/log`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syslog_address: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            backend: AuditBackendKind::Stdout,
            path: PathBuf::from(DEFAULT_AUDIT_LOG_PATH),
            syslog_address: None,
        }
    }
}

impl AuditConfig {
    pub fn to_backend(&self) -> AuditBackend {
        match self.backend {
            AuditBackendKind::Stdout => AuditBackend::Stdout,
            AuditBackendKind::File => AuditBackend::File { path: self.path.clone() },
            AuditBackendKind::Syslog => AuditBackend::Syslog {
                address: self.syslog_address.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub name: String,
    pub dir: PathBuf,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PLUGIN_NAME.to_string(),
            dir: PathBuf::from(DEFAULT_PLUGIN_DIR),
        }
    }
}

impl PluginConfig {
    pub fn socket_path(&self) -> PathBuf {
        self.dir.join(format!("{}.sock", self.name))
    }
}

impl BrokerConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover a configuration file using precedence order
    /// 1. AUTHZ_BROKER_CONFIG environment variable
    /// 2. ./authz-broker.yaml (working directory)
    /// 3. ~/.authz-broker/config.yaml (user home)
    /// 4. /etc/authz-broker/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./authz-broker.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".authz-broker").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/authz-broker/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, falling back to defaults.
    ///
    /// An explicit path must exist and parse. Environment overrides are
    /// applied in every case.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(&path)?
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `AUTHZ_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("AUTHZ_POLICY_FILE") {
            tracing::info!("Environment override: AUTHZ_POLICY_FILE={}", val);
            self.policy_file = PathBuf::from(val);
        }
        if let Some(val) = lookup("AUTHZ_AUDITOR") {
            tracing::info!("Environment override: AUTHZ_AUDITOR={}", val);
            self.audit.backend = val.parse()?;
        }
        if let Some(val) = lookup("AUTHZ_AUDIT_LOG_PATH") {
            tracing::info!("Environment override: AUTHZ_AUDIT_LOG_PATH={}", val);
            self.audit.path = PathBuf::from(val);
        }
        if let Some(val) = lookup("AUTHZ_LOG_LEVEL") {
            self.log_level = val;
        }
        if let Some(val) = lookup("AUTHZ_POLL_INTERVAL") {
            match val.parse() {
                Ok(secs) => self.poll_interval = secs,
                Err(_) => tracing::warn!(
                    "Invalid value for AUTHZ_POLL_INTERVAL: '{}'. Expected seconds. Ignoring.",
                    val
                ),
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval > 0).then(|| Duration::from_secs(self.poll_interval))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("policy_file cannot be empty".into()));
        }

        if self.audit.backend == AuditBackendKind::File && self.audit.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("audit.path cannot be empty for the file backend".into()));
        }

        if self.plugin.name.is_empty() || self.plugin.name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "plugin.name '{}' must be a non-empty file name",
                self.plugin.name
            )));
        }

        if !matches!(
            self.log_level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::Invalid(format!(
                "log_level '{}' must be one of trace, debug, info, warn, error",
                self.log_level
            )));
        }

        if !matches!(self.log_format.as_str(), "compact" | "json") {
            return Err(ConfigError::Invalid(format!(
                "log_format '{}' must be compact or json",
                self.log_format
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.policy_file, PathBuf::from(DEFAULT_POLICY_FILE));
        assert_eq!(config.audit.to_backend(), AuditBackend::Stdout);
        assert_eq!(
            config.plugin.socket_path(),
            PathBuf::from("/run/docker/plugins/authz-broker.sock")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
policy_file: /etc/authz/policy.json
audit:
  backend: file
  path: /tmp/audit/audit.log
"#;
        let config = BrokerConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.policy_file, PathBuf::from("/etc/authz/policy.json"));
        assert_eq!(
            config.audit.to_backend(),
            AuditBackend::File { path: PathBuf::from("/tmp/audit/audit.log") }
        );
        assert_eq!(config.plugin, PluginConfig::default());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unknown_backend_rejected_in_yaml() {
        let yaml = "audit:\n  backend: kafka\n";
        assert!(BrokerConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AUTHZ_POLICY_FILE", "/srv/policy.json"),
            ("AUTHZ_AUDITOR", "syslog"),
            ("AUTHZ_LOG_LEVEL", "debug"),
            ("AUTHZ_POLL_INTERVAL", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = BrokerConfig::default();
        config
            .apply_env_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.policy_file, PathBuf::from("/srv/policy.json"));
        assert_eq!(config.audit.backend, AuditBackendKind::Syslog);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.poll_interval, 2);
    }

    #[test]
    fn test_env_override_unknown_auditor() {
        let mut config = BrokerConfig::default();
        let result = config.apply_env_overrides_from(|key| {
            (key == "AUTHZ_AUDITOR").then(|| "elastic".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Audit(AuditError::UnknownBackend(kind))) if kind == "elastic"
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = BrokerConfig::default();
        config.log_format = "xml".into();
        assert!(config.validate().is_err());

        let mut config = BrokerConfig::default();
        config.plugin.name = "a/b".into();
        assert!(config.validate().is_err());

        let mut config = BrokerConfig::default();
        config.policy_file = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = BrokerConfig::default();
        config.poll_interval = 0;
        config.audit.syslog_address = Some("127.0.0.1:514".into());
        config.to_yaml_file(&path).unwrap();

        let loaded = BrokerConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.poll_interval(), None);
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let result = BrokerConfig::load_or_default(Some(PathBuf::from("/nonexistent/authz.yaml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
