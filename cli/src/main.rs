// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # authz-broker
//!
//! Docker Engine authorization plugin. Every API call the daemon receives is
//! classified into an action, checked against the policy file and recorded
//! in the audit trail.
//!
//! ## Commands
//!
//! - `authz-broker serve` - Serve the plugin socket (default)
//! - `authz-broker check [FILE]` - Load a policy file and report problems
//! - `authz-broker classify <METHOD> <PATH>` - Show the action for a request
//! - `authz-broker config show|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use authz_broker_core::domain::config::BrokerConfig;

mod commands;

use commands::ConfigCommand;

/// Policy-based authorization for the Docker Engine API
#[derive(Parser)]
#[command(name = "authz-broker")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "AUTHZ_BROKER_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Policy file, one JSON policy per line
    #[arg(long, global = true, env = "AUTHZ_POLICY_FILE", value_name = "FILE")]
    policy_file: Option<PathBuf>,

    /// Audit backend (stdout, file, syslog)
    #[arg(long, global = true, env = "AUTHZ_AUDITOR")]
    auditor: Option<String>,

    /// Audit log path for the file backend
    #[arg(long, global = true, env = "AUTHZ_AUDIT_LOG_PATH", value_name = "FILE")]
    audit_log_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AUTHZ_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the authorization plugin socket
    #[command(name = "serve")]
    Serve,

    /// Load a policy file and report skipped records and duplicate users
    #[command(name = "check")]
    Check {
        /// Policy file (default: configured policy_file)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Fail when any record was skipped or any pattern was invalid
        #[arg(long)]
        strict: bool,
    },

    /// Show which action a request maps to
    #[command(name = "classify")]
    Classify {
        /// HTTP method, e.g. POST
        method: String,

        /// Request URI, e.g. /v1.41/containers/create
        path: String,

        /// Also evaluate the configured policies for this user
        #[arg(long)]
        user: Option<String>,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = effective_config(&cli)?;

    let level = if cli.debug { "debug" } else { config.log_level.as_str() };
    init_logging(level, &config.log_format)?;
    match config_source(&cli) {
        Some(path) => info!(path = %path.display(), "Configuration file"),
        None => info!("No configuration file found; using defaults"),
    }
    info!(
        policy_file = %config.policy_file.display(),
        auditor = %config.audit.to_backend(),
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::run(config).await,
        Commands::Check { file, strict } => {
            commands::check::run(file.unwrap_or_else(|| config.policy_file.clone()), strict)
        }
        Commands::Classify { method, path, user } => {
            commands::classify::run(&config, &method, &path, user.as_deref())
        }
        Commands::Config { command } => commands::config::handle_command(command, &config, cli.config),
    }
}

/// Discovered or explicit configuration, then environment, then flags.
fn effective_config(cli: &Cli) -> Result<BrokerConfig> {
    let mut config =
        BrokerConfig::load_or_default(cli.config.clone()).context("Failed to load configuration")?;

    if let Some(path) = &cli.policy_file {
        config.policy_file = path.clone();
    }
    if let Some(auditor) = &cli.auditor {
        config.audit.backend = auditor.parse().context("Invalid --auditor")?;
    }
    if let Some(path) = &cli.audit_log_path {
        config.audit.path = path.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    Ok(config)
}

/// The configuration file `effective_config` read, if any. Computed again
/// once logging is up, since discovery runs before the subscriber exists.
fn config_source(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(BrokerConfig::discover_config)
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
