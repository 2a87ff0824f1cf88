// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use authz_broker_core::domain::config::{BrokerConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate the effective configuration
    Validate,

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./authz-broker.yaml)
        #[arg(short, long, default_value = "./authz-broker.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_command(
    command: ConfigCommand,
    config: &BrokerConfig,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config, config_override, paths),
        ConfigCommand::Validate => validate(config),
        ConfigCommand::Generate { output, force } => generate(output, force),
    }
}

fn show(config: &BrokerConfig, config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./authz-broker.yaml");
        println!("  4. ~/.authz-broker/config.yaml");
        println!("  5. /etc/authz-broker/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();
    print!("{}", config.to_yaml().context("Failed to render configuration")?);
    println!();
    println!("{} {}", "Plugin socket:".bold(), config.plugin.socket_path().display());
    println!("{} {}", "Audit backend:".bold(), config.audit.to_backend());

    Ok(())
}

fn validate(config: &BrokerConfig) -> Result<()> {
    println!("Validating configuration...");

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{:?} already exists; pass --force to overwrite", output);
    }

    BrokerConfig::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
