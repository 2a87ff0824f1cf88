// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Request classification command

use anyhow::{Context, Result};
use colored::Colorize;

use authz_broker_core::domain::authorization::{request_path, AuthorizationRequest};
use authz_broker_core::domain::config::BrokerConfig;
use authz_broker_core::domain::decision::decide;
use authz_broker_core::domain::route::route_table;
use authz_broker_core::infrastructure::policy_store::PolicyStore;

pub fn run(config: &BrokerConfig, method: &str, uri: &str, user: Option<&str>) -> Result<()> {
    let path = request_path(uri);
    let matches = route_table().matching_rules(method, path);

    match matches.first() {
        Some(rule) => println!("{} {}", "Action:".bold(), rule.action.as_str().green()),
        None => println!("{} {}", "Action:".bold(), "none".yellow()),
    }
    for shadowed in matches.iter().skip(1) {
        println!(
            "  {} {} {} -> {}",
            "shadowed:".dimmed(),
            shadowed.method,
            shadowed.pattern,
            shadowed.action
        );
    }

    if let Some(user) = user {
        let store = PolicyStore::open(&config.policy_file)
            .with_context(|| format!("Failed to load policies from {:?}", config.policy_file))?;
        let verdict = decide(&AuthorizationRequest::new(method, uri, user), &store.current());

        let outcome = if verdict.is_error() {
            "ERROR".red()
        } else if verdict.allow {
            "ALLOW".green()
        } else {
            "DENY".red()
        };
        println!("{} {}", "Verdict:".bold(), outcome);
        if !verdict.msg.is_empty() {
            println!("  {}", verdict.msg);
        }
        if let Some(err) = &verdict.err {
            println!("  {}", err.red());
        }
    }

    Ok(())
}
