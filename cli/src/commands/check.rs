// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Policy file check command

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use authz_broker_core::domain::policy::PolicySet;

pub fn run(file: PathBuf, strict: bool) -> Result<()> {
    let content = std::fs::read(&file)
        .with_context(|| format!("Failed to read policy file {:?}", file))?;
    let (set, report) = PolicySet::parse(&content);

    println!("{} {}", "Policy file:".bold(), file.display());
    println!();

    println!("{}", "Policies:".bold());
    if set.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for policy in set.policies() {
        let patterns: Vec<&str> = policy.actions.iter().map(|p| p.as_str()).collect();
        println!(
            "  {}{}",
            policy.name.bold(),
            if policy.readonly { " (readonly)".cyan().to_string() } else { String::new() }
        );
        println!("    Users: {}", policy.users.join(", "));
        println!("    Actions: {}", patterns.join(", "));
    }
    println!();

    for skipped in &report.skipped {
        println!(
            "{} line {}: {}",
            "✗ Skipped".red(),
            skipped.line,
            skipped.error
        );
    }
    for invalid in &report.invalid_patterns {
        println!(
            "{} '{}' in policy '{}': {}",
            "✗ Invalid action pattern".red(),
            invalid.pattern,
            invalid.policy,
            invalid.error
        );
    }
    for duplicate in &report.duplicate_users {
        println!(
            "{} '{}' is listed in '{}' and '{}'; only '{}' applies",
            "⚠ Duplicate user".yellow(),
            duplicate.user,
            duplicate.effective_policy,
            duplicate.shadowed_policy,
            duplicate.effective_policy
        );
    }

    if report.is_clean() {
        println!("{}", format!("✓ {} policies loaded", set.len()).green());
    } else if strict && (!report.skipped.is_empty() || !report.invalid_patterns.is_empty()) {
        bail!(
            "{} skipped records and {} invalid action patterns",
            report.skipped.len(),
            report.invalid_patterns.len()
        );
    } else {
        println!("{}", format!("⚠ {} policies loaded with warnings", set.len()).yellow());
    }

    Ok(())
}
