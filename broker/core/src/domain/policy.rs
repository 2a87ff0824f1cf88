// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Domain Model
//!
//! A [`Policy`] binds a set of users to the actions they may perform. The
//! broker evaluates an immutable, ordered [`PolicySet`]; a new set is built
//! from scratch on every reload and never mutated afterwards.
//!
//! ## Source format
//!
//! One JSON object per line, decoded independently:
//!
//! ```text
//! {"name":"ops","users":["alice"],"actions":["container","image_list"]}
//! {"name":"audit","users":["bob"],"actions":[".*"],"readonly":true}
//! ```
//!
//! A line that fails to decode is skipped and reported; the remaining lines
//! still load.
//!
//! ## Evaluation order
//!
//! A user SHOULD appear in only one policy. When a user is listed more than
//! once, the first policy in file order is the only one ever consulted for
//! that user. Such duplicates are reported at load time, never rejected.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use super::action::Action;

/// Wire representation of one policy line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub readonly: bool,
}

/// An action identifier or regular expression, compiled once at load time.
///
/// Matching is unanchored: the pattern `container` accepts
/// `container_inspect`. Patterns never accept [`Action::None`].
#[derive(Debug, Clone)]
pub struct ActionPattern {
    source: String,
    regex: Regex,
}

impl ActionPattern {
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, action: Action) -> bool {
        action.is_recognized() && self.regex.is_match(action.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Policy {
    pub name: String,
    pub users: Vec<String>,
    pub actions: Vec<ActionPattern>,
    pub readonly: bool,
}

impl Policy {
    /// Compile a decoded record. Action patterns that are not valid regular
    /// expressions are dropped and returned alongside the policy.
    pub fn from_record(record: PolicyRecord) -> (Self, Vec<InvalidPattern>) {
        let mut actions = Vec::with_capacity(record.actions.len());
        let mut invalid = Vec::new();

        for source in record.actions {
            match ActionPattern::new(source.clone()) {
                Ok(pattern) => actions.push(pattern),
                Err(e) => invalid.push(InvalidPattern {
                    policy: record.name.clone(),
                    pattern: source,
                    error: e.to_string(),
                }),
            }
        }

        let policy = Self {
            name: record.name,
            users: record.users,
            actions,
            readonly: record.readonly,
        };
        (policy, invalid)
    }

    pub fn applies_to(&self, user: &str) -> bool {
        self.users.iter().any(|u| u == user)
    }

    /// First pattern accepting `action`, in declaration order.
    pub fn matching_pattern(&self, action: Action) -> Option<&ActionPattern> {
        self.actions.iter().find(|pattern| pattern.matches(action))
    }
}

/// A policy line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based line number in the source.
    pub line: usize,
    pub error: String,
}

/// An action pattern that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPattern {
    pub policy: String,
    pub pattern: String,
    pub error: String,
}

/// A user listed by more than one policy. Only `effective_policy` applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateUser {
    pub user: String,
    pub effective_policy: String,
    pub shadowed_policy: String,
}

/// Everything noteworthy that happened while building a [`PolicySet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub skipped: Vec<SkippedRecord>,
    pub invalid_patterns: Vec<InvalidPattern>,
    pub duplicate_users: Vec<DuplicateUser>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.invalid_patterns.is_empty() && self.duplicate_users.is_empty()
    }
}

/// Immutable, ordered collection of the active policies.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    policies: Vec<Policy>,
}

impl PolicySet {
    pub fn new(policies: Vec<Policy>) -> Self {
        Self { policies }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from line-delimited JSON. Never fails: undecodable lines
    /// (invalid UTF-8 included), invalid action patterns and duplicate users
    /// are logged and reported.
    pub fn parse(source: impl AsRef<[u8]>) -> (Self, LoadReport) {
        let mut report = LoadReport::default();
        let mut policies = Vec::new();

        for (index, line) in source.as_ref().split(|b| *b == b'\n').enumerate() {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_slice::<PolicyRecord>(line) {
                Ok(record) => {
                    let (policy, invalid) = Policy::from_record(record);
                    for pattern in &invalid {
                        warn!(
                            policy = %pattern.policy,
                            pattern = %pattern.pattern,
                            error = %pattern.error,
                            "Ignoring invalid action pattern"
                        );
                    }
                    report.invalid_patterns.extend(invalid);
                    policies.push(policy);
                }
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Failed to decode policy entry, skipping");
                    report.skipped.push(SkippedRecord {
                        line: index + 1,
                        error: e.to_string(),
                    });
                }
            }
        }

        report.duplicate_users = find_duplicate_users(&policies);
        for duplicate in &report.duplicate_users {
            warn!(
                user = %duplicate.user,
                effective_policy = %duplicate.effective_policy,
                shadowed_policy = %duplicate.shadowed_policy,
                "User appears in more than one policy; only the first applies"
            );
        }

        (Self { policies }, report)
    }

    /// The first policy listing `user`, if any.
    pub fn policy_for(&self, user: &str) -> Option<&Policy> {
        self.policies.iter().find(|policy| policy.applies_to(user))
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Policies are told apart by position, not name: two entries may share one.
fn find_duplicate_users(policies: &[Policy]) -> Vec<DuplicateUser> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for (index, policy) in policies.iter().enumerate() {
        for user in &policy.users {
            match first_seen.get(user.as_str()) {
                Some(&effective) if effective != index => duplicates.push(DuplicateUser {
                    user: user.clone(),
                    effective_policy: policies[effective].name.clone(),
                    shadowed_policy: policy.name.clone(),
                }),
                Some(_) => {}
                None => {
                    first_seen.insert(user.as_str(), index);
                }
            }
        }
    }

    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_bad_lines_and_keeps_the_rest() {
        let source = r#"{"name":"p1","users":["alice"],"actions":["container_create"]}
            this is not json
            {"name":"p2","users":["bob"],"actions":["image"],"readonly":true}

            {"users":["carol"]}"#;

        let (set, report) = PolicySet::parse(source);

        assert_eq!(set.len(), 2);
        assert_eq!(set.policies()[0].name, "p1");
        assert!(!set.policies()[0].readonly);
        assert!(set.policies()[1].readonly);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].line, 2);
        assert_eq!(report.skipped[1].line, 5);
    }

    #[test]
    fn test_duplicate_users_are_reported_not_rejected() {
        let source = r#"{"name":"first","users":["dave","erin"],"actions":["container"]}
{"name":"second","users":["dave"],"actions":["image"]}"#;

        let (set, report) = PolicySet::parse(source);

        assert_eq!(set.len(), 2);
        assert_eq!(
            report.duplicate_users,
            vec![DuplicateUser {
                user: "dave".to_string(),
                effective_policy: "first".to_string(),
                shadowed_policy: "second".to_string(),
            }]
        );
        assert_eq!(set.policy_for("dave").map(|p| p.name.as_str()), Some("first"));
    }

    #[test]
    fn test_duplicate_user_across_same_named_policies() {
        let source = r#"{"name":"p","users":["dave"],"actions":["container"]}
{"name":"p","users":["dave"],"actions":["image"]}"#;

        let (set, report) = PolicySet::parse(source);

        assert_eq!(set.len(), 2);
        assert_eq!(report.duplicate_users.len(), 1);
        assert_eq!(report.duplicate_users[0].user, "dave");
        let effective = set.policy_for("dave").unwrap();
        assert_eq!(effective.actions[0].as_str(), "container");
    }

    #[test]
    fn test_non_utf8_line_is_skipped() {
        let mut source = br#"{"name":"p1","users":["alice"],"actions":["container"]}"#.to_vec();
        source.extend_from_slice(b"\n\xff\xfe garbage\n");
        source.extend_from_slice(br#"{"name":"p2","users":["bob"],"actions":["image"]}"#);

        let (set, report) = PolicySet::parse(&source);

        assert_eq!(set.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 2);
    }

    #[test]
    fn test_invalid_action_pattern_is_dropped() {
        let (set, report) = PolicySet::parse(r#"{"name":"p","users":["u"],"actions":["image(","container"]}"#);

        let policy = &set.policies()[0];
        assert_eq!(policy.actions.len(), 1);
        assert_eq!(policy.actions[0].as_str(), "container");
        assert_eq!(report.invalid_patterns.len(), 1);
        assert_eq!(report.invalid_patterns[0].pattern, "image(");
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = ActionPattern::new("container").unwrap();
        assert!(pattern.matches(Action::ContainerInspect));
        assert!(!pattern.matches(Action::ImageList));

        let anything = ActionPattern::new(".*").unwrap();
        assert!(anything.matches(Action::NetworkRemove));
        assert!(!anything.matches(Action::None));
    }

    #[test]
    fn test_empty_source_yields_empty_set() {
        let (set, report) = PolicySet::parse("\n\n   \n");
        assert!(set.is_empty());
        assert!(report.is_clean());
    }
}
