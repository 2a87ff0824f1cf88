// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Action Classifier
//!
//! Maps a wire-level `(method, path)` pair onto an [`Action`].
//!
//! ## Matching contract
//!
//! [`ROUTES`] is an **ordered** list. A request is compared against each rule
//! in declaration order and the first rule whose method equals the request
//! method (case-sensitive) and whose pattern matches the path wins. Anything
//! that matches no rule is [`Action::None`]. Two rules with the same method
//! and overlapping patterns are order-sensitive: the earlier one shadows the
//! later one for every path both accept.
//!
//! Patterns are regular expressions over the URL path (query string already
//! removed). Each one is anchored at both ends when compiled and may be
//! preceded by an API version segment (`/v1.41`, `/v.1.21`), so a pattern
//! such as `/containers/json` never matches inside an image name like
//! `/images/foo/containers/json`. This is a stricter form of plain substring
//! matching: a path that would only match as a substring classifies as
//! [`Action::None`] and is denied.
//!
//! Container, exec, volume and swarm object identifiers are a single path
//! segment (`[^/]+`). Image, distribution and plugin references may contain
//! `/`, so they use `.+`.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use super::action::Action;

const VERSION_PREFIX: &str = r"^(?:/v\.?[0-9][0-9.]*)?";

/// One entry of the route catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub method: &'static str,
    pub pattern: &'static str,
    pub action: Action,
}

pub const fn rule(method: &'static str, pattern: &'static str, action: Action) -> RouteRule {
    RouteRule { method, pattern, action }
}

/// Docker Engine API route catalog. Order is significant.
pub static ROUTES: &[RouteRule] = &[
    // System
    rule("GET", "/_ping", Action::DockerPing),
    rule("HEAD", "/_ping", Action::DockerPing),
    rule("GET", "/version", Action::DockerVersion),
    rule("GET", "/info", Action::DockerInfo),
    rule("GET", "/events", Action::DockerEvents),
    rule("POST", "/auth", Action::DockerCheckAuth),
    rule("GET", "/system/df", Action::DockerDiskUsage),
    rule("POST", "/session", Action::DockerSession),
    rule("POST", "/commit", Action::ContainerCommit),

    // Containers
    rule("POST", "/containers/create", Action::ContainerCreate),
    rule("POST", "/containers/prune", Action::ContainerPrune),
    rule("GET", "/containers/json", Action::ContainerList),
    rule("POST", "/containers/[^/]+/wait", Action::ContainerWait),
    rule("POST", "/containers/[^/]+/resize", Action::ContainerResize),
    rule("POST", "/containers/[^/]+/stop", Action::ContainerStop),
    rule("POST", "/containers/[^/]+/kill", Action::ContainerKill),
    rule("POST", "/containers/[^/]+/restart", Action::ContainerRestart),
    rule("POST", "/containers/[^/]+/start", Action::ContainerStart),
    rule("POST", "/containers/[^/]+/exec", Action::ContainerExecCreate),
    rule("POST", "/containers/[^/]+/unpause", Action::ContainerUnpause),
    rule("POST", "/containers/[^/]+/pause", Action::ContainerPause),
    rule("POST", "/containers/[^/]+/copy", Action::ContainerCopyFiles),
    rule("POST", "/containers/[^/]+/rename", Action::ContainerRename),
    rule("POST", "/containers/[^/]+/update", Action::ContainerUpdate),
    rule("POST", "/containers/[^/]+/attach", Action::ContainerAttach),
    // Pre-1.22 clients issue export as POST.
    rule("POST", "/containers/[^/]+/export", Action::ContainerExport),
    rule("GET", "/containers/[^/]+/export", Action::ContainerExport),
    rule("PUT", "/containers/[^/]+/archive", Action::ContainerArchiveExtract),
    rule("HEAD", "/containers/[^/]+/archive", Action::ContainerArchiveInfo),
    rule("GET", "/containers/[^/]+/archive", Action::ContainerArchive),
    rule("GET", "/containers/[^/]+/attach/ws", Action::ContainerAttachWebsocket),
    rule("GET", "/containers/[^/]+/json", Action::ContainerInspect),
    rule("GET", "/containers/[^/]+/stats", Action::ContainerStats),
    rule("GET", "/containers/[^/]+/changes", Action::ContainerChanges),
    rule("GET", "/containers/[^/]+/top", Action::ContainerTop),
    rule("GET", "/containers/[^/]+/logs", Action::ContainerLogs),
    rule("DELETE", "/containers/[^/]+", Action::ContainerDelete),

    // Exec instances
    rule("GET", "/exec/[^/]+/json", Action::ContainerExecInspect),
    rule("POST", "/exec/[^/]+/start", Action::ContainerExecStart),
    rule("POST", "/exec/[^/]+/resize", Action::ContainerExecResize),

    // Build
    rule("POST", "/build", Action::ImageBuild),
    rule("POST", "/build/prune", Action::ImageBuildPrune),
    rule("POST", "/build/cancel", Action::ImageBuildCancel),

    // Images
    rule("POST", "/images/create", Action::ImageCreate),
    rule("POST", "/images/load", Action::ImageLoad),
    rule("POST", "/images/prune", Action::ImagePrune),
    rule("POST", "/images/.+/push", Action::ImagePush),
    rule("POST", "/images/.+/tag", Action::ImageTag),
    rule("GET", "/images/json", Action::ImageList),
    rule("GET", "/images/search", Action::ImageSearch),
    rule("GET", "/images/(?:.+/)?get", Action::ImageArchive),
    rule("GET", "/images/.+/json", Action::ImageInspect),
    rule("GET", "/images/.+/history", Action::ImageHistory),
    rule("DELETE", "/images/.+", Action::ImageDelete),
    rule("GET", "/distribution/.+/json", Action::DistributionInspect),

    // Volumes
    rule("GET", "/volumes", Action::VolumeList),
    rule("POST", "/volumes/create", Action::VolumeCreate),
    rule("POST", "/volumes/prune", Action::VolumePrune),
    rule("GET", "/volumes/[^/]+", Action::VolumeInspect),
    rule("PUT", "/volumes/[^/]+", Action::VolumeUpdate),
    rule("DELETE", "/volumes/[^/]+", Action::VolumeRemove),

    // Networks
    rule("GET", "/networks", Action::NetworkList),
    rule("POST", "/networks/create", Action::NetworkCreate),
    rule("POST", "/networks/prune", Action::NetworkPrune),
    rule("GET", "/networks/[^/]+", Action::NetworkInspect),
    rule("POST", "/networks/[^/]+/connect", Action::NetworkConnect),
    rule("POST", "/networks/[^/]+/disconnect", Action::NetworkDisconnect),
    rule("DELETE", "/networks/[^/]+", Action::NetworkRemove),

    // Swarm
    rule("GET", "/swarm", Action::SwarmInspect),
    rule("POST", "/swarm/init", Action::SwarmInit),
    rule("POST", "/swarm/join", Action::SwarmJoin),
    rule("POST", "/swarm/leave", Action::SwarmLeave),
    rule("POST", "/swarm/update", Action::SwarmUpdate),
    rule("GET", "/swarm/unlockkey", Action::SwarmUnlockKey),
    rule("POST", "/swarm/unlock", Action::SwarmUnlock),

    // Nodes
    rule("GET", "/nodes", Action::NodeList),
    rule("GET", "/nodes/[^/]+", Action::NodeInspect),
    rule("DELETE", "/nodes/[^/]+", Action::NodeRemove),
    rule("POST", "/nodes/[^/]+/update", Action::NodeUpdate),

    // Services
    rule("GET", "/services", Action::ServiceList),
    rule("POST", "/services/create", Action::ServiceCreate),
    rule("GET", "/services/[^/]+", Action::ServiceInspect),
    rule("DELETE", "/services/[^/]+", Action::ServiceRemove),
    rule("POST", "/services/[^/]+/update", Action::ServiceUpdate),
    rule("GET", "/services/[^/]+/logs", Action::ServiceLogs),

    // Tasks
    rule("GET", "/tasks", Action::TaskList),
    rule("GET", "/tasks/[^/]+", Action::TaskInspect),
    rule("GET", "/tasks/[^/]+/logs", Action::TaskLogs),

    // Secrets
    rule("GET", "/secrets", Action::SecretList),
    rule("POST", "/secrets/create", Action::SecretCreate),
    rule("GET", "/secrets/[^/]+", Action::SecretInspect),
    rule("DELETE", "/secrets/[^/]+", Action::SecretRemove),
    rule("POST", "/secrets/[^/]+/update", Action::SecretUpdate),

    // Configs
    rule("GET", "/configs", Action::ConfigList),
    rule("POST", "/configs/create", Action::ConfigCreate),
    rule("GET", "/configs/[^/]+", Action::ConfigInspect),
    rule("DELETE", "/configs/[^/]+", Action::ConfigRemove),
    rule("POST", "/configs/[^/]+/update", Action::ConfigUpdate),

    // Plugins
    rule("GET", "/plugins", Action::PluginList),
    rule("GET", "/plugins/privileges", Action::PluginPrivileges),
    rule("POST", "/plugins/pull", Action::PluginPull),
    rule("POST", "/plugins/create", Action::PluginCreate),
    rule("GET", "/plugins/.+/json", Action::PluginInspect),
    rule("POST", "/plugins/.+/enable", Action::PluginEnable),
    rule("POST", "/plugins/.+/disable", Action::PluginDisable),
    rule("POST", "/plugins/.+/upgrade", Action::PluginUpgrade),
    rule("POST", "/plugins/.+/push", Action::PluginPush),
    rule("POST", "/plugins/.+/set", Action::PluginSet),
    rule("DELETE", "/plugins/.+", Action::PluginRemove),
];

#[derive(Debug)]
struct CompiledRoute {
    rule: RouteRule,
    regex: Regex,
}

/// A compiled, ordered route catalog.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile `rules` in order. A pattern that fails to compile is reported
    /// and left out; it can never match.
    pub fn compile(rules: &[RouteRule]) -> Self {
        let routes = rules
            .iter()
            .filter_map(|rule| {
                let anchored = format!("{VERSION_PREFIX}{}/?$", rule.pattern);
                match Regex::new(&anchored) {
                    Ok(regex) => Some(CompiledRoute { rule: *rule, regex }),
                    Err(e) => {
                        warn!(
                            method = rule.method,
                            pattern = rule.pattern,
                            action = %rule.action,
                            error = %e,
                            "Route pattern failed to compile, rule disabled"
                        );
                        None
                    }
                }
            })
            .collect();

        Self { routes }
    }

    /// First matching rule's action, or [`Action::None`].
    pub fn classify(&self, method: &str, path: &str) -> Action {
        self.routes
            .iter()
            .find(|route| route.rule.method == method && route.regex.is_match(path))
            .map(|route| route.rule.action)
            .unwrap_or(Action::None)
    }

    /// Every rule that would match, in table order. The first element (if any)
    /// is the one [`RouteTable::classify`] picks.
    pub fn matching_rules(&self, method: &str, path: &str) -> Vec<RouteRule> {
        self.routes
            .iter()
            .filter(|route| route.rule.method == method && route.regex.is_match(path))
            .map(|route| route.rule)
            .collect()
    }

    /// Number of rules that compiled.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

static ROUTE_TABLE: LazyLock<RouteTable> = LazyLock::new(|| RouteTable::compile(ROUTES));

/// The built-in compiled catalog.
pub fn route_table() -> &'static RouteTable {
    &ROUTE_TABLE
}

/// Classify a request against the built-in catalog. Total: never fails.
pub fn classify(method: &str, path: &str) -> Action {
    ROUTE_TABLE.classify(method, path)
}
