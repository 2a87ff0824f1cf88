// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Action Catalog
//!
//! The closed vocabulary that policies are written against. Every Docker
//! Engine API call the broker understands is mapped (see [`super::route`])
//! to exactly one [`Action`]; calls it does not understand map to
//! [`Action::None`].
//!
//! Identifiers are stable strings. Renaming one silently breaks every policy
//! file that references it, so bump [`ACTION_CATALOG_VERSION`] whenever the
//! catalog changes shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version of the action catalog. Bumped when identifiers are added or removed.
pub const ACTION_CATALOG_VERSION: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown action identifier: {0}")]
pub struct UnknownAction(pub String);

macro_rules! action_catalog {
    ($($variant:ident => $id:tt),+ $(,)?) => {
        /// Semantic operation on the Docker Engine, decoupled from the URL shape.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Action {
            $(
                #[serde(rename = $id)]
                $variant,
            )+
        }

        impl Action {
            /// Every action in catalog order, `None` included.
            pub const ALL: &'static [Action] = &[$(Action::$variant),+];

            /// Stable identifier used in policy files and audit records.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Action::$variant => $id,)+
                }
            }
        }

        impl FromStr for Action {
            type Err = UnknownAction;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($id => Ok(Action::$variant),)+
                    other => Err(UnknownAction(other.to_string())),
                }
            }
        }
    };
}

action_catalog! {
    // Containers
    ContainerArchive => "container_archive",
    ContainerArchiveExtract => "container_archive_extract",
    ContainerArchiveInfo => "container_archive_info",
    ContainerAttach => "container_attach",
    ContainerAttachWebsocket => "container_attach_websocket",
    ContainerChanges => "container_changes",
    ContainerCommit => "container_commit",
    ContainerCopyFiles => "container_copyfiles",
    ContainerCreate => "container_create",
    ContainerDelete => "container_delete",
    ContainerExecCreate => "container_exec_create",
    ContainerExecInspect => "container_exec_inspect",
    ContainerExecResize => "container_exec_resize",
    ContainerExecStart => "container_exec_start",
    ContainerExport => "container_export",
    ContainerInspect => "container_inspect",
    ContainerKill => "container_kill",
    ContainerList => "container_list",
    ContainerLogs => "container_logs",
    ContainerPause => "container_pause",
    ContainerPrune => "container_prune",
    ContainerRename => "container_rename",
    ContainerResize => "container_resize",
    ContainerRestart => "container_restart",
    ContainerStart => "container_start",
    ContainerStats => "container_stats",
    ContainerStop => "container_stop",
    ContainerTop => "container_top",
    ContainerUnpause => "container_unpause",
    ContainerUpdate => "container_update",
    ContainerWait => "container_wait",

    // System
    DockerCheckAuth => "docker_auth",
    DockerDiskUsage => "docker_df",
    DockerEvents => "docker_events",
    DockerInfo => "docker_info",
    DockerPing => "docker_ping",
    DockerSession => "docker_session",
    DockerVersion => "docker_version",

    // Images
    ImageArchive => "images_archive",
    ImageBuild => "image_build",
    ImageBuildCancel => "image_build_cancel",
    ImageBuildPrune => "image_build_prune",
    ImageCreate => "image_create",
    ImageDelete => "image_delete",
    ImageHistory => "image_history",
    ImageInspect => "image_inspect",
    ImageList => "image_list",
    ImageLoad => "images_load",
    ImagePrune => "image_prune",
    ImagePush => "image_push",
    ImageSearch => "images_search",
    ImageTag => "image_tag",
    DistributionInspect => "distribution_inspect",

    // Volumes
    VolumeCreate => "volume_create",
    VolumeInspect => "volume_inspect",
    VolumeList => "volume_list",
    VolumePrune => "volume_prune",
    VolumeRemove => "volume_remove",
    VolumeUpdate => "volume_update",

    // Networks
    NetworkConnect => "network_connect",
    NetworkCreate => "network_create",
    NetworkDisconnect => "network_disconnect",
    NetworkInspect => "network_inspect",
    NetworkList => "network_list",
    NetworkPrune => "network_prune",
    NetworkRemove => "network_remove",

    // Swarm
    SwarmInit => "swarm_init",
    SwarmInspect => "swarm_inspect",
    SwarmJoin => "swarm_join",
    SwarmLeave => "swarm_leave",
    SwarmUnlock => "swarm_unlock",
    SwarmUnlockKey => "swarm_unlock_key",
    SwarmUpdate => "swarm_update",

    // Nodes
    NodeInspect => "node_inspect",
    NodeList => "node_list",
    NodeRemove => "node_remove",
    NodeUpdate => "node_update",

    // Services
    ServiceCreate => "service_create",
    ServiceInspect => "service_inspect",
    ServiceList => "service_list",
    ServiceLogs => "service_logs",
    ServiceRemove => "service_remove",
    ServiceUpdate => "service_update",

    // Tasks
    TaskInspect => "task_inspect",
    TaskList => "task_list",
    TaskLogs => "task_logs",

    // Secrets
    SecretCreate => "secret_create",
    SecretInspect => "secret_inspect",
    SecretList => "secret_list",
    SecretRemove => "secret_remove",
    SecretUpdate => "secret_update",

    // Configs
    ConfigCreate => "config_create",
    ConfigInspect => "config_inspect",
    ConfigList => "config_list",
    ConfigRemove => "config_remove",
    ConfigUpdate => "config_update",

    // Plugins
    PluginCreate => "plugin_create",
    PluginDisable => "plugin_disable",
    PluginEnable => "plugin_enable",
    PluginInspect => "plugin_inspect",
    PluginList => "plugin_list",
    PluginPrivileges => "plugin_privileges",
    PluginPull => "plugin_pull",
    PluginPush => "plugin_push",
    PluginRemove => "plugin_remove",
    PluginSet => "plugin_set",
    PluginUpgrade => "plugin_upgrade",

    // No route matched
    None => "none",
}

impl Action {
    /// `true` for every action except [`Action::None`].
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Action::None)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
