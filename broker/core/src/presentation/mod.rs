// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`authz-broker-core`)
//!
//! Docker plugin surface. No decision logic lives here; every call is
//! delegated to [`crate::application::authz_service::AuthzService`].
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`plugin_api`] | HTTP (Axum) | Plugin activation and AuthZ request/response endpoints |
//! | [`plugin_server`] | Unix socket | Socket placement, stale socket cleanup, graceful shutdown |

pub mod plugin_api;
pub mod plugin_server;
