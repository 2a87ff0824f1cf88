// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Authorization broker core
//!
//! Decides whether a Docker Engine API call may proceed, based on who is
//! calling and which action the call performs, and records every verdict.
//!
//! # Architecture
//!
//! - **domain:** action catalog, route classifier, policies, verdicts, audit model
//! - **application:** authorizer and the authorize-then-audit service
//! - **infrastructure:** hot-reloading policy store, change watcher, audit sinks
//! - **presentation:** Docker plugin HTTP API over a Unix socket

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
