// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure types and decision logic. Nothing here performs I/O except
//! configuration file loading.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer

pub mod action;
pub mod route;
pub mod policy;
pub mod authorization;
pub mod decision;
pub mod audit;
pub mod config;
