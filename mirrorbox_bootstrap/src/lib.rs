// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap crate sits **outside** the enterprise application layers
//! (domain, application, infrastructure) and provides:
//!
//! - **Signal handling** - Graceful shutdown (SIGTERM, SIGINT)
//! - **Shutdown coordination** - Cancellation tokens with a grace period
//! - **Exit codes** - Unix exit code mapping
//! - **Bootstrap logging** - Minimal logging before the tracing subscriber
//!   is installed
//!
//! ## Architecture Position
//!
//! Bootstrap can access all layers; the enterprise layers never access
//! bootstrap. The daemon's long-lived workers (watcher, sync engine,
//! local API) each hold a [`shutdown::CancellationToken`] cloned from the
//! single [`shutdown::ShutdownCoordinator`] owned by `main`, so one signal
//! quiesces the whole process within the grace period.

pub mod exit_code;
pub mod logger;
pub mod shutdown;
pub mod signals;

// Re-export commonly used types
pub use exit_code::{result_to_exit_code, ExitCode};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
