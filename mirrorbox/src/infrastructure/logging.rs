// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Tracing subscriber initialization.
//!
//! Installed once at startup. The filter honors `RUST_LOG`; without it the
//! daemon logs at `info` for mirrorbox crates and `warn` for dependencies.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn,mirrorbox=info,mirrorbox_domain=info,mirrorbox_bootstrap=info";

/// Initializes the global tracing subscriber.
///
/// `verbose` lowers the mirrorbox crates to `debug`. Calling twice is a
/// no-op (the second install fails quietly), which keeps tests that share
/// a process harmless.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "warn,mirrorbox=debug,mirrorbox_domain=debug,mirrorbox_bootstrap=debug"
    } else {
        DEFAULT_FILTER
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
