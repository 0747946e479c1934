// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Installs SIGINT/SIGTERM handlers that trigger the shutdown coordinator.
//! On Windows only Ctrl-C is available; on Unix both signals are watched.

use crate::shutdown::ShutdownCoordinator;

/// Spawns a task that waits for a termination signal and initiates
/// shutdown on the coordinator.
///
/// Returns immediately; the spawned task lives until the first signal.
pub fn spawn_signal_listener(coordinator: ShutdownCoordinator) {
    tokio::spawn(async move {
        wait_for_termination().await;
        coordinator.initiate_shutdown();
    });
}

/// Waits for SIGINT or SIGTERM (Ctrl-C only on non-Unix platforms).
pub async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received Ctrl-C");
    }
}
