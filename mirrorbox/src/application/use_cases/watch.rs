// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Watch Use Case
//!
//! The daemon: initial scan, filesystem watcher, sync engine, and local
//! API, all running until a termination signal. The three long-lived
//! workers are connected exactly as the concurrency model prescribes —
//! watcher → bounded event queue → engine dispatcher → bounded transfer
//! pool — and every worker holds a cancellation token from the single
//! shutdown coordinator.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use mirrorbox_bootstrap::{signals, ShutdownCoordinator};

use crate::infrastructure::api::{self, ApiState};
use crate::infrastructure::watcher::FsWatcher;

use super::context::AppContext;

/// Grace period granted to in-flight uploads at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Runs the daemon until SIGINT/SIGTERM.
pub struct WatchUseCase {
    context: AppContext,
}

impl WatchUseCase {
    /// Creates the use case over a wired context.
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    /// Executes the daemon loop.
    pub async fn execute(self, coordinator: ShutdownCoordinator) -> Result<()> {
        let AppContext {
            config,
            root,
            catalog,
            remote,
            engine,
            ..
        } = self.context;

        signals::spawn_signal_listener(coordinator.clone());
        let token = coordinator.token();

        let (events_tx, events_rx) = mpsc::channel(config.event_queue_depth);
        let (rescan_tx, rescan_rx) = mpsc::channel(1);

        // Initial scan runs through the same rescan path the API uses; a
        // fresh bounded(1) channel always has room for the first trigger.
        let _ = rescan_tx.try_send(());

        let watcher = FsWatcher::start(
            &config.sync_dir,
            root.clone(),
            config.debounce_window(),
            events_tx,
            token.clone(),
        )?;
        info!(sync_dir = %config.sync_dir.display(), "watcher started");

        let api_state = Arc::new(ApiState {
            catalog,
            remote,
            rescan_tx,
        });
        let api_addr = config.api_addr.clone();
        let api_token = token.clone();
        let api_task = tokio::spawn(async move {
            if let Err(e) = api::serve(&api_addr, api_state, api_token).await {
                warn!("local api stopped: {}", e);
            }
        });

        info!("sync engine running");
        engine.run(events_rx, rescan_rx).await;

        // Engine exits on cancellation; collect the rest within the grace
        // period.
        watcher.join().await;
        let _ = api_task.await;
        coordinator.complete_shutdown();
        coordinator.wait_for_shutdown().await;
        info!("daemon stopped");
        Ok(())
    }
}

impl WatchUseCase {
    /// Default coordinator for the daemon.
    pub fn default_coordinator() -> ShutdownCoordinator {
        ShutdownCoordinator::new(SHUTDOWN_GRACE)
    }
}
