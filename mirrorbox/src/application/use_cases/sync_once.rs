// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # One-Shot Sync Use Case
//!
//! Runs the full rescan procedure and processes every resulting event
//! sequentially, then exits. Used by the `sync` subcommand and by batch
//! jobs that do not want a resident watcher.

use anyhow::Result;
use tracing::{info, warn};

use mirrorbox_domain::ChangeEvent;

use super::context::AppContext;

/// Scan-and-drain synchronization pass.
pub struct SyncOnceUseCase {
    context: AppContext,
}

impl SyncOnceUseCase {
    /// Creates the use case over a wired context.
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    /// Executes one full pass. Per-file failures are logged and counted,
    /// not fatal; the exit is an error only when every event failed to
    /// even start (e.g. the service is unreachable).
    pub async fn execute(self) -> Result<()> {
        let events = self.context.rescanner.scan().await?;
        let total = events.len();
        info!(events = total, "one-shot sync starting");

        let mut failures = 0usize;
        for event in events {
            let label = event.to_string();
            if matches!(event, ChangeEvent::RescanRequired) {
                continue;
            }
            if let Err(e) = self.context.engine.process_event(event).await {
                warn!(event = %label, "event failed: {}", e);
                failures += 1;
            }
        }

        info!(events = total, failures, "one-shot sync finished");
        if failures > 0 && failures == total && total > 0 {
            anyhow::bail!("all {} events failed; see log for details", total);
        }
        Ok(())
    }
}
