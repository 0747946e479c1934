// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Status Use Case
//!
//! Prints a catalog summary: counts, pending files, and remote health.

use anyhow::Result;

use super::context::AppContext;

/// Catalog and service status report.
pub struct ShowStatusUseCase {
    context: AppContext,
}

impl ShowStatusUseCase {
    /// Creates the use case over a wired context.
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    /// Executes the report to stdout.
    pub async fn execute(self) -> Result<()> {
        let folders = self.context.catalog.list_folders().await?;
        let files = self.context.catalog.list_files().await?;
        let pending = self.context.catalog.files_pending_sync().await?;

        println!("Sync root:   {}", self.context.root);
        println!("Folders:     {}", folders.len());
        println!("Files:       {}", files.len());
        println!("Pending:     {}", pending.len());
        for file in &pending {
            println!("  - {}", file.file_path());
        }

        match self.context.remote.health().await {
            Ok(true) => println!("Service:     healthy"),
            Ok(false) => println!("Service:     unhealthy"),
            Err(e) => println!("Service:     unreachable ({})", e),
        }
        Ok(())
    }
}
