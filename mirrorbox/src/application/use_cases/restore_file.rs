// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Restore File Use Case
//!
//! Downloads a synced file's chunks via presigned ranged URLs, verifies
//! every fingerprint and the whole-file hash, and writes the reassembled
//! bytes to the requested destination.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use mirrorbox_domain::value_objects::{FileId, SyncPath};

use super::context::AppContext;

/// Restore a catalog file to a local destination.
pub struct RestoreFileUseCase {
    context: AppContext,
}

impl RestoreFileUseCase {
    /// Creates the use case over a wired context.
    pub fn new(context: AppContext) -> Self {
        Self { context }
    }

    /// Executes the restore. `target` is either a file id (uuid) or a
    /// canonical path inside the sync root.
    pub async fn execute(self, target: &str, output: PathBuf) -> Result<()> {
        let file_id = self.resolve(target).await?;
        self.context.downloader.download_file(file_id, &output).await?;
        info!(target = %target, output = %output.display(), "restore complete");
        println!("Restored {} -> {}", target, output.display());
        Ok(())
    }

    async fn resolve(&self, target: &str) -> Result<FileId> {
        if let Ok(file_id) = FileId::parse(target) {
            return Ok(file_id);
        }
        let path = SyncPath::new(target)?;
        let file = self
            .context
            .catalog
            .find_file_by_path(&path)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no file at '{}'", path))?;
        Ok(file.file_id())
    }
}
