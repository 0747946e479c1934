// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sync Engine
//!
//! Long-running coordinator between the watcher's event stream and the
//! catalog/uploader. For each canonical event the engine computes a plan
//! and executes it:
//!
//! | Event           | Plan                                                    |
//! |-----------------|---------------------------------------------------------|
//! | Created (dir)   | upsert folder                                           |
//! | Created (file)  | chunk → insert file + chunks → upload → confirm         |
//! | Modified (file) | chunk; unchanged hash drops; else replace → upload      |
//! | Deleted         | delete by path (cascades)                               |
//! | Renamed         | rename/move in place, no re-upload                      |
//! | RescanRequired  | full filesystem ⇄ catalog diff, then the same plans     |
//!
//! ## Concurrency
//!
//! Events for one path are processed strictly in receipt order behind a
//! per-path async mutex; independent paths sync concurrently. Renames lock
//! both endpoints in lexicographic order so two crossing renames cannot
//! deadlock. Chunk transfer parallelism is bounded by the worker semaphore
//! shared with the uploader and downloader.
//!
//! ## Failure Policy
//!
//! A failing file never takes the process down: the error is logged with
//! the path, staged payloads are discarded, and the file returns to the
//! Chunked state — the next event or rescan retries it. Catalog errors
//! that indicate divergence from the filesystem (`DuplicatePath`,
//! `NotFound`, `ConsistencyViolation`) trigger a localized re-derivation
//! from current filesystem state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use mirrorbox_bootstrap::CancellationToken;
use mirrorbox_domain::value_objects::FileManifest;
use mirrorbox_domain::{Catalog, ChangeEvent, PathKind, SyncError, SyncPath};

use crate::infrastructure::watcher::Rescanner;

use super::chunker::Chunker;
use super::uploader::Uploader;

/// Backoff before the single retry after a source-mutation failure.
const SOURCE_MUTATED_BACKOFF: Duration = Duration::from_millis(200);

/// Event-driven synchronization coordinator.
pub struct SyncEngine {
    catalog: Arc<dyn Catalog>,
    chunker: Arc<Chunker>,
    uploader: Arc<Uploader>,
    rescanner: Arc<Rescanner>,
    path_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    token: CancellationToken,
}

impl SyncEngine {
    /// Creates the engine over its collaborators.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        chunker: Arc<Chunker>,
        uploader: Arc<Uploader>,
        rescanner: Arc<Rescanner>,
        token: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            chunker,
            uploader,
            rescanner,
            path_locks: Mutex::new(HashMap::new()),
            token,
        }
    }

    /// Consumes events until cancellation. `rescan_rx` carries manual
    /// rescan triggers (startup, the local API, watcher overflow recovery).
    pub async fn run(
        self: Arc<Self>,
        mut events_rx: mpsc::Receiver<ChangeEvent>,
        mut rescan_rx: mpsc::Receiver<()>,
    ) {
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.token.cancelled() => {
                    debug!("sync engine cancelled");
                    break;
                }
                // Reap finished per-file tasks so the set stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
                maybe_event = events_rx.recv() => {
                    match maybe_event {
                        Some(ChangeEvent::RescanRequired) => {
                            self.rescan_and_dispatch(&mut tasks).await;
                        }
                        Some(event) => self.dispatch(event, &mut tasks),
                        None => break,
                    }
                }
                maybe_trigger = rescan_rx.recv() => {
                    if maybe_trigger.is_some() {
                        self.rescan_and_dispatch(&mut tasks).await;
                    }
                }
            }
        }

        // Let in-flight per-file tasks observe the token and wind down.
        while tasks.join_next().await.is_some() {}
    }

    /// Spawns a per-file task for one event.
    fn dispatch(self: &Arc<Self>, event: ChangeEvent, tasks: &mut JoinSet<()>) {
        let engine = Arc::clone(self);
        tasks.spawn(async move {
            let label = event.to_string();
            if let Err(e) = engine.process_event(event).await {
                if matches!(e, SyncError::Cancelled(_)) {
                    debug!(event = %label, "event abandoned during shutdown");
                } else {
                    error!(event = %label, category = e.category(), "event failed: {}", e);
                }
            }
        });
    }

    /// Runs the rescan procedure and dispatches every synthetic event.
    async fn rescan_and_dispatch(self: &Arc<Self>, tasks: &mut JoinSet<()>) {
        info!("running full rescan");
        match self.rescanner.scan().await {
            Ok(events) => {
                info!(events = events.len(), "rescan produced events");
                for event in events {
                    self.dispatch(event, tasks);
                }
            }
            Err(e) => error!("rescan failed: {}", e),
        }
    }

    /// Processes one event to completion, holding the per-path lock(s).
    ///
    /// Public so one-shot flows (`sync` subcommand, tests) can drive the
    /// engine without the channel loop.
    pub async fn process_event(&self, event: ChangeEvent) -> Result<(), SyncError> {
        match event {
            ChangeEvent::Created { path, kind } => {
                let _guard = self.lock_path(&path).await;
                match kind {
                    PathKind::Directory => self.handle_created_dir(&path).await,
                    PathKind::File => self.handle_file_content(&path).await,
                }
            }
            ChangeEvent::Modified { path } => {
                let _guard = self.lock_path(&path).await;
                self.handle_file_content(&path).await
            }
            ChangeEvent::Deleted { path } => {
                let _guard = self.lock_path(&path).await;
                self.handle_deleted(&path).await
            }
            ChangeEvent::Renamed { from, to, kind } => {
                // Lock both endpoints in a stable order to avoid deadlock
                // with a crossing rename.
                let (first, second) = if from.as_str() <= to.as_str() {
                    (from.clone(), to.clone())
                } else {
                    (to.clone(), from.clone())
                };
                let _first = self.lock_path(&first).await;
                let _second = if first == second {
                    None
                } else {
                    Some(self.lock_path(&second).await)
                };
                self.handle_renamed(&from, &to, kind).await
            }
            ChangeEvent::RescanRequired => {
                // Sequential callers resolve the rescan inline.
                let events = self.rescanner.scan().await?;
                for event in events {
                    Box::pin(self.process_event(event)).await?;
                }
                Ok(())
            }
        }
    }

    async fn lock_path(&self, path: &SyncPath) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.path_locks.lock().await;
            Arc::clone(
                locks
                    .entry(path.as_str().to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    async fn handle_created_dir(&self, path: &SyncPath) -> Result<(), SyncError> {
        let folder_id = self.catalog.upsert_folder(path).await?;
        debug!(path = %path, folder_id = %folder_id, "folder upserted");
        Ok(())
    }

    /// Created-or-modified file: chunk, compare, upload. On catalog
    /// divergence the plan is re-derived from filesystem state once.
    async fn handle_file_content(&self, path: &SyncPath) -> Result<(), SyncError> {
        match self.sync_file_content(path).await {
            Err(e) if e.needs_rescan() => {
                warn!(path = %path, "catalog diverged ({}), re-deriving from filesystem", e);
                self.rederive_path(path).await
            }
            other => other,
        }
    }

    /// One attempt at syncing a file's content, no divergence recovery.
    async fn sync_file_content(&self, path: &SyncPath) -> Result<(), SyncError> {
        if self.token.is_cancelled() {
            return Err(SyncError::Cancelled("shutdown".into()));
        }

        let os_path = Path::new(path.as_str());
        match tokio::fs::metadata(os_path).await {
            Ok(meta) if meta.is_file() => {}
            // The path vanished or turned into a directory between the
            // event and now; later events describe the new reality.
            _ => {
                debug!(path = %path, "path gone or not a file, dropping event");
                return Ok(());
            }
        }

        let provisional_key = uuid::Uuid::new_v4().to_string();
        let manifest = self.chunk_with_retry(os_path, &provisional_key).await?;

        let existing = self.catalog.find_file_by_path(path).await?;
        if let Some(ref existing_file) = existing {
            if existing_file.file_hash() == manifest.file_hash()
                && self.fully_synced(existing_file.file_id()).await?
            {
                debug!(path = %path, hash = %manifest.file_hash(), "content unchanged, dropping");
                self.chunker
                    .discard(&provisional_key, manifest.chunk_count())
                    .await;
                return Ok(());
            }
        }

        let parent = path.parent().ok_or_else(|| {
            SyncError::ConsistencyViolation(format!("file '{}' has no parent", path))
        })?;
        let folder_id = self.catalog.upsert_folder(&parent).await?;

        let chunk_count = manifest.chunk_count();
        let result = self
            .uploader
            .sync_file(
                path,
                folder_id,
                manifest,
                existing.map(|f| f.file_id()),
                &self.token,
            )
            .await;

        if result.is_err() {
            // Staged payloads under the provisional key survive only when
            // the failure predates the relabel; either way the retry path
            // re-chunks from the source.
            self.chunker.discard(&provisional_key, chunk_count).await;
        }
        result.map(|_| ())
    }

    async fn handle_deleted(&self, path: &SyncPath) -> Result<(), SyncError> {
        match self.catalog.delete_by_path(path).await {
            Ok(removed) => {
                debug!(path = %path, files = removed.len(), "deleted from catalog");
                Ok(())
            }
            // Already absent: deletes are idempotent by design (rescans
            // and cascades both race benignly here).
            Err(SyncError::NotFound(_)) => {
                debug!(path = %path, "delete target already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_renamed(
        &self,
        from: &SyncPath,
        to: &SyncPath,
        kind: PathKind,
    ) -> Result<(), SyncError> {
        match self.catalog.rename_or_move(from, to).await {
            Ok(()) => {
                debug!(from = %from, to = %to, "renamed in catalog");
                Ok(())
            }
            Err(e) if e.needs_rescan() => {
                warn!(from = %from, to = %to, "rename diverged ({}), re-deriving", e);
                // The source never made it into the catalog (or the target
                // already exists): fall back to treating the destination as
                // new content.
                match kind {
                    PathKind::Directory => self.handle_created_dir(to).await,
                    PathKind::File => self.rederive_path(to).await,
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Localized rescan of one path: make the catalog match the filesystem.
    /// Deliberately calls the single-attempt content path so divergence
    /// recovery cannot recurse.
    async fn rederive_path(&self, path: &SyncPath) -> Result<(), SyncError> {
        let os_path = Path::new(path.as_str());
        match tokio::fs::metadata(os_path).await {
            Ok(meta) if meta.is_dir() => self.handle_created_dir(path).await,
            Ok(_) => self.sync_file_content(path).await,
            Err(_) => self.handle_deleted(path).await,
        }
    }

    /// Chunks with one retry after `SourceMutated`.
    async fn chunk_with_retry(
        &self,
        source: &Path,
        key: &str,
    ) -> Result<FileManifest, SyncError> {
        match self.chunker.chunk_file(source, key).await {
            Err(SyncError::SourceMutated(msg)) => {
                debug!(source = %source.display(), "source mutated ({}), retrying once", msg);
                tokio::time::sleep(SOURCE_MUTATED_BACKOFF).await;
                self.chunker.chunk_file(source, key).await
            }
            other => other,
        }
    }

    /// True when every chunk of the file has been confirmed.
    async fn fully_synced(&self, file_id: mirrorbox_domain::FileId) -> Result<bool, SyncError> {
        let chunks = self.catalog.chunks_for_file(file_id).await?;
        Ok(!chunks.is_empty() && chunks.iter().all(|c| c.is_synced()))
    }
}
