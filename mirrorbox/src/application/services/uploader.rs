// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Uploader
//!
//! Drives the three-phase multipart upload for one file:
//!
//! 1. **Prepare** — `POST /files` with the file's metadata and chunk count;
//!    the service issues the authoritative `file_id` and one presigned URL
//!    per part. The catalog transaction (file row + all chunk rows) commits
//!    here, before the first PUT, so a partial upload can never leave a
//!    file without chunks.
//! 2. **Upload** — presigned PUTs run in parallel under the shared worker
//!    semaphore; returned `ETag`s are captured for diagnostics. Chunks
//!    whose fingerprint is already synced under another file may be
//!    skipped (content deduplication) — the server materializes them from
//!    the existing object.
//! 3. **Confirm** — `POST /files/confirm` with every chunk id in part
//!    order, then `mark_chunks_synced` flips `last_synced` and the staging
//!    payloads are discarded.
//!
//! Any failure leaves `last_synced` NULL for the affected chunks; the file
//! is retried from the Chunked state by the engine.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use mirrorbox_bootstrap::CancellationToken;
use mirrorbox_domain::entities::{Chunk, FileEntry};
use mirrorbox_domain::services::media_type_for_path;
use mirrorbox_domain::value_objects::{FileId, FileManifest, FolderId, PartNumber, SyncPath};
use mirrorbox_domain::{Catalog, SyncError};

use crate::infrastructure::remote::wire::{ConfirmRequest, PrepareUploadRequest, PresignedUpload};
use crate::infrastructure::remote::RemoteFiles;

use super::chunker::Chunker;

/// Multipart upload coordinator.
pub struct Uploader {
    remote: Arc<dyn RemoteFiles>,
    catalog: Arc<dyn Catalog>,
    chunker: Arc<Chunker>,
    workers: Arc<Semaphore>,
    dedup_uploads: bool,
}

impl Uploader {
    /// Creates an uploader sharing the transfer worker pool.
    pub fn new(
        remote: Arc<dyn RemoteFiles>,
        catalog: Arc<dyn Catalog>,
        chunker: Arc<Chunker>,
        workers: Arc<Semaphore>,
        dedup_uploads: bool,
    ) -> Self {
        Self {
            remote,
            catalog,
            chunker,
            workers,
            dedup_uploads,
        }
    }

    /// Uploads a chunked file end to end, returning the service-issued id.
    ///
    /// When `replaces` is set, the catalog supersedes that record instead
    /// of inserting a fresh one (content modification keeps the path but
    /// changes the identity).
    pub async fn sync_file(
        &self,
        path: &SyncPath,
        folder_id: FolderId,
        manifest: FileManifest,
        replaces: Option<FileId>,
        token: &CancellationToken,
    ) -> Result<FileId, SyncError> {
        // Phase 1: prepare
        let request = PrepareUploadRequest {
            file_name: path
                .file_name()
                .ok_or_else(|| {
                    SyncError::ConsistencyViolation(format!("'{}' has no file name", path))
                })?
                .to_string(),
            file_path: path.to_string(),
            file_type: media_type_for_path(path).to_string(),
            folder_id,
            chunk_count: manifest.chunk_count(),
            file_hash: manifest.file_hash().clone(),
        };
        let prepared = self.remote.prepare_upload(&request).await?;
        let file_id = prepared.file_id;

        let mut slots: Vec<PresignedUpload> = prepared.presigned_urls;
        slots.sort_by_key(|s| s.part_number);
        for (i, slot) in slots.iter().enumerate() {
            if slot.part_number != (i + 1) as u32 {
                return Err(SyncError::remote(format!(
                    "presigned urls are not contiguous: expected part {}, got {}",
                    i + 1,
                    slot.part_number
                )));
            }
        }

        // Adopt the service id for the staged payloads.
        let manifest = self.chunker.relabel(&manifest, &file_id.to_string()).await?;

        // Commit file + chunk rows before the first PUT.
        let file = FileEntry::with_id(
            file_id,
            path.clone(),
            folder_id,
            request.file_type.clone(),
            manifest.file_hash().clone(),
        )?;
        let chunks: Vec<Chunk> = slots
            .iter()
            .map(|slot| {
                let entry = &manifest.chunks()[(slot.part_number - 1) as usize];
                Ok(Chunk::new(
                    slot.chunk_id,
                    file_id,
                    PartNumber::new(slot.part_number)?,
                    entry.fingerprint().clone(),
                ))
            })
            .collect::<Result<_, SyncError>>()?;

        match replaces {
            Some(old_id) => {
                self.catalog
                    .replace_file_content(old_id, &file, &chunks)
                    .await?
            }
            None => self.catalog.insert_file(&file, &chunks).await?,
        }

        // Phases 2 and 3; on failure the staged payloads are discarded —
        // retry re-chunks from the source, so stale staging is only waste.
        let chunk_ids = chunks.iter().map(|c| c.chunk_id()).collect::<Vec<_>>();
        let transfer = async {
            self.put_chunks(&manifest, &slots, token).await?;
            self.remote
                .confirm_upload(&ConfirmRequest { file_id, chunk_ids: chunk_ids.clone() })
                .await?;
            self.catalog.mark_chunks_synced(file_id, &chunk_ids).await
        };
        if let Err(e) = transfer.await {
            self.chunker
                .discard(&file_id.to_string(), manifest.chunk_count())
                .await;
            return Err(e);
        }

        self.chunker
            .discard(&file_id.to_string(), manifest.chunk_count())
            .await;

        info!(
            path = %path,
            file_id = %file_id,
            chunks = manifest.chunk_count(),
            size = manifest.file_size(),
            "file synced"
        );
        Ok(file_id)
    }

    /// Runs the PUT phase under the worker semaphore. Fails on the first
    /// chunk that exhausts its retries.
    async fn put_chunks(
        &self,
        manifest: &FileManifest,
        slots: &[PresignedUpload],
        token: &CancellationToken,
    ) -> Result<(), SyncError> {
        // Dedup lookup happens up front: the rows for this very file were
        // just inserted with last_synced NULL, so they never match.
        let mut skip: HashMap<u32, bool> = HashMap::new();
        if self.dedup_uploads {
            for entry in manifest.chunks() {
                let synced = self
                    .catalog
                    .find_synced_fingerprint(entry.fingerprint())
                    .await?;
                if let Some(existing) = synced {
                    debug!(
                        part = entry.part_number().get(),
                        fingerprint = %entry.fingerprint(),
                        existing_file = %existing.file_id(),
                        "skipping PUT, fingerprint already synced"
                    );
                    skip.insert(entry.part_number().get(), true);
                }
            }
        }

        let mut tasks: JoinSet<Result<(), SyncError>> = JoinSet::new();
        for slot in slots {
            if *skip.get(&slot.part_number).unwrap_or(&false) {
                continue;
            }
            let entry = &manifest.chunks()[(slot.part_number - 1) as usize];
            let staging_path = entry.staging_path().clone();
            let url = slot.presigned_url.clone();
            let part = slot.part_number;
            let remote = Arc::clone(&self.remote);
            let workers = Arc::clone(&self.workers);
            let token = token.clone();

            tasks.spawn(async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .map_err(|_| SyncError::Cancelled("worker pool closed".into()))?;
                if token.is_cancelled() {
                    return Err(SyncError::Cancelled("shutdown during upload".into()));
                }

                let bytes = tokio::fs::read(&staging_path).await?;
                let put = remote.put_chunk(&url, bytes);
                tokio::select! {
                    _ = token.cancelled() => Err(SyncError::Cancelled("shutdown during upload".into())),
                    result = put => {
                        let etag = result?;
                        debug!(part, etag = etag.as_deref().unwrap_or("-"), "chunk uploaded");
                        Ok(())
                    }
                }
            });
        }

        let mut first_error: Option<SyncError> = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| SyncError::Internal(format!("upload task panicked: {}", e)))?;
            if let Err(e) = result {
                warn!(error = %e, "chunk upload failed");
                if first_error.is_none() {
                    first_error = Some(e);
                    // Let in-flight siblings finish; nothing new is spawned.
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
