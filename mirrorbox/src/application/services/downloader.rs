// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Downloader / Reassembly
//!
//! Turns a set of chunk records back into exact bytes. For each requested
//! chunk the service returns a presigned URL with byte-range metadata; when
//! the metadata is omitted the range is derived from the part number and
//! the fixed chunk size, so the request is always deterministic. Chunks
//! still present in the local staging directory are used without touching
//! the network (recovery fill).
//!
//! Every downloaded chunk is verified against its recorded fingerprint,
//! and a reassembled file is verified against the recorded `file_hash`.
//! A mismatch fails with `SyncError::IntegrityFailure` and is not retried:
//! it indicates server-side corruption, not a transport hiccup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use mirrorbox_domain::entities::Chunk;
use mirrorbox_domain::value_objects::{ChunkSize, ContentHash, FileId, PartNumber};
use mirrorbox_domain::{Catalog, SyncError};

use crate::infrastructure::remote::wire::{DownloadChunkRef, DownloadRequest, DownloadUrl};
use crate::infrastructure::remote::RemoteFiles;

use super::chunker::Chunker;

/// Parallel ranged-GET downloader with integrity verification.
pub struct Downloader {
    remote: Arc<dyn RemoteFiles>,
    catalog: Arc<dyn Catalog>,
    chunker: Arc<Chunker>,
    chunk_size: ChunkSize,
    workers: Arc<Semaphore>,
}

impl Downloader {
    /// Creates a downloader sharing the transfer worker pool.
    pub fn new(
        remote: Arc<dyn RemoteFiles>,
        catalog: Arc<dyn Catalog>,
        chunker: Arc<Chunker>,
        chunk_size: ChunkSize,
        workers: Arc<Semaphore>,
    ) -> Self {
        Self {
            remote,
            catalog,
            chunker,
            chunk_size,
            workers,
        }
    }

    /// Fetches the given chunks of a file, in no particular order, each
    /// verified against its fingerprint. Local staging copies are used
    /// when present and valid; only the rest hits the network.
    pub async fn fetch_chunks(
        &self,
        file_id: FileId,
        chunks: &[Chunk],
    ) -> Result<Vec<(PartNumber, Vec<u8>)>, SyncError> {
        if chunks.is_empty() {
            return Err(SyncError::InvalidChunk(
                "a download request needs at least one chunk".into(),
            ));
        }

        let empty_hash = ContentHash::from_bytes(b"");
        let mut fetched: Vec<(PartNumber, Vec<u8>)> = Vec::new();
        let mut missing: Vec<&Chunk> = Vec::new();

        for chunk in chunks {
            // A zero-length chunk has nothing to transfer.
            if *chunk.fingerprint() == empty_hash {
                fetched.push((chunk.part_number(), Vec::new()));
                continue;
            }
            match self.local_fill(file_id, chunk).await {
                Some(bytes) => {
                    debug!(part = chunk.part_number().get(), "chunk filled from local staging");
                    fetched.push((chunk.part_number(), bytes));
                }
                None => missing.push(chunk),
            }
        }

        if missing.is_empty() {
            return Ok(fetched);
        }

        let request = DownloadRequest {
            file_id,
            chunks: missing
                .iter()
                .map(|c| DownloadChunkRef {
                    chunk_id: c.chunk_id(),
                    part_number: c.part_number().get(),
                    fingerprint: c.fingerprint().clone(),
                })
                .collect(),
        };
        let response = self.remote.request_download(&request).await?;

        let fingerprints: HashMap<u32, ContentHash> = missing
            .iter()
            .map(|c| (c.part_number().get(), c.fingerprint().clone()))
            .collect();

        let mut tasks: JoinSet<Result<(PartNumber, Vec<u8>), SyncError>> = JoinSet::new();
        for url in response.download_urls {
            let expected = fingerprints.get(&url.part_number).cloned().ok_or_else(|| {
                SyncError::remote(format!(
                    "service returned an unrequested part {}",
                    url.part_number
                ))
            })?;
            let range = self.range_for(&url);
            let remote = Arc::clone(&self.remote);
            let workers = Arc::clone(&self.workers);

            tasks.spawn(async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .map_err(|_| SyncError::Cancelled("worker pool closed".into()))?;

                let bytes = remote.get_chunk(&url.presigned_url, Some(&range)).await?;
                let actual = ContentHash::from_bytes(&bytes);
                if actual != expected {
                    return Err(SyncError::IntegrityFailure(format!(
                        "chunk {} fingerprint mismatch: expected {}, got {}",
                        url.part_number, expected, actual
                    )));
                }
                Ok((PartNumber::new(url.part_number)?, bytes))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (part, bytes) = joined
                .map_err(|e| SyncError::Internal(format!("download task panicked: {}", e)))??;
            fetched.push((part, bytes));
        }

        if fetched.len() != chunks.len() {
            return Err(SyncError::remote(format!(
                "service returned {} of {} requested chunks",
                fetched.len(),
                chunks.len()
            )));
        }
        Ok(fetched)
    }

    /// Downloads all chunks of a catalog file and reassembles them at
    /// `dest` (temp file + rename), verifying the whole-file hash.
    pub async fn download_file(&self, file_id: FileId, dest: &Path) -> Result<(), SyncError> {
        let file = self
            .catalog
            .find_file(file_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("file {}", file_id)))?;
        let chunks = self.catalog.chunks_for_file(file_id).await?;
        if chunks.is_empty() {
            return Err(SyncError::ConsistencyViolation(format!(
                "file {} has no chunk rows",
                file_id
            )));
        }

        let mut parts = self.fetch_chunks(file_id, &chunks).await?;
        parts.sort_by_key(|(part, _)| part.get());

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = dest.with_extension("mirrorbox_partial");
        let mut writer = tokio::fs::File::create(&tmp).await?;
        let mut whole = mirrorbox_domain::services::StreamingChecksum::new();
        for (_, bytes) in &parts {
            writer.write_all(bytes).await?;
            whole.update(bytes);
        }
        writer.flush().await?;
        drop(writer);

        let actual = whole.finalize();
        if actual != *file.file_hash() {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(SyncError::IntegrityFailure(format!(
                "file {} hash mismatch after reassembly: expected {}, got {}",
                file_id,
                file.file_hash(),
                actual
            )));
        }
        tokio::fs::rename(&tmp, dest).await?;

        info!(file_id = %file_id, dest = %dest.display(), chunks = parts.len(), "file restored");
        Ok(())
    }

    /// Range header for a download slot: the service's value bit-exact when
    /// present, otherwise derived from the part number and chunk size.
    fn range_for(&self, url: &DownloadUrl) -> String {
        if let Some(header) = &url.range_header {
            return header.clone();
        }
        if let (Some(start), Some(end)) = (url.start_byte, url.end_byte) {
            return format!("bytes={}-{}", start, end);
        }
        let start = self.chunk_size.offset_of(url.part_number);
        let end = start + self.chunk_size.bytes() - 1;
        format!("bytes={}-{}", start, end)
    }

    /// Valid staged payload for the chunk, when one exists.
    async fn local_fill(&self, file_id: FileId, chunk: &Chunk) -> Option<Vec<u8>> {
        let path = self
            .chunker
            .staging_path(&file_id.to_string(), chunk.part_number().get());
        let bytes = tokio::fs::read(&path).await.ok()?;
        if ContentHash::from_bytes(&bytes) == *chunk.fingerprint() {
            Some(bytes)
        } else {
            None
        }
    }
}
