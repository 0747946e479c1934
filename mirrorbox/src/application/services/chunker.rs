// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunker
//!
//! Splits a file into fixed-size chunks in a single streaming pass,
//! computing the whole-file SHA-256 and the per-chunk fingerprints as the
//! bytes flow through. Chunk payloads are written to the staging directory
//! as `<key>_<part_number>` so the uploader can PUT them without re-reading
//! the source, and the downloader can fill missing parts locally.
//!
//! ## Determinism
//!
//! Byte-identical inputs yield byte-identical chunk boundaries,
//! fingerprints, and file hash: boundaries are purely positional (fixed
//! size `S`), and hashes are SHA-256 over exactly the chunk's bytes.
//!
//! ## Source Mutation
//!
//! The source file's size is captured before the read; if the bytes read
//! disagree with it when the stream ends, the staged output is discarded
//! and the call fails with `SyncError::SourceMutated` — the caller retries
//! once after a short backoff, by which time the writer has usually
//! settled.
//!
//! A zero-length file produces exactly one zero-length chunk whose
//! fingerprint is the SHA-256 of the empty string.

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use mirrorbox_domain::services::StreamingChecksum;
use mirrorbox_domain::value_objects::{ChunkManifestEntry, ChunkSize, FileManifest, PartNumber};
use mirrorbox_domain::SyncError;

/// Read buffer size for the streaming pass.
const READ_BUFFER: usize = 64 * 1024;

/// Streaming file chunker writing payloads to a staging directory.
pub struct Chunker {
    chunk_size: ChunkSize,
    staging_dir: PathBuf,
}

impl Chunker {
    /// Creates a chunker staging payloads under `staging_dir`.
    pub fn new(chunk_size: ChunkSize, staging_dir: PathBuf) -> Self {
        Self {
            chunk_size,
            staging_dir,
        }
    }

    /// The fixed chunk size in use.
    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// Staging path for one part of a keyed file.
    pub fn staging_path(&self, key: &str, part_number: u32) -> PathBuf {
        self.staging_dir.join(format!("{}_{}", key, part_number))
    }

    /// Chunks `source`, staging payloads under `key`, and returns the
    /// manifest.
    ///
    /// # Errors
    /// - `SyncError::SourceMutated` when the file's size changed during
    ///   the read (staged output is cleaned up before returning)
    /// - `SyncError::IoError` for filesystem failures
    pub async fn chunk_file(&self, source: &Path, key: &str) -> Result<FileManifest, SyncError> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;

        let expected_size = tokio::fs::metadata(source).await?.len();
        let mut file = File::open(source).await?;

        let chunk_bytes = self.chunk_size.bytes();
        let mut file_hash = StreamingChecksum::new();
        let mut entries: Vec<ChunkManifestEntry> = Vec::new();
        let mut buffer = vec![0u8; READ_BUFFER];
        let mut part: u32 = 1;
        let mut total: u64 = 0;
        let mut eof = false;

        while !eof {
            let staging_path = self.staging_path(key, part);
            let mut writer = File::create(&staging_path).await?;
            let mut chunk_hash = StreamingChecksum::new();
            let mut chunk_len: u64 = 0;

            while chunk_len < chunk_bytes {
                let want = ((chunk_bytes - chunk_len) as usize).min(READ_BUFFER);
                let n = file.read(&mut buffer[..want]).await?;
                if n == 0 {
                    eof = true;
                    break;
                }
                writer.write_all(&buffer[..n]).await?;
                chunk_hash.update(&buffer[..n]);
                file_hash.update(&buffer[..n]);
                chunk_len += n as u64;
                total += n as u64;
            }
            writer.flush().await?;
            drop(writer);

            if chunk_len == 0 && part > 1 {
                // EOF landed exactly on a chunk boundary; the speculative
                // staging file is empty and unwanted.
                let _ = tokio::fs::remove_file(&staging_path).await;
                break;
            }

            let offset = (part as u64 - 1) * chunk_bytes;
            entries.push(ChunkManifestEntry::new(
                PartNumber::new(part)?,
                offset,
                chunk_len,
                chunk_hash.finalize(),
                staging_path,
            ));
            part += 1;
        }

        if total != expected_size {
            self.discard(key, entries.len() as u32).await;
            return Err(SyncError::SourceMutated(format!(
                "'{}' was {} bytes at open but {} bytes were read",
                source.display(),
                expected_size,
                total
            )));
        }

        let manifest = FileManifest::new(file_hash.finalize(), total, entries)?;
        debug!(
            source = %source.display(),
            size = total,
            chunks = manifest.chunk_count(),
            hash = %manifest.file_hash(),
            "chunked file"
        );
        Ok(manifest)
    }

    /// Renames staged payloads from one key to another (used when the
    /// files service issues the authoritative file id after chunking), and
    /// returns a manifest pointing at the new paths.
    pub async fn relabel(
        &self,
        manifest: &FileManifest,
        new_key: &str,
    ) -> Result<FileManifest, SyncError> {
        let mut entries = Vec::with_capacity(manifest.chunks().len());
        for chunk in manifest.chunks() {
            let new_path = self.staging_path(new_key, chunk.part_number().get());
            tokio::fs::rename(chunk.staging_path(), &new_path).await?;
            entries.push(ChunkManifestEntry::new(
                chunk.part_number(),
                chunk.offset(),
                chunk.length(),
                chunk.fingerprint().clone(),
                new_path,
            ));
        }
        FileManifest::new(manifest.file_hash().clone(), manifest.file_size(), entries)
    }

    /// Removes staged payloads for a key. Safe to call once every chunk of
    /// the key has `last_synced` set; missing files are ignored.
    pub async fn discard(&self, key: &str, chunk_count: u32) {
        for part in 1..=chunk_count.max(1) {
            let path = self.staging_path(key, part);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), "failed to remove staging file: {}", e);
                }
            }
        }
    }
}
