// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Manifest
//!
//! Output of chunking a file: the whole-file hash plus one record per chunk
//! in strictly ascending part order. The manifest is what the sync engine
//! carries between the chunker, the catalog transaction, and the uploader —
//! chunk payloads themselves stay on disk in the staging directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::value_objects::{ContentHash, PartNumber};
use crate::SyncError;

/// One chunk produced by the chunker.
///
/// `staging_path` points at a file holding exactly this chunk's bytes,
/// ready for upload. The payload is safe to delete once the chunk has been
/// uploaded and confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkManifestEntry {
    part_number: PartNumber,
    offset: u64,
    length: u64,
    fingerprint: ContentHash,
    staging_path: PathBuf,
}

impl ChunkManifestEntry {
    /// Creates a manifest entry.
    pub fn new(
        part_number: PartNumber,
        offset: u64,
        length: u64,
        fingerprint: ContentHash,
        staging_path: PathBuf,
    ) -> Self {
        Self {
            part_number,
            offset,
            length,
            fingerprint,
            staging_path,
        }
    }

    /// 1-based position in the file
    pub fn part_number(&self) -> PartNumber {
        self.part_number
    }

    /// Byte offset of this chunk in the original file
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Chunk length in bytes; only the last chunk may be shorter than the
    /// configured chunk size
    pub fn length(&self) -> u64 {
        self.length
    }

    /// SHA-256 fingerprint of exactly this chunk's bytes
    pub fn fingerprint(&self) -> &ContentHash {
        &self.fingerprint
    }

    /// Location of the staged payload awaiting upload
    pub fn staging_path(&self) -> &PathBuf {
        &self.staging_path
    }
}

/// Complete chunking result for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileManifest {
    file_hash: ContentHash,
    file_size: u64,
    chunks: Vec<ChunkManifestEntry>,
}

impl FileManifest {
    /// Creates a manifest, validating that chunks arrive in strictly
    /// ascending part order starting at 1 and that their lengths sum to the
    /// file size.
    ///
    /// # Errors
    /// Returns `SyncError::InvalidChunk` when the part sequence has gaps or
    /// the lengths do not partition the file.
    pub fn new(
        file_hash: ContentHash,
        file_size: u64,
        chunks: Vec<ChunkManifestEntry>,
    ) -> Result<Self, SyncError> {
        if chunks.is_empty() {
            return Err(SyncError::InvalidChunk(
                "a manifest must contain at least one chunk".into(),
            ));
        }
        let mut total = 0u64;
        for (i, chunk) in chunks.iter().enumerate() {
            let expected = (i + 1) as u32;
            if chunk.part_number().get() != expected {
                return Err(SyncError::InvalidChunk(format!(
                    "part numbers must be contiguous from 1: expected {}, got {}",
                    expected,
                    chunk.part_number()
                )));
            }
            total += chunk.length();
        }
        if total != file_size {
            return Err(SyncError::InvalidChunk(format!(
                "chunk lengths sum to {} but file size is {}",
                total, file_size
            )));
        }
        Ok(Self {
            file_hash,
            file_size,
            chunks,
        })
    }

    /// SHA-256 of the entire file content
    pub fn file_hash(&self) -> &ContentHash {
        &self.file_hash
    }

    /// Size of the original file in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Chunk records in ascending part order
    pub fn chunks(&self) -> &[ChunkManifestEntry] {
        &self.chunks
    }

    /// Number of chunks
    pub fn chunk_count(&self) -> u32 {
        self.chunks.len() as u32
    }
}
