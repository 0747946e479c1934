// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Entity
//!
//! One fixed-size slice of a file, identified by the composite
//! (`chunk_id`, `file_id`) key. The chunk row records the fingerprint and
//! sync status; the byte range needs no storage because it is fully
//! determined by `part_number` and the fixed chunk size. `last_synced`
//! remains `None` until the multipart upload containing this chunk is
//! confirmed by the files service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ChunkId, ContentHash, FileId, PartNumber};

/// A chunk row in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    chunk_id: ChunkId,
    file_id: FileId,
    part_number: PartNumber,
    fingerprint: ContentHash,
    created_at: DateTime<Utc>,
    last_synced: Option<DateTime<Utc>>,
}

impl Chunk {
    /// Creates a not-yet-synced chunk row.
    pub fn new(
        chunk_id: ChunkId,
        file_id: FileId,
        part_number: PartNumber,
        fingerprint: ContentHash,
    ) -> Self {
        Self {
            chunk_id,
            file_id,
            part_number,
            fingerprint,
            created_at: Utc::now(),
            last_synced: None,
        }
    }

    /// Restores a chunk from persisted state.
    pub fn from_parts(
        chunk_id: ChunkId,
        file_id: FileId,
        part_number: PartNumber,
        fingerprint: ContentHash,
        created_at: DateTime<Utc>,
        last_synced: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            chunk_id,
            file_id,
            part_number,
            fingerprint,
            created_at,
            last_synced,
        }
    }

    /// Globally unique chunk identifier
    pub fn chunk_id(&self) -> ChunkId {
        self.chunk_id
    }

    /// Owning file (lookup reference, not ownership)
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// 1-based position in the file
    pub fn part_number(&self) -> PartNumber {
        self.part_number
    }

    /// SHA-256 of exactly this chunk's bytes
    pub fn fingerprint(&self) -> &ContentHash {
        &self.fingerprint
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Confirmation timestamp; `None` until uploaded-and-confirmed
    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.last_synced
    }

    /// True once the chunk's upload has been confirmed
    pub fn is_synced(&self) -> bool {
        self.last_synced.is_some()
    }
}
