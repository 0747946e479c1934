// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Size Value Object
//!
//! The fixed size `S` used to split files into chunks. Every chunk of a file
//! except the last is exactly `S` bytes; the last carries the remainder. The
//! byte range of part number `p` is `[(p-1)·S, min(p·S, file_size)-1]`, so
//! chunk boundaries are fully determined by this value and never need to be
//! stored per chunk.
//!
//! The default is 5 MiB, matching the multipart minimum of S3-compatible
//! object stores.

use serde::{Deserialize, Serialize};

use crate::SyncError;

/// Value object representing the fixed chunk size with validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkSize {
    bytes: u64,
}

impl ChunkSize {
    /// Minimum chunk size (1 byte) - degenerate but valid for tests
    pub const MIN_SIZE: u64 = 1;

    /// Maximum chunk size (512MB) - prevents memory exhaustion
    pub const MAX_SIZE: u64 = 512 * 1024 * 1024;

    /// Default chunk size (5 MiB)
    pub const DEFAULT_SIZE: u64 = 5 * 1024 * 1024;

    /// Creates a new chunk size with validation.
    ///
    /// # Errors
    /// Returns `SyncError::InvalidConfiguration` when the size is outside
    /// `[MIN_SIZE, MAX_SIZE]`.
    pub fn new(bytes: u64) -> Result<Self, SyncError> {
        if bytes < Self::MIN_SIZE {
            return Err(SyncError::InvalidConfiguration(format!(
                "chunk size {} is below minimum of {} bytes",
                bytes,
                Self::MIN_SIZE
            )));
        }
        if bytes > Self::MAX_SIZE {
            return Err(SyncError::InvalidConfiguration(format!(
                "chunk size {} exceeds maximum of {} bytes",
                bytes,
                Self::MAX_SIZE
            )));
        }
        Ok(ChunkSize { bytes })
    }

    /// Creates a chunk size from mebibytes
    pub fn from_mib(mib: u64) -> Result<Self, SyncError> {
        Self::new(mib * 1024 * 1024)
    }

    /// Gets the chunk size in bytes
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Number of chunks a file of `file_size` bytes splits into.
    ///
    /// A zero-length file still yields exactly one (empty) chunk.
    pub fn chunk_count(&self, file_size: u64) -> u32 {
        if file_size == 0 {
            return 1;
        }
        file_size.div_ceil(self.bytes) as u32
    }

    /// Byte offset of the 1-based part `part_number`.
    pub fn offset_of(&self, part_number: u32) -> u64 {
        (part_number as u64 - 1) * self.bytes
    }

    /// Length of the 1-based part `part_number` within a file of
    /// `file_size` bytes.
    pub fn length_of(&self, part_number: u32, file_size: u64) -> u64 {
        let offset = self.offset_of(part_number);
        file_size.saturating_sub(offset).min(self.bytes)
    }

    /// Inclusive byte range `(start, end)` of the 1-based part, as sent in
    /// an HTTP `Range` header. The range of an empty file's single chunk is
    /// degenerate and callers are expected to skip ranged requests for it.
    pub fn byte_range(&self, part_number: u32, file_size: u64) -> (u64, u64) {
        let start = self.offset_of(part_number);
        let end = (start + self.length_of(part_number, file_size)).saturating_sub(1);
        (start, end.max(start))
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        ChunkSize {
            bytes: Self::DEFAULT_SIZE,
        }
    }
}
