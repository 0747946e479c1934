// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Type-safe chunk identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::SyncError;

/// Opaque 128-bit chunk identifier, rendered as a lowercase UUID string.
///
/// Globally unique, but the canonical key of a chunk row is the composite
/// (`chunk_id`, `file_id`). Issued by the files service alongside the
/// presigned upload URL for the matching part number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(Uuid);

impl ChunkId {
    /// Generates a new random chunk id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a chunk id from its lowercase UUID string form
    pub fn parse(s: &str) -> Result<Self, SyncError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::Serialization(format!("invalid chunk id '{}': {}", s, e)))
    }

    /// Gets the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
