// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Type-safe file identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::SyncError;

/// Opaque 128-bit file identifier, rendered as a lowercase UUID string.
///
/// A file's content-modification path creates a NEW record with a new
/// `FileId`; renames and moves preserve the id. The files service issues the
/// authoritative id during upload preparation and the client adopts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Generates a new random file id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a file id from its lowercase UUID string form
    pub fn parse(s: &str) -> Result<Self, SyncError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::Serialization(format!("invalid file id '{}': {}", s, e)))
    }

    /// Gets the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
