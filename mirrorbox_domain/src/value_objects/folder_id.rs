// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Type-safe folder identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::SyncError;

/// Opaque 128-bit folder identifier, rendered as a lowercase UUID string.
///
/// Using a distinct type per entity prevents a folder id from being passed
/// where a file id is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(Uuid);

impl FolderId {
    /// Generates a new random folder id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a folder id from its lowercase UUID string form
    pub fn parse(s: &str) -> Result<Self, SyncError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SyncError::Serialization(format!("invalid folder id '{}': {}", s, e)))
    }

    /// Gets the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Uuid renders lowercase hyphenated by default
        write!(f, "{}", self.0)
    }
}
