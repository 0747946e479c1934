// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Entity
//!
//! A regular file observed in the sync root. Every committed file carries
//! the SHA-256 of its full content; content modification replaces the record
//! with a new `file_id` rather than updating in place, so a `FileEntry`'s
//! hash never changes after commit. Renames and moves preserve the id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ContentHash, FileId, FolderId, SyncPath};
use crate::SyncError;

/// A file tracked by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    file_id: FileId,
    file_name: String,
    file_path: SyncPath,
    folder_id: FolderId,
    file_type: String,
    file_hash: ContentHash,
    created_at: DateTime<Utc>,
}

impl FileEntry {
    /// Creates a file entity under `folder_id`.
    ///
    /// # Errors
    /// Returns `SyncError::ConsistencyViolation` when the path has no name
    /// component (a file cannot live at the root path itself).
    pub fn new(
        file_path: SyncPath,
        folder_id: FolderId,
        file_type: String,
        file_hash: ContentHash,
    ) -> Result<Self, SyncError> {
        Self::with_id(FileId::new(), file_path, folder_id, file_type, file_hash)
    }

    /// Creates a file entity with a service-issued id.
    ///
    /// The files service is the authority for file ids during upload
    /// preparation; the client adopts the id it returns.
    pub fn with_id(
        file_id: FileId,
        file_path: SyncPath,
        folder_id: FolderId,
        file_type: String,
        file_hash: ContentHash,
    ) -> Result<Self, SyncError> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| {
                SyncError::ConsistencyViolation(format!(
                    "file path has no name component: '{}'",
                    file_path
                ))
            })?
            .to_string();
        Ok(Self {
            file_id,
            file_name,
            file_path,
            folder_id,
            file_type,
            file_hash,
            created_at: Utc::now(),
        })
    }

    /// Restores a file from persisted state without re-validating.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        file_id: FileId,
        file_name: String,
        file_path: SyncPath,
        folder_id: FolderId,
        file_type: String,
        file_hash: ContentHash,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            file_id,
            file_name,
            file_path,
            folder_id,
            file_type,
            file_hash,
            created_at,
        }
    }

    /// Unique identifier, stable across renames, replaced on content change
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Last path component
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Canonical absolute path
    pub fn file_path(&self) -> &SyncPath {
        &self.file_path
    }

    /// Owning folder
    pub fn folder_id(&self) -> FolderId {
        self.folder_id
    }

    /// MIME-like type, best effort from the extension
    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    /// SHA-256 of the entire file content
    pub fn file_hash(&self) -> &ContentHash {
        &self.file_hash
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns a copy relocated to `new_path` under `new_folder`.
    ///
    /// Identity, hash, and creation time are preserved; content is
    /// untouched so no re-upload is needed.
    pub fn moved_to(&self, new_path: SyncPath, new_folder: FolderId) -> Result<Self, SyncError> {
        let file_name = new_path
            .file_name()
            .ok_or_else(|| {
                SyncError::ConsistencyViolation(format!(
                    "file path has no name component: '{}'",
                    new_path
                ))
            })?
            .to_string();
        Ok(Self {
            file_id: self.file_id,
            file_name,
            file_path: new_path,
            folder_id: new_folder,
            file_type: self.file_type.clone(),
            file_hash: self.file_hash.clone(),
            created_at: self.created_at,
        })
    }
}
