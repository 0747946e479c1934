// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Folder Entity
//!
//! A directory observed in the sync root. Folders form a tree: every folder
//! except the sync root references its parent, and the parent's path is a
//! strict prefix of the child's. Renames and moves mutate the path fields
//! (cascading to descendants via the catalog) while the identity — the
//! `folder_id` — persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{FolderId, SyncPath};
use crate::SyncError;

/// A directory tracked by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    folder_id: FolderId,
    folder_name: String,
    folder_path: SyncPath,
    parent_folder_id: Option<FolderId>,
    created_at: DateTime<Utc>,
}

impl Folder {
    /// Creates a folder entity.
    ///
    /// The name must equal the path's last component; the sync root (the
    /// only folder without a parent) is exempt because the root path has no
    /// name component.
    ///
    /// # Errors
    /// Returns `SyncError::ConsistencyViolation` when the name does not
    /// match the path.
    pub fn new(
        folder_path: SyncPath,
        parent_folder_id: Option<FolderId>,
    ) -> Result<Self, SyncError> {
        let folder_name = match folder_path.file_name() {
            Some(name) => name.to_string(),
            None if parent_folder_id.is_none() => "/".to_string(),
            None => {
                return Err(SyncError::ConsistencyViolation(
                    "only the sync root may have an empty name".into(),
                ));
            }
        };
        Ok(Self {
            folder_id: FolderId::new(),
            folder_name,
            folder_path,
            parent_folder_id,
            created_at: Utc::now(),
        })
    }

    /// Restores a folder from persisted state without re-validating.
    pub fn from_parts(
        folder_id: FolderId,
        folder_name: String,
        folder_path: SyncPath,
        parent_folder_id: Option<FolderId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            folder_id,
            folder_name,
            folder_path,
            parent_folder_id,
            created_at,
        }
    }

    /// Unique identifier, stable across renames
    pub fn folder_id(&self) -> FolderId {
        self.folder_id
    }

    /// Last path component
    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    /// Canonical absolute path
    pub fn folder_path(&self) -> &SyncPath {
        &self.folder_path
    }

    /// Parent folder, `None` only for the sync root
    pub fn parent_folder_id(&self) -> Option<FolderId> {
        self.parent_folder_id
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True for the sync root
    pub fn is_root(&self) -> bool {
        self.parent_folder_id.is_none()
    }

    /// Returns a copy relocated to `new_path` under `new_parent`.
    ///
    /// Identity and creation time are preserved; only the location changes.
    pub fn moved_to(&self, new_path: SyncPath, new_parent: Option<FolderId>) -> Result<Self, SyncError> {
        let folder_name = match new_path.file_name() {
            Some(name) => name.to_string(),
            None => {
                return Err(SyncError::ConsistencyViolation(
                    "cannot move a folder onto the root path".into(),
                ));
            }
        };
        Ok(Self {
            folder_id: self.folder_id,
            folder_name,
            folder_path: new_path,
            parent_folder_id: new_parent,
            created_at: self.created_at,
        })
    }
}
