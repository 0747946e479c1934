// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sync Path Value Object
//!
//! Canonical form of every `file_path` and `folder_path` in the catalog: an
//! absolute path using forward slashes with no trailing slash. The folder
//! tree invariant — a parent's path is a strict prefix of its children's —
//! is expressed against this canonical form, so normalization happens once,
//! at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::SyncError;

/// Canonical absolute path within the sync root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncPath(String);

impl SyncPath {
    /// Creates a canonical path, normalizing separators and trailing slashes.
    ///
    /// # Errors
    /// Returns `SyncError::InvalidConfiguration` when the path is empty,
    /// relative, or contains `.`/`..` components.
    pub fn new(path: impl AsRef<str>) -> Result<Self, SyncError> {
        let raw = path.as_ref().replace('\\', "/");
        if raw.is_empty() {
            return Err(SyncError::InvalidConfiguration("path cannot be empty".into()));
        }
        if !raw.starts_with('/') {
            return Err(SyncError::InvalidConfiguration(format!(
                "path must be absolute: '{}'",
                raw
            )));
        }
        let mut components = Vec::new();
        for part in raw.split('/') {
            match part {
                "" => {}
                "." | ".." => {
                    return Err(SyncError::InvalidConfiguration(format!(
                        "path must not contain relative components: '{}'",
                        raw
                    )));
                }
                other => components.push(other),
            }
        }
        if components.is_empty() {
            return Ok(Self("/".to_string()));
        }
        Ok(Self(format!("/{}", components.join("/"))))
    }

    /// Converts an OS path (e.g. from the watcher) into canonical form.
    pub fn from_std_path(path: &Path) -> Result<Self, SyncError> {
        let s = path.to_str().ok_or_else(|| {
            SyncError::InvalidConfiguration(format!("path is not valid UTF-8: {}", path.display()))
        })?;
        Self::new(s)
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component. The root has no name.
    pub fn file_name(&self) -> Option<&str> {
        if self.0 == "/" {
            return None;
        }
        self.0.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Parent path, or `None` at the root.
    pub fn parent(&self) -> Option<SyncPath> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(SyncPath("/".to_string())),
            Some(idx) => Some(SyncPath(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Appends a single component.
    pub fn join(&self, component: &str) -> Result<SyncPath, SyncError> {
        if component.is_empty() || component.contains('/') {
            return Err(SyncError::InvalidConfiguration(format!(
                "invalid path component: '{}'",
                component
            )));
        }
        if self.0 == "/" {
            SyncPath::new(format!("/{}", component))
        } else {
            SyncPath::new(format!("{}/{}", self.0, component))
        }
    }

    /// True when `self` is a strict ancestor directory of `other`.
    ///
    /// This is the folder-tree invariant test: `/a` is an ancestor of
    /// `/a/b` and `/a/b/c`, but not of `/ab` and not of itself.
    pub fn is_strict_prefix_of(&self, other: &SyncPath) -> bool {
        if self.0 == other.0 {
            return false;
        }
        if self.0 == "/" {
            return true;
        }
        other.0.starts_with(&self.0)
            && other.0.as_bytes().get(self.0.len()) == Some(&b'/')
    }

    /// Rewrites the leading `old_prefix` of this path to `new_prefix`.
    ///
    /// Used when a folder rename cascades to descendant folders and files.
    /// Returns `SyncError::NotFound` when the path is not under the old
    /// prefix (and is not the prefix itself).
    pub fn rebase(&self, old_prefix: &SyncPath, new_prefix: &SyncPath) -> Result<SyncPath, SyncError> {
        if self == old_prefix {
            return Ok(new_prefix.clone());
        }
        if !old_prefix.is_strict_prefix_of(self) {
            return Err(SyncError::NotFound(format!(
                "'{}' is not under '{}'",
                self.0, old_prefix.0
            )));
        }
        let suffix = &self.0[old_prefix.0.len()..];
        SyncPath::new(format!("{}{}", new_prefix.0, suffix))
    }
}

impl fmt::Display for SyncPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
