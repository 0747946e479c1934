// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rescanner
//!
//! Computes the difference between the sync root on disk and the catalog,
//! as synthetic change events. Used at startup (initial scan), after a
//! watcher overflow, and on demand via the local API's sync trigger.
//!
//! Files present on both sides are emitted as `Modified`: the engine
//! re-chunks and drops the event when the content hash is unchanged, which
//! keeps the whole procedure idempotent. Catalog entities with no matching
//! filesystem path become `Deleted`; entities under an already-deleted
//! folder are skipped because the catalog delete cascades.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use mirrorbox_domain::{Catalog, ChangeEvent, PathKind, SyncError, SyncPath};

/// Filesystem ⇄ catalog diff engine.
pub struct Rescanner {
    catalog: Arc<dyn Catalog>,
    root: SyncPath,
}

impl Rescanner {
    /// Creates a rescanner over the catalog for the given sync root.
    pub fn new(catalog: Arc<dyn Catalog>, root: SyncPath) -> Self {
        Self { catalog, root }
    }

    /// Walks the sync root and produces the synthetic event stream.
    ///
    /// Ordering: directories first (parents before children), then file
    /// creations/modifications, then deletions (topmost entity only —
    /// catalog deletes cascade).
    pub async fn scan(&self) -> Result<Vec<ChangeEvent>, SyncError> {
        let mut fs_dirs: BTreeSet<SyncPath> = BTreeSet::new();
        let mut fs_files: BTreeSet<SyncPath> = BTreeSet::new();
        walk(Path::new(self.root.as_str()), &mut fs_dirs, &mut fs_files)?;

        let catalog_folders: BTreeSet<SyncPath> = self
            .catalog
            .list_folders()
            .await?
            .into_iter()
            .map(|f| f.folder_path().clone())
            .collect();
        let catalog_files: BTreeSet<SyncPath> = self
            .catalog
            .list_files()
            .await?
            .into_iter()
            .map(|f| f.file_path().clone())
            .collect();

        let mut events = Vec::new();

        // BTreeSet iteration is path-sorted, so parents come before children.
        for dir in &fs_dirs {
            if *dir != self.root && !catalog_folders.contains(dir) {
                events.push(ChangeEvent::Created {
                    path: dir.clone(),
                    kind: PathKind::Directory,
                });
            }
        }

        for file in &fs_files {
            if catalog_files.contains(file) {
                events.push(ChangeEvent::Modified { path: file.clone() });
            } else {
                events.push(ChangeEvent::Created {
                    path: file.clone(),
                    kind: PathKind::File,
                });
            }
        }

        // Deletions: only the topmost missing folder is emitted; descendants
        // (folders and files alike) go with it in the catalog cascade.
        let missing_folders: Vec<SyncPath> = catalog_folders
            .iter()
            .filter(|p| **p != self.root && !fs_dirs.contains(*p))
            .cloned()
            .collect();
        let topmost_missing: Vec<SyncPath> = missing_folders
            .iter()
            .filter(|candidate| {
                !missing_folders
                    .iter()
                    .any(|other| other.is_strict_prefix_of(candidate))
            })
            .cloned()
            .collect();
        for folder in &topmost_missing {
            events.push(ChangeEvent::Deleted { path: folder.clone() });
        }

        for file in &catalog_files {
            if fs_files.contains(file) {
                continue;
            }
            let covered = topmost_missing.iter().any(|f| f.is_strict_prefix_of(file));
            if !covered {
                events.push(ChangeEvent::Deleted { path: file.clone() });
            }
        }

        debug!(events = events.len(), "rescan computed");
        Ok(events)
    }
}

/// Recursive walk collecting directories and regular files, skipping
/// hidden entries.
fn walk(
    dir: &Path,
    dirs: &mut BTreeSet<SyncPath>,
    files: &mut BTreeSet<SyncPath>,
) -> Result<(), SyncError> {
    let sync_path = SyncPath::from_std_path(dir)?;
    dirs.insert(sync_path);

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            // A directory vanishing mid-scan is not fatal; the next event
            // or rescan settles it.
            warn!(dir = %dir.display(), "failed to read directory during scan: {}", e);
            return Ok(());
        }
    };

    for entry in entries {
        let entry = entry.map_err(|e| SyncError::IoError(e.to_string()))?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| SyncError::IoError(e.to_string()))?;

        if file_type.is_dir() {
            walk(&path, dirs, files)?;
        } else if file_type.is_file() {
            files.insert(SyncPath::from_std_path(&path)?);
        }
        // Symlinks and special files are not mirrored.
    }
    Ok(())
}
