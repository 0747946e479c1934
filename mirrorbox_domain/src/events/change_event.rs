// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Change Events
//!
//! The canonical event vocabulary between the watcher and the sync engine.
//! The watcher debounces and classifies raw OS notifications into these
//! variants; move pairs sharing a rename cookie arrive as a single
//! `Renamed` event, while unpaired halves degrade to `Deleted` / `Created`
//! after the debounce window. Events for a given path are delivered in the
//! order they occurred; cross-path ordering is not guaranteed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::SyncPath;

/// Whether an event refers to a regular file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathKind {
    File,
    Directory,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::File => f.write_str("file"),
            PathKind::Directory => f.write_str("directory"),
        }
    }
}

/// A canonical filesystem change within the sync root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    /// A new entity appeared (or an unpaired MovedTo landed here).
    Created { path: SyncPath, kind: PathKind },

    /// A file's content changed. Directories do not produce Modified
    /// events; their content changes arrive as child events.
    Modified { path: SyncPath },

    /// An entity disappeared (or an unpaired MovedFrom left here).
    Deleted { path: SyncPath },

    /// A paired move within the sync root, same rename cookie.
    Renamed {
        from: SyncPath,
        to: SyncPath,
        kind: PathKind,
    },

    /// The watcher lost events (queue overflow); the full rescan
    /// procedure must run before further incremental processing.
    RescanRequired,
}

impl ChangeEvent {
    /// The path this event keys on for per-path ordering. `Renamed` keys on
    /// its source path; `RescanRequired` has no path.
    pub fn primary_path(&self) -> Option<&SyncPath> {
        match self {
            ChangeEvent::Created { path, .. } => Some(path),
            ChangeEvent::Modified { path } => Some(path),
            ChangeEvent::Deleted { path } => Some(path),
            ChangeEvent::Renamed { from, .. } => Some(from),
            ChangeEvent::RescanRequired => None,
        }
    }

    /// Short label for logging
    pub fn kind_name(&self) -> &'static str {
        match self {
            ChangeEvent::Created { .. } => "created",
            ChangeEvent::Modified { .. } => "modified",
            ChangeEvent::Deleted { .. } => "deleted",
            ChangeEvent::Renamed { .. } => "renamed",
            ChangeEvent::RescanRequired => "rescan_required",
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::Created { path, kind } => write!(f, "created {} {}", kind, path),
            ChangeEvent::Modified { path } => write!(f, "modified file {}", path),
            ChangeEvent::Deleted { path } => write!(f, "deleted {}", path),
            ChangeEvent::Renamed { from, to, kind } => {
                write!(f, "renamed {} {} -> {}", kind, from, to)
            }
            ChangeEvent::RescanRequired => f.write_str("rescan required"),
        }
    }
}
