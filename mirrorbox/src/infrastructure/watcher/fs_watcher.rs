// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Watcher
//!
//! Wraps the OS-native change notification facility (`notify`'s
//! recommended watcher) in recursive mode over the sync root. Raw
//! notifications are classified into [`RawEvent`]s, debounced, and pushed
//! as canonical [`ChangeEvent`]s into a bounded channel — when the channel
//! is full the watcher task blocks, which is the backpressure contract.
//!
//! Watch errors and queue overflows emit `ChangeEvent::RescanRequired`
//! instead of events: the engine then runs the full rescan procedure,
//! whose catalog mutations are idempotent.
//!
//! Hidden entries (any component starting with `.`) are excluded; editors
//! and the catalog itself produce noise there, not user content.

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use mirrorbox_bootstrap::CancellationToken;
use mirrorbox_domain::{ChangeEvent, PathKind, SyncError, SyncPath};

use super::debouncer::{Debouncer, RawEvent};

/// Long-lived watcher over the sync root.
///
/// Holds the OS watcher handle (dropping it stops notifications) and the
/// task driving classification and debouncing.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl FsWatcher {
    /// Starts watching `sync_dir` recursively, emitting canonical events
    /// into `events_tx` until the token fires or the channel closes.
    pub fn start(
        sync_dir: &Path,
        root: SyncPath,
        window: std::time::Duration,
        events_tx: mpsc::Sender<ChangeEvent>,
        token: CancellationToken,
    ) -> Result<Self, SyncError> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<Result<Event, notify::Error>>();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                // Runs on notify's thread; an unbounded send never blocks it.
                let _ = raw_tx.send(result);
            },
            notify::Config::default(),
        )
        .map_err(|e| SyncError::Internal(format!("failed to create watcher: {}", e)))?;

        watcher
            .watch(sync_dir, RecursiveMode::Recursive)
            .map_err(|e| SyncError::Internal(format!("failed to watch {}: {}", sync_dir.display(), e)))?;
        debug!(dir = %sync_dir.display(), "watching sync root");

        let task = tokio::spawn(run_loop(raw_rx, root, window, events_tx, token));

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    /// Waits for the watcher task to finish (after cancellation).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

async fn run_loop(
    mut raw_rx: mpsc::UnboundedReceiver<Result<Event, notify::Error>>,
    root: SyncPath,
    window: std::time::Duration,
    events_tx: mpsc::Sender<ChangeEvent>,
    token: CancellationToken,
) {
    let mut debouncer = Debouncer::new(window);

    loop {
        let sleep_until = debouncer
            .next_deadline()
            .map(tokio::time::Instant::from_std);

        tokio::select! {
            _ = token.cancelled() => {
                debug!("watcher loop cancelled");
                break;
            }
            received = raw_rx.recv() => {
                let received = match received {
                    Some(r) => r,
                    None => break,
                };
                match received {
                    Ok(event) => {
                        if event.need_rescan() {
                            // The OS queue overflowed and notifications were
                            // dropped; only a full diff recovers the truth.
                            warn!("watch queue overflowed, requesting rescan");
                            if events_tx.send(ChangeEvent::RescanRequired).await.is_err() {
                                return;
                            }
                            continue;
                        }
                        let now = Instant::now();
                        for raw in classify(&event, &root) {
                            for canonical in debouncer.note(raw, now) {
                                if events_tx.send(canonical).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("watch error, requesting rescan: {}", e);
                        if events_tx.send(ChangeEvent::RescanRequired).await.is_err() {
                            return;
                        }
                    }
                }
            }
            _ = async {
                match sleep_until {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    // Nothing pending; park until an event arrives
                    None => std::future::pending::<()>().await,
                }
            } => {
                for canonical in debouncer.flush_due(Instant::now()) {
                    if events_tx.send(canonical).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    // Drain whatever is still pending so a shutdown does not lose events
    // the OS already delivered.
    for canonical in debouncer.flush_due(Instant::now() + window + window) {
        let _ = events_tx.try_send(canonical);
    }
}

/// Classifies a notify event into zero or more raw events.
fn classify(event: &Event, root: &SyncPath) -> Vec<RawEvent> {
    let cookie = event.attrs.tracker();

    match &event.kind {
        EventKind::Create(create_kind) => event
            .paths
            .iter()
            .filter_map(|p| to_sync_path(p, root))
            .map(|path| {
                let kind = match create_kind {
                    CreateKind::Folder => PathKind::Directory,
                    CreateKind::File => PathKind::File,
                    _ => kind_of(&path),
                };
                RawEvent::Created { path, kind }
            })
            .collect(),

        EventKind::Remove(_) => event
            .paths
            .iter()
            .filter_map(|p| to_sync_path(p, root))
            .map(|path| RawEvent::Removed { path })
            .collect(),

        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => event
                .paths
                .iter()
                .filter_map(|p| to_sync_path(p, root))
                .map(|path| RawEvent::RenamedFrom { path, cookie })
                .collect(),
            RenameMode::To => event
                .paths
                .iter()
                .filter_map(|p| to_sync_path(p, root))
                .map(|path| {
                    let kind = kind_of(&path);
                    RawEvent::RenamedTo { path, kind, cookie }
                })
                .collect(),
            RenameMode::Both => {
                // Both halves in one event: paths[0] is the source,
                // paths[1] the destination.
                let from = event.paths.first().and_then(|p| to_sync_path(p, root));
                let to = event.paths.get(1).and_then(|p| to_sync_path(p, root));
                match (from, to) {
                    (Some(from), Some(to)) => {
                        let kind = kind_of(&to);
                        vec![RawEvent::RenamedBoth { from, to, kind }]
                    }
                    (Some(path), None) => vec![RawEvent::RenamedFrom { path, cookie }],
                    (None, Some(path)) => {
                        let kind = kind_of(&path);
                        vec![RawEvent::RenamedTo { path, kind, cookie }]
                    }
                    (None, None) => Vec::new(),
                }
            }
            _ => event
                .paths
                .iter()
                .filter_map(|p| to_sync_path(p, root))
                .map(|path| resolve_ambiguous_rename(path, cookie))
                .collect(),
        },

        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter_map(|p| to_sync_path(p, root))
            // Directory mtime changes carry no content; child events do.
            .filter(|path| kind_of(path) != PathKind::Directory)
            .map(|path| RawEvent::Modified { path })
            .collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// A rename notification whose direction the backend didn't specify:
/// decide by whether the path still exists.
fn resolve_ambiguous_rename(path: SyncPath, cookie: Option<usize>) -> RawEvent {
    if std::path::Path::new(path.as_str()).exists() {
        let kind = kind_of(&path);
        RawEvent::RenamedTo { path, kind, cookie }
    } else {
        RawEvent::RenamedFrom { path, cookie }
    }
}

/// Converts an OS path to the canonical form, dropping paths outside the
/// root and hidden entries.
fn to_sync_path(path: &PathBuf, root: &SyncPath) -> Option<SyncPath> {
    let sync_path = match SyncPath::from_std_path(path) {
        Ok(p) => p,
        Err(e) => {
            warn!(path = %path.display(), "ignoring unrepresentable path: {}", e);
            return None;
        }
    };
    if sync_path != *root && !root.is_strict_prefix_of(&sync_path) {
        return None;
    }
    if is_hidden(&sync_path, root) {
        return None;
    }
    Some(sync_path)
}

/// True when any component below the root starts with a dot.
fn is_hidden(path: &SyncPath, root: &SyncPath) -> bool {
    let suffix = match path.as_str().strip_prefix(root.as_str()) {
        Some(s) => s,
        None => path.as_str(),
    };
    suffix.split('/').any(|component| component.starts_with('.'))
}

/// File-or-directory from a stat; deleted paths default to File.
fn kind_of(path: &SyncPath) -> PathKind {
    match std::fs::metadata(path.as_str()) {
        Ok(meta) if meta.is_dir() => PathKind::Directory,
        _ => PathKind::File,
    }
}
