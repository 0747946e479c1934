// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Event Debouncer
//!
//! Pure state machine between raw OS notifications and the canonical
//! [`ChangeEvent`] stream. Kept free of I/O and clocks (time is passed in)
//! so the coalescing rules are unit-testable.
//!
//! ## Coalescing Rules
//!
//! Within the debounce window, per path:
//!
//! - `Modified` bursts collapse into a single `Modified`
//! - `Created` followed by `Modified` stays `Created`
//! - `Created` followed by `Deleted` cancels out entirely
//! - `Deleted` followed by `Created` becomes `Modified` (content replace)
//!
//! ## Move Pairing
//!
//! A `RenamedFrom`/`RenamedTo` pair sharing a rename cookie becomes a
//! single `Renamed` event. An unpaired `RenamedFrom` expires to `Deleted`;
//! an unpaired `RenamedTo` expires to `Created`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use mirrorbox_domain::{ChangeEvent, PathKind, SyncPath};

/// Raw notification after classification, before debouncing.
#[derive(Debug, Clone)]
pub enum RawEvent {
    Created { path: SyncPath, kind: PathKind },
    Modified { path: SyncPath },
    Removed { path: SyncPath },
    RenamedFrom { path: SyncPath, cookie: Option<usize> },
    RenamedTo { path: SyncPath, kind: PathKind, cookie: Option<usize> },
    RenamedBoth { from: SyncPath, to: SyncPath, kind: PathKind },
}

/// Pending per-path operation awaiting its debounce deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Created(PathKind),
    Modified,
    Deleted,
}

#[derive(Debug)]
struct PendingEntry {
    op: Pending,
    deadline: Instant,
    sequence: u64,
}

#[derive(Debug)]
struct PendingRename {
    half: RenameHalf,
    deadline: Instant,
}

#[derive(Debug)]
enum RenameHalf {
    From(SyncPath),
    To(SyncPath, PathKind),
}

/// Debouncing state machine.
pub struct Debouncer {
    window: Duration,
    pending: HashMap<SyncPath, PendingEntry>,
    renames: HashMap<usize, PendingRename>,
    sequence: u64,
}

impl Debouncer {
    /// Creates a debouncer with the given coalescing window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
            renames: HashMap::new(),
            sequence: 0,
        }
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn set_pending(&mut self, path: SyncPath, op: Pending, now: Instant) {
        let sequence = self.next_sequence();
        self.pending.insert(
            path,
            PendingEntry {
                op,
                deadline: now + self.window,
                sequence,
            },
        );
    }

    /// Feeds one raw event, returning any events that resolve immediately
    /// (currently only paired renames).
    pub fn note(&mut self, event: RawEvent, now: Instant) -> Vec<ChangeEvent> {
        match event {
            RawEvent::Created { path, kind } => {
                match self.pending.get(&path).map(|e| e.op.clone()) {
                    // Deleted then recreated within the window: the content
                    // changed, not the identity of the path.
                    Some(Pending::Deleted) => self.set_pending(path, Pending::Modified, now),
                    Some(Pending::Created(_)) | Some(Pending::Modified) => {
                        // refresh the deadline, keep the earlier op
                        let op = self.pending.get(&path).map(|e| e.op.clone()).unwrap_or(Pending::Created(kind));
                        self.set_pending(path, op, now);
                    }
                    None => self.set_pending(path, Pending::Created(kind), now),
                }
                Vec::new()
            }
            RawEvent::Modified { path } => {
                match self.pending.get(&path).map(|e| e.op.clone()) {
                    // Created then modified inside the window is still a create
                    Some(Pending::Created(kind)) => self.set_pending(path, Pending::Created(kind), now),
                    Some(Pending::Deleted) => self.set_pending(path, Pending::Modified, now),
                    _ => self.set_pending(path, Pending::Modified, now),
                }
                Vec::new()
            }
            RawEvent::Removed { path } => {
                match self.pending.get(&path).map(|e| e.op.clone()) {
                    // Created and deleted within one window: nothing happened
                    Some(Pending::Created(_)) => {
                        self.pending.remove(&path);
                    }
                    _ => self.set_pending(path, Pending::Deleted, now),
                }
                Vec::new()
            }
            RawEvent::RenamedFrom { path, cookie } => {
                match cookie {
                    Some(cookie) => match self.renames.remove(&cookie) {
                        Some(PendingRename {
                            half: RenameHalf::To(to, kind),
                            ..
                        }) => {
                            return vec![ChangeEvent::Renamed { from: path, to, kind }];
                        }
                        _ => {
                            self.renames.insert(
                                cookie,
                                PendingRename {
                                    half: RenameHalf::From(path),
                                    deadline: now + self.window,
                                },
                            );
                        }
                    },
                    // No cookie to pair on: treat as a delete after the window
                    None => self.set_pending(path, Pending::Deleted, now),
                }
                Vec::new()
            }
            RawEvent::RenamedTo { path, kind, cookie } => {
                match cookie {
                    Some(cookie) => match self.renames.remove(&cookie) {
                        Some(PendingRename {
                            half: RenameHalf::From(from),
                            ..
                        }) => {
                            return vec![ChangeEvent::Renamed { from, to: path, kind }];
                        }
                        _ => {
                            self.renames.insert(
                                cookie,
                                PendingRename {
                                    half: RenameHalf::To(path, kind),
                                    deadline: now + self.window,
                                },
                            );
                        }
                    },
                    None => self.set_pending(path, Pending::Created(kind), now),
                }
                Vec::new()
            }
            RawEvent::RenamedBoth { from, to, kind } => {
                vec![ChangeEvent::Renamed { from, to, kind }]
            }
        }
    }

    /// Emits every pending operation whose debounce window has elapsed, in
    /// arrival order. Unpaired rename halves degrade to Deleted / Created.
    pub fn flush_due(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let mut due: Vec<(u64, ChangeEvent)> = Vec::new();

        let expired_paths: Vec<SyncPath> = self
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in expired_paths {
            if let Some(entry) = self.pending.remove(&path) {
                let event = match entry.op {
                    Pending::Created(kind) => ChangeEvent::Created { path, kind },
                    Pending::Modified => ChangeEvent::Modified { path },
                    Pending::Deleted => ChangeEvent::Deleted { path },
                };
                due.push((entry.sequence, event));
            }
        }

        let expired_cookies: Vec<usize> = self
            .renames
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(cookie, _)| *cookie)
            .collect();
        for cookie in expired_cookies {
            if let Some(pending) = self.renames.remove(&cookie) {
                let sequence = self.next_sequence();
                let event = match pending.half {
                    RenameHalf::From(path) => ChangeEvent::Deleted { path },
                    RenameHalf::To(path, kind) => ChangeEvent::Created { path, kind },
                };
                due.push((sequence, event));
            }
        }

        due.sort_by_key(|(sequence, _)| *sequence);
        due.into_iter().map(|(_, event)| event).collect()
    }

    /// Earliest deadline among pending entries, to drive the flush timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        let pending = self.pending.values().map(|e| e.deadline);
        let renames = self.renames.values().map(|e| e.deadline);
        pending.chain(renames).min()
    }

    /// True when nothing is waiting on the window.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.renames.is_empty()
    }
}
