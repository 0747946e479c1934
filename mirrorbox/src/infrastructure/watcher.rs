// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Filesystem observation: OS notifications, debouncing, and rescans.

pub mod debouncer;
pub mod fs_watcher;
pub mod scanner;

pub use debouncer::{Debouncer, RawEvent};
pub use fs_watcher::FsWatcher;
pub use scanner::Rescanner;
