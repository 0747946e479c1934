// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single, flat error enum covering every failure mode the sync client
//! recognizes. Variants carry a descriptive message rather than nested error
//! types so errors stay `Clone` and cheap to log and categorize.
//!
//! ## Error Categories
//!
//! - **Catalog**: `DuplicatePath`, `NotFound`, `ConsistencyViolation`,
//!   `Database` — invariant or persistence failures in the metadata store
//! - **Chunking**: `SourceMutated`, `InvalidChunk` — the source file changed
//!   underneath the chunker, or chunk data failed validation
//! - **Remote**: `RemoteService`, `Transport`, `Timeout` — the files service
//!   rejected a request, or the network failed
//! - **Integrity**: `IntegrityFailure` — a downloaded chunk or reassembled
//!   file does not match its recorded hash; never retried automatically
//! - **Watching**: `WatcherOverflow` — the OS event queue overflowed and a
//!   full rescan is required
//! - **Lifecycle**: `InvalidConfiguration`, `Cancelled`, `Internal`
//!
//! ## Recovery Strategy
//!
//! `is_transient()` identifies errors worth retrying with backoff
//! (transport failures, timeouts, transient I/O). Everything else is either
//! surfaced to the operator or resolved by re-deriving state from the
//! filesystem via a rescan.

use thiserror::Error;

/// Core error type for sync domain operations.
///
/// Each variant represents a specific failure mode with enough context for
/// debugging. The per-file sync tasks recover locally where possible;
/// unrecoverable errors are logged with the file path and id and the file is
/// re-attempted on the next watcher event or rescan.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Duplicate path: {0}")]
    DuplicatePath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Source file mutated during read: {0}")]
    SourceMutated(String),

    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),

    #[error("Integrity check failed: {0}")]
    IntegrityFailure(String),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Watcher overflow: {0}")]
    WatcherOverflow(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a new database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Creates a new remote-service error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteService(msg.into())
    }

    /// Creates a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Checks whether the error is worth retrying with backoff.
    ///
    /// Transport failures, timeouts, and transient I/O errors are retried up
    /// to the configured attempt limit. Integrity failures are deliberately
    /// excluded: they indicate server-side corruption, not a flaky network.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_) | SyncError::Timeout(_) | SyncError::IoError(_)
        )
    }

    /// Checks whether the error should trigger a localized rescan of the
    /// affected path, re-deriving the event from current filesystem state.
    pub fn needs_rescan(&self) -> bool {
        matches!(
            self,
            SyncError::DuplicatePath(_) | SyncError::NotFound(_) | SyncError::ConsistencyViolation(_)
        )
    }

    /// Gets the error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::InvalidConfiguration(_) => "configuration",
            SyncError::DuplicatePath(_) => "catalog",
            SyncError::NotFound(_) => "catalog",
            SyncError::ConsistencyViolation(_) => "catalog",
            SyncError::SourceMutated(_) => "chunking",
            SyncError::InvalidChunk(_) => "chunking",
            SyncError::IntegrityFailure(_) => "integrity",
            SyncError::RemoteService(_) => "remote",
            SyncError::Transport(_) => "transport",
            SyncError::WatcherOverflow(_) => "watcher",
            SyncError::IoError(_) => "io",
            SyncError::Database(_) => "database",
            SyncError::Serialization(_) => "serialization",
            SyncError::Timeout(_) => "timeout",
            SyncError::Cancelled(_) => "cancellation",
            SyncError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}
