// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Catalog Port
//!
//! The transactional metadata store holding folders, files, and chunks.
//! This trait is the domain-facing contract; the SQLite implementation
//! lives in the infrastructure layer.
//!
//! ## Transactional Contract
//!
//! Every mutating operation is serializable and atomic: `insert_file` and
//! `replace_file_content` commit the file record together with all of its
//! chunk rows, so a partially uploaded file can never exist in the catalog
//! without chunks — `last_synced` is the only bit that flips after the
//! upload is confirmed. `rename_or_move` rewrites the affected entity and,
//! for folders, every descendant, in one transaction. Concurrent readers
//! are admitted during a write; a single-writer discipline is acceptable.
//!
//! ## Failure Conditions
//!
//! - `SyncError::DuplicatePath` — an insert would violate path uniqueness
//! - `SyncError::NotFound` — rename or delete of a non-existent entity
//! - `SyncError::ConsistencyViolation` — a foreign key would dangle

use async_trait::async_trait;

use crate::entities::{Chunk, FileEntry, Folder};
use crate::value_objects::{ChunkId, ContentHash, FileId, FolderId, SyncPath};
use crate::SyncError;

/// Transactional catalog of folders, files, and chunks.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Idempotently ensures a folder (and all missing ancestors) exists,
    /// returning the folder's id.
    async fn upsert_folder(&self, path: &SyncPath) -> Result<FolderId, SyncError>;

    /// Inserts a file record together with all of its chunk rows in a
    /// single transaction.
    ///
    /// # Errors
    /// `SyncError::DuplicatePath` when a file already exists at the path;
    /// `SyncError::ConsistencyViolation` when the folder reference dangles.
    async fn insert_file(&self, file: &FileEntry, chunks: &[Chunk]) -> Result<(), SyncError>;

    /// Atomically supersedes `old_file_id` with a new file record and its
    /// chunks. The old record and its chunk rows are retired in the same
    /// transaction, so the path's lookup always resolves to current content.
    async fn replace_file_content(
        &self,
        old_file_id: FileId,
        new_file: &FileEntry,
        chunks: &[Chunk],
    ) -> Result<(), SyncError>;

    /// Removes a file, or an entire folder subtree, cascading to chunk
    /// rows. Returns the ids of the removed files.
    async fn delete_by_path(&self, path: &SyncPath) -> Result<Vec<FileId>, SyncError>;

    /// Rewrites paths for a rename/move of a file or folder, cascading to
    /// every descendant folder and file. Entity ids and chunk rows are
    /// preserved.
    async fn rename_or_move(&self, old_path: &SyncPath, new_path: &SyncPath) -> Result<(), SyncError>;

    /// Sets `last_synced = now` for the given chunks of a file.
    async fn mark_chunks_synced(&self, file_id: FileId, chunk_ids: &[ChunkId]) -> Result<(), SyncError>;

    /// Looks up a file by canonical path.
    async fn find_file_by_path(&self, path: &SyncPath) -> Result<Option<FileEntry>, SyncError>;

    /// Looks up a file by id.
    async fn find_file(&self, file_id: FileId) -> Result<Option<FileEntry>, SyncError>;

    /// Looks up a folder by canonical path.
    async fn find_folder_by_path(&self, path: &SyncPath) -> Result<Option<Folder>, SyncError>;

    /// All chunks of a file in ascending part order.
    async fn chunks_for_file(&self, file_id: FileId) -> Result<Vec<Chunk>, SyncError>;

    /// All files, ordered by path.
    async fn list_files(&self) -> Result<Vec<FileEntry>, SyncError>;

    /// All folders, ordered by path.
    async fn list_folders(&self) -> Result<Vec<Folder>, SyncError>;

    /// Finds any already-synced chunk carrying the given fingerprint, for
    /// content deduplication. Returns an arbitrary match when several exist.
    async fn find_synced_fingerprint(
        &self,
        fingerprint: &ContentHash,
    ) -> Result<Option<Chunk>, SyncError>;

    /// Files that still have chunks with `last_synced` NULL — candidates
    /// for retry after a crash or failed upload.
    async fn files_pending_sync(&self) -> Result<Vec<FileEntry>, SyncError>;
}
