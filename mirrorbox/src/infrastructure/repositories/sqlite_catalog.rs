// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Catalog
//!
//! The embedded catalog implementation behind the domain's `Catalog` port.
//! Folders, files, and chunks live in three tables (see the workspace
//! `migrations/` directory); every mutating operation runs inside a single
//! sqlx transaction guarded by a process-wide writer mutex, giving the
//! single-writer discipline the catalog contract allows while readers go
//! straight to the pool.
//!
//! ## Invariant Enforcement
//!
//! - Path uniqueness is checked before inserts and renames and surfaces as
//!   `SyncError::DuplicatePath`
//! - Folder references are verified before a file insert; a dangling
//!   `folder_id` surfaces as `SyncError::ConsistencyViolation`
//! - `insert_file` / `replace_file_content` commit the file row and all of
//!   its chunk rows atomically, so the catalog never holds a file without
//!   chunks
//! - Rename cascades rewrite every descendant folder and file path in the
//!   same transaction, preserving ids and chunk rows

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

use mirrorbox_domain::entities::{Chunk, FileEntry, Folder};
use mirrorbox_domain::value_objects::{
    ChunkId, ContentHash, FileId, FolderId, PartNumber, SyncPath,
};
use mirrorbox_domain::{Catalog, SyncError};

/// Catalog implementation over a SQLite pool.
pub struct SqliteCatalog {
    pool: SqlitePool,
    root: SyncPath,
    write_lock: Mutex<()>,
}

impl SqliteCatalog {
    /// Creates a catalog rooted at the sync root path.
    ///
    /// The root folder row is created lazily by the first `upsert_folder`.
    pub fn new(pool: SqlitePool, root: SyncPath) -> Self {
        Self {
            pool,
            root,
            write_lock: Mutex::new(()),
        }
    }

    /// The sync root this catalog mirrors.
    pub fn root(&self) -> &SyncPath {
        &self.root
    }

    fn db_err(e: sqlx::Error) -> SyncError {
        SyncError::Database(e.to_string())
    }

    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, SyncError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SyncError::Database(format!("invalid timestamp '{}': {}", s, e)))
    }

    fn folder_from_row(row: &SqliteRow) -> Result<Folder, SyncError> {
        let parent: Option<String> = row.get("parent_folder_id");
        let parent_id = parent.as_deref().map(FolderId::parse).transpose()?;
        Ok(Folder::from_parts(
            FolderId::parse(row.get::<String, _>("folder_id").as_str())?,
            row.get("folder_name"),
            SyncPath::new(row.get::<String, _>("folder_path"))?,
            parent_id,
            Self::parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        ))
    }

    fn file_from_row(row: &SqliteRow) -> Result<FileEntry, SyncError> {
        Ok(FileEntry::from_parts(
            FileId::parse(row.get::<String, _>("file_id").as_str())?,
            row.get("file_name"),
            SyncPath::new(row.get::<String, _>("file_path"))?,
            FolderId::parse(row.get::<String, _>("folder_id").as_str())?,
            row.get("file_type"),
            ContentHash::parse(row.get::<String, _>("file_hash"))?,
            Self::parse_timestamp(row.get::<String, _>("created_at").as_str())?,
        ))
    }

    fn chunk_from_row(row: &SqliteRow) -> Result<Chunk, SyncError> {
        let last_synced: Option<String> = row.get("last_synced");
        let last_synced = last_synced
            .as_deref()
            .map(Self::parse_timestamp)
            .transpose()?;
        Ok(Chunk::from_parts(
            ChunkId::parse(row.get::<String, _>("chunk_id").as_str())?,
            FileId::parse(row.get::<String, _>("file_id").as_str())?,
            PartNumber::new(row.get::<i64, _>("part_number") as u32)?,
            ContentHash::parse(row.get::<String, _>("fingerprint"))?,
            Self::parse_timestamp(row.get::<String, _>("created_at").as_str())?,
            last_synced,
        ))
    }

    /// Chain of paths from the sync root down to `path`, inclusive.
    fn ancestry_chain(&self, path: &SyncPath) -> Result<Vec<SyncPath>, SyncError> {
        if *path == self.root {
            return Ok(vec![self.root.clone()]);
        }
        if !self.root.is_strict_prefix_of(path) {
            return Err(SyncError::ConsistencyViolation(format!(
                "path '{}' is outside the sync root '{}'",
                path, self.root
            )));
        }
        let mut chain = vec![path.clone()];
        let mut current = path.clone();
        while let Some(parent) = current.parent() {
            chain.push(parent.clone());
            if parent == self.root {
                chain.reverse();
                return Ok(chain);
            }
            current = parent;
        }
        Err(SyncError::ConsistencyViolation(format!(
            "path '{}' does not descend from the sync root '{}'",
            path, self.root
        )))
    }

    /// Ensures a folder chain exists inside an open transaction, returning
    /// the id of the deepest folder.
    async fn upsert_folder_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        path: &SyncPath,
    ) -> Result<FolderId, SyncError> {
        let chain = self.ancestry_chain(path)?;
        let mut parent_id: Option<FolderId> = None;

        for folder_path in &chain {
            let existing = sqlx::query("SELECT folder_id FROM folders WHERE folder_path = ?")
                .bind(folder_path.as_str())
                .fetch_optional(&mut **tx)
                .await
                .map_err(Self::db_err)?;

            let current_id = match existing {
                Some(row) => FolderId::parse(row.get::<String, _>("folder_id").as_str())?,
                None => {
                    let folder = Folder::new(folder_path.clone(), parent_id)?;
                    sqlx::query(
                        "INSERT INTO folders (folder_id, folder_name, folder_path, parent_folder_id, created_at) \
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(folder.folder_id().to_string())
                    .bind(folder.folder_name())
                    .bind(folder.folder_path().as_str())
                    .bind(folder.parent_folder_id().map(|id| id.to_string()))
                    .bind(folder.created_at().to_rfc3339())
                    .execute(&mut **tx)
                    .await
                    .map_err(Self::db_err)?;
                    debug!(path = %folder_path, "created folder row");
                    folder.folder_id()
                }
            };
            parent_id = Some(current_id);
        }

        parent_id.ok_or_else(|| SyncError::Internal("empty folder ancestry chain".into()))
    }

    async fn insert_chunks_tx(
        tx: &mut Transaction<'_, Sqlite>,
        chunks: &[Chunk],
    ) -> Result<(), SyncError> {
        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (chunk_id, file_id, part_number, fingerprint, created_at, last_synced) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(chunk.chunk_id().to_string())
            .bind(chunk.file_id().to_string())
            .bind(chunk.part_number().get() as i64)
            .bind(chunk.fingerprint().as_str())
            .bind(chunk.created_at().to_rfc3339())
            .bind(chunk.last_synced().map(|t| t.to_rfc3339()))
            .execute(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        }
        Ok(())
    }

    async fn insert_file_tx(
        tx: &mut Transaction<'_, Sqlite>,
        file: &FileEntry,
    ) -> Result<(), SyncError> {
        let duplicate = sqlx::query("SELECT 1 FROM files WHERE file_path = ?")
            .bind(file.file_path().as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        if duplicate.is_some() {
            return Err(SyncError::DuplicatePath(file.file_path().to_string()));
        }

        let folder_exists = sqlx::query("SELECT 1 FROM folders WHERE folder_id = ?")
            .bind(file.folder_id().to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        if folder_exists.is_none() {
            return Err(SyncError::ConsistencyViolation(format!(
                "folder {} does not exist for file '{}'",
                file.folder_id(),
                file.file_path()
            )));
        }

        sqlx::query(
            "INSERT INTO files (file_id, file_name, file_path, folder_id, file_type, file_hash, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.file_id().to_string())
        .bind(file.file_name())
        .bind(file.file_path().as_str())
        .bind(file.folder_id().to_string())
        .bind(file.file_type())
        .bind(file.file_hash().as_str())
        .bind(file.created_at().to_rfc3339())
        .execute(&mut **tx)
        .await
        .map_err(Self::db_err)?;
        Ok(())
    }

    async fn delete_file_rows_tx(
        tx: &mut Transaction<'_, Sqlite>,
        file_id: FileId,
    ) -> Result<(), SyncError> {
        sqlx::query("DELETE FROM chunks WHERE file_id = ?")
            .bind(file_id.to_string())
            .execute(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        sqlx::query("DELETE FROM files WHERE file_id = ?")
            .bind(file_id.to_string())
            .execute(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        Ok(())
    }

    async fn fetch_file_tx(
        tx: &mut Transaction<'_, Sqlite>,
        path: &SyncPath,
    ) -> Result<Option<FileEntry>, SyncError> {
        let row = sqlx::query("SELECT * FROM files WHERE file_path = ?")
            .bind(path.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        row.as_ref().map(Self::file_from_row).transpose()
    }

    async fn fetch_folder_tx(
        tx: &mut Transaction<'_, Sqlite>,
        path: &SyncPath,
    ) -> Result<Option<Folder>, SyncError> {
        let row = sqlx::query("SELECT * FROM folders WHERE folder_path = ?")
            .bind(path.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        row.as_ref().map(Self::folder_from_row).transpose()
    }

    /// True when any file or folder occupies `path`.
    async fn path_occupied_tx(
        tx: &mut Transaction<'_, Sqlite>,
        path: &SyncPath,
    ) -> Result<bool, SyncError> {
        let file = sqlx::query("SELECT 1 FROM files WHERE file_path = ?")
            .bind(path.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        if file.is_some() {
            return Ok(true);
        }
        let folder = sqlx::query("SELECT 1 FROM folders WHERE folder_path = ?")
            .bind(path.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(Self::db_err)?;
        Ok(folder.is_some())
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn upsert_folder(&self, path: &SyncPath) -> Result<FolderId, SyncError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;
        let id = self.upsert_folder_tx(&mut tx, path).await?;
        tx.commit().await.map_err(Self::db_err)?;
        Ok(id)
    }

    async fn insert_file(&self, file: &FileEntry, chunks: &[Chunk]) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;
        Self::insert_file_tx(&mut tx, file).await?;
        Self::insert_chunks_tx(&mut tx, chunks).await?;
        tx.commit().await.map_err(Self::db_err)?;
        debug!(path = %file.file_path(), file_id = %file.file_id(), chunks = chunks.len(), "inserted file");
        Ok(())
    }

    async fn replace_file_content(
        &self,
        old_file_id: FileId,
        new_file: &FileEntry,
        chunks: &[Chunk],
    ) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;

        let old_row = sqlx::query("SELECT * FROM files WHERE file_id = ?")
            .bind(old_file_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(Self::db_err)?;
        let old = match old_row {
            Some(ref row) => Self::file_from_row(row)?,
            None => return Err(SyncError::NotFound(format!("file {}", old_file_id))),
        };
        if old.file_path() != new_file.file_path() {
            return Err(SyncError::ConsistencyViolation(format!(
                "replacement must keep the path: '{}' != '{}'",
                old.file_path(),
                new_file.file_path()
            )));
        }

        // Retire the superseded record, then commit the replacement with
        // its chunks in the same transaction.
        Self::delete_file_rows_tx(&mut tx, old_file_id).await?;
        Self::insert_file_tx(&mut tx, new_file).await?;
        Self::insert_chunks_tx(&mut tx, chunks).await?;

        tx.commit().await.map_err(Self::db_err)?;
        debug!(
            path = %new_file.file_path(),
            old_file_id = %old_file_id,
            new_file_id = %new_file.file_id(),
            "replaced file content"
        );
        Ok(())
    }

    async fn delete_by_path(&self, path: &SyncPath) -> Result<Vec<FileId>, SyncError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;

        if let Some(file) = Self::fetch_file_tx(&mut tx, path).await? {
            Self::delete_file_rows_tx(&mut tx, file.file_id()).await?;
            tx.commit().await.map_err(Self::db_err)?;
            debug!(path = %path, "deleted file");
            return Ok(vec![file.file_id()]);
        }

        let folder = Self::fetch_folder_tx(&mut tx, path).await?;
        let folder = match folder {
            Some(f) => f,
            None => return Err(SyncError::NotFound(path.to_string())),
        };

        // Collect the subtree in Rust to avoid LIKE-escaping pitfalls with
        // paths containing wildcard characters.
        let file_rows = sqlx::query("SELECT * FROM files")
            .fetch_all(&mut *tx)
            .await
            .map_err(Self::db_err)?;
        let mut removed = Vec::new();
        for row in &file_rows {
            let file = Self::file_from_row(row)?;
            if path.is_strict_prefix_of(file.file_path()) {
                Self::delete_file_rows_tx(&mut tx, file.file_id()).await?;
                removed.push(file.file_id());
            }
        }

        let folder_rows = sqlx::query("SELECT * FROM folders")
            .fetch_all(&mut *tx)
            .await
            .map_err(Self::db_err)?;
        for row in &folder_rows {
            let candidate = Self::folder_from_row(row)?;
            if path.is_strict_prefix_of(candidate.folder_path()) {
                sqlx::query("DELETE FROM folders WHERE folder_id = ?")
                    .bind(candidate.folder_id().to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(Self::db_err)?;
            }
        }
        sqlx::query("DELETE FROM folders WHERE folder_id = ?")
            .bind(folder.folder_id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(Self::db_err)?;

        tx.commit().await.map_err(Self::db_err)?;
        debug!(path = %path, files = removed.len(), "deleted folder subtree");
        Ok(removed)
    }

    async fn rename_or_move(
        &self,
        old_path: &SyncPath,
        new_path: &SyncPath,
    ) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;

        if Self::path_occupied_tx(&mut tx, new_path).await? {
            return Err(SyncError::DuplicatePath(new_path.to_string()));
        }

        if let Some(file) = Self::fetch_file_tx(&mut tx, old_path).await? {
            let new_parent = new_path.parent().ok_or_else(|| {
                SyncError::ConsistencyViolation(format!("'{}' has no parent folder", new_path))
            })?;
            let parent_id = self.upsert_folder_tx(&mut tx, &new_parent).await?;
            let moved = file.moved_to(new_path.clone(), parent_id)?;
            sqlx::query(
                "UPDATE files SET file_name = ?, file_path = ?, folder_id = ? WHERE file_id = ?",
            )
            .bind(moved.file_name())
            .bind(moved.file_path().as_str())
            .bind(moved.folder_id().to_string())
            .bind(moved.file_id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(Self::db_err)?;

            tx.commit().await.map_err(Self::db_err)?;
            debug!(from = %old_path, to = %new_path, "renamed file");
            return Ok(());
        }

        let folder = Self::fetch_folder_tx(&mut tx, old_path).await?;
        let folder = match folder {
            Some(f) => f,
            None => return Err(SyncError::NotFound(old_path.to_string())),
        };
        if old_path.is_strict_prefix_of(new_path) {
            return Err(SyncError::ConsistencyViolation(format!(
                "cannot move '{}' into its own subtree '{}'",
                old_path, new_path
            )));
        }

        let new_parent = new_path.parent().ok_or_else(|| {
            SyncError::ConsistencyViolation(format!("'{}' has no parent folder", new_path))
        })?;
        let parent_id = self.upsert_folder_tx(&mut tx, &new_parent).await?;
        let moved = folder.moved_to(new_path.clone(), Some(parent_id))?;
        sqlx::query(
            "UPDATE folders SET folder_name = ?, folder_path = ?, parent_folder_id = ? WHERE folder_id = ?",
        )
        .bind(moved.folder_name())
        .bind(moved.folder_path().as_str())
        .bind(parent_id.to_string())
        .bind(moved.folder_id().to_string())
        .execute(&mut *tx)
        .await
        .map_err(Self::db_err)?;

        // Cascade: rewrite descendant folder and file paths. Ids, parent
        // links below the moved folder, and chunk rows are untouched.
        let folder_rows = sqlx::query("SELECT * FROM folders")
            .fetch_all(&mut *tx)
            .await
            .map_err(Self::db_err)?;
        for row in &folder_rows {
            let descendant = Self::folder_from_row(row)?;
            if old_path.is_strict_prefix_of(descendant.folder_path()) {
                let rebased = descendant.folder_path().rebase(old_path, new_path)?;
                sqlx::query("UPDATE folders SET folder_path = ? WHERE folder_id = ?")
                    .bind(rebased.as_str())
                    .bind(descendant.folder_id().to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(Self::db_err)?;
            }
        }

        let file_rows = sqlx::query("SELECT * FROM files")
            .fetch_all(&mut *tx)
            .await
            .map_err(Self::db_err)?;
        for row in &file_rows {
            let descendant = Self::file_from_row(row)?;
            if old_path.is_strict_prefix_of(descendant.file_path()) {
                let rebased = descendant.file_path().rebase(old_path, new_path)?;
                sqlx::query("UPDATE files SET file_path = ? WHERE file_id = ?")
                    .bind(rebased.as_str())
                    .bind(descendant.file_id().to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(Self::db_err)?;
            }
        }

        tx.commit().await.map_err(Self::db_err)?;
        debug!(from = %old_path, to = %new_path, "renamed folder subtree");
        Ok(())
    }

    async fn mark_chunks_synced(
        &self,
        file_id: FileId,
        chunk_ids: &[ChunkId],
    ) -> Result<(), SyncError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;
        let now = Utc::now().to_rfc3339();
        for chunk_id in chunk_ids {
            let result = sqlx::query(
                "UPDATE chunks SET last_synced = ? WHERE chunk_id = ? AND file_id = ?",
            )
            .bind(&now)
            .bind(chunk_id.to_string())
            .bind(file_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Self::db_err)?;
            if result.rows_affected() == 0 {
                return Err(SyncError::NotFound(format!(
                    "chunk {} of file {}",
                    chunk_id, file_id
                )));
            }
        }
        tx.commit().await.map_err(Self::db_err)?;
        debug!(file_id = %file_id, chunks = chunk_ids.len(), "marked chunks synced");
        Ok(())
    }

    async fn find_file_by_path(&self, path: &SyncPath) -> Result<Option<FileEntry>, SyncError> {
        let row = sqlx::query("SELECT * FROM files WHERE file_path = ?")
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err)?;
        row.as_ref().map(Self::file_from_row).transpose()
    }

    async fn find_file(&self, file_id: FileId) -> Result<Option<FileEntry>, SyncError> {
        let row = sqlx::query("SELECT * FROM files WHERE file_id = ?")
            .bind(file_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err)?;
        row.as_ref().map(Self::file_from_row).transpose()
    }

    async fn find_folder_by_path(&self, path: &SyncPath) -> Result<Option<Folder>, SyncError> {
        let row = sqlx::query("SELECT * FROM folders WHERE folder_path = ?")
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err)?;
        row.as_ref().map(Self::folder_from_row).transpose()
    }

    async fn chunks_for_file(&self, file_id: FileId) -> Result<Vec<Chunk>, SyncError> {
        let rows = sqlx::query("SELECT * FROM chunks WHERE file_id = ? ORDER BY part_number")
            .bind(file_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(Self::db_err)?;
        rows.iter().map(Self::chunk_from_row).collect()
    }

    async fn list_files(&self) -> Result<Vec<FileEntry>, SyncError> {
        let rows = sqlx::query("SELECT * FROM files ORDER BY file_path")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::db_err)?;
        rows.iter().map(Self::file_from_row).collect()
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, SyncError> {
        let rows = sqlx::query("SELECT * FROM folders ORDER BY folder_path")
            .fetch_all(&self.pool)
            .await
            .map_err(Self::db_err)?;
        rows.iter().map(Self::folder_from_row).collect()
    }

    async fn find_synced_fingerprint(
        &self,
        fingerprint: &ContentHash,
    ) -> Result<Option<Chunk>, SyncError> {
        let row = sqlx::query(
            "SELECT * FROM chunks WHERE fingerprint = ? AND last_synced IS NOT NULL LIMIT 1",
        )
        .bind(fingerprint.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;
        row.as_ref().map(Self::chunk_from_row).transpose()
    }

    async fn files_pending_sync(&self) -> Result<Vec<FileEntry>, SyncError> {
        let rows = sqlx::query(
            "SELECT DISTINCT f.* FROM files f \
             JOIN chunks c ON c.file_id = f.file_id \
             WHERE c.last_synced IS NULL ORDER BY f.file_path",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err)?;
        rows.iter().map(Self::file_from_row).collect()
    }
}
