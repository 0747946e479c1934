// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Catalog invariants over a real SQLite database: folder tree structure,
//! path uniqueness, transactional replace, cascading deletes and renames,
//! and sync-status bookkeeping.

use mirrorbox::infrastructure::repositories::{schema, SqliteCatalog};
use mirrorbox_domain::entities::{Chunk, FileEntry};
use mirrorbox_domain::value_objects::{ChunkId, ContentHash, FileId, FolderId, PartNumber, SyncPath};
use mirrorbox_domain::{Catalog, SyncError};

async fn temp_catalog() -> (SqliteCatalog, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
    let pool = schema::initialize_database(&url).await.unwrap();
    (
        SqliteCatalog::new(pool, SyncPath::new("/sync").unwrap()),
        dir,
    )
}

fn path(s: &str) -> SyncPath {
    SyncPath::new(s).unwrap()
}

fn file_at(p: &str, folder_id: FolderId, content: &[u8]) -> FileEntry {
    FileEntry::new(
        path(p),
        folder_id,
        "application/octet-stream".to_string(),
        ContentHash::from_bytes(content),
    )
    .unwrap()
}

fn chunk_rows(file: &FileEntry, payloads: &[&[u8]]) -> Vec<Chunk> {
    payloads
        .iter()
        .enumerate()
        .map(|(i, payload)| {
            Chunk::new(
                ChunkId::new(),
                file.file_id(),
                PartNumber::new((i + 1) as u32).unwrap(),
                ContentHash::from_bytes(payload),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_upsert_folder_creates_ancestor_chain() {
    let (catalog, _dir) = temp_catalog().await;

    let z_id = catalog.upsert_folder(&path("/sync/x/y/z")).await.unwrap();

    let folders = catalog.list_folders().await.unwrap();
    assert_eq!(folders.len(), 4); // root, x, y, z

    let by_path = |p: &str| folders.iter().find(|f| f.folder_path().as_str() == p).unwrap();
    let root = by_path("/sync");
    let x = by_path("/sync/x");
    let y = by_path("/sync/x/y");
    let z = by_path("/sync/x/y/z");

    assert!(root.parent_folder_id().is_none());
    assert_eq!(x.parent_folder_id(), Some(root.folder_id()));
    assert_eq!(y.parent_folder_id(), Some(x.folder_id()));
    assert_eq!(z.parent_folder_id(), Some(y.folder_id()));
    assert_eq!(z.folder_id(), z_id);

    // Parent path is a strict prefix of the child's
    for folder in &folders {
        if let Some(parent_id) = folder.parent_folder_id() {
            let parent = folders.iter().find(|f| f.folder_id() == parent_id).unwrap();
            assert!(parent.folder_path().is_strict_prefix_of(folder.folder_path()));
        }
    }
}

#[tokio::test]
async fn test_upsert_folder_is_idempotent() {
    let (catalog, _dir) = temp_catalog().await;

    let first = catalog.upsert_folder(&path("/sync/docs")).await.unwrap();
    let second = catalog.upsert_folder(&path("/sync/docs")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(catalog.list_folders().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_upsert_folder_outside_root_rejected() {
    let (catalog, _dir) = temp_catalog().await;
    let err = catalog.upsert_folder(&path("/elsewhere/docs")).await.unwrap_err();
    assert!(matches!(err, SyncError::ConsistencyViolation(_)));
}

#[tokio::test]
async fn test_insert_file_and_query() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let file = file_at("/sync/a.bin", folder_id, b"content");
    let chunks = chunk_rows(&file, &[b"part1", b"part2", b"part3"]);
    catalog.insert_file(&file, &chunks).await.unwrap();

    let found = catalog
        .find_file_by_path(&path("/sync/a.bin"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.file_id(), file.file_id());
    assert_eq!(found.file_hash(), file.file_hash());
    assert_eq!(found.file_hash().as_str().len(), 64);

    let stored = catalog.chunks_for_file(file.file_id()).await.unwrap();
    assert_eq!(stored.len(), 3);
    // Part numbers are exactly {1, …, N} in ascending order
    for (i, chunk) in stored.iter().enumerate() {
        assert_eq!(chunk.part_number().get(), (i + 1) as u32);
        assert_eq!(chunk.fingerprint().as_str().len(), 64);
        assert!(chunk.last_synced().is_none());
    }
}

#[tokio::test]
async fn test_insert_duplicate_path_rejected() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let first = file_at("/sync/a.bin", folder_id, b"one");
    catalog
        .insert_file(&first, &chunk_rows(&first, &[b"one"]))
        .await
        .unwrap();

    let second = file_at("/sync/a.bin", folder_id, b"two");
    let err = catalog
        .insert_file(&second, &chunk_rows(&second, &[b"two"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::DuplicatePath(_)));
}

#[tokio::test]
async fn test_insert_with_dangling_folder_rejected() {
    let (catalog, _dir) = temp_catalog().await;

    let file = file_at("/sync/a.bin", FolderId::new(), b"content");
    let err = catalog
        .insert_file(&file, &chunk_rows(&file, &[b"content"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ConsistencyViolation(_)));
}

#[tokio::test]
async fn test_replace_file_content_swaps_identity() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let old = file_at("/sync/a.bin", folder_id, b"v1");
    catalog
        .insert_file(&old, &chunk_rows(&old, &[b"v1"]))
        .await
        .unwrap();

    let new = file_at("/sync/a.bin", folder_id, b"v2 much longer");
    let new_chunks = chunk_rows(&new, &[b"v2 ", b"much longer"]);
    catalog
        .replace_file_content(old.file_id(), &new, &new_chunks)
        .await
        .unwrap();

    // Path resolves to the new record only
    let found = catalog
        .find_file_by_path(&path("/sync/a.bin"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.file_id(), new.file_id());
    assert_ne!(found.file_id(), old.file_id());
    assert_eq!(found.file_hash(), new.file_hash());

    // The superseded record and its chunks are gone
    assert!(catalog.find_file(old.file_id()).await.unwrap().is_none());
    assert!(catalog.chunks_for_file(old.file_id()).await.unwrap().is_empty());
    assert_eq!(catalog.chunks_for_file(new.file_id()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_replace_missing_file_rejected() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let new = file_at("/sync/a.bin", folder_id, b"v2");
    let err = catalog
        .replace_file_content(FileId::new(), &new, &chunk_rows(&new, &[b"v2"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_file_cascades_to_chunks() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let file = file_at("/sync/a.bin", folder_id, b"content");
    catalog
        .insert_file(&file, &chunk_rows(&file, &[b"c1", b"c2"]))
        .await
        .unwrap();

    let removed = catalog.delete_by_path(&path("/sync/a.bin")).await.unwrap();
    assert_eq!(removed, vec![file.file_id()]);
    assert!(catalog.find_file(file.file_id()).await.unwrap().is_none());
    assert!(catalog.chunks_for_file(file.file_id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_folder_subtree() {
    let (catalog, _dir) = temp_catalog().await;
    let docs = catalog.upsert_folder(&path("/sync/docs")).await.unwrap();
    let nested = catalog.upsert_folder(&path("/sync/docs/2024")).await.unwrap();

    let top = file_at("/sync/docs/readme.txt", docs, b"top");
    catalog.insert_file(&top, &chunk_rows(&top, &[b"top"])).await.unwrap();
    let deep = file_at("/sync/docs/2024/notes.txt", nested, b"deep");
    catalog.insert_file(&deep, &chunk_rows(&deep, &[b"deep"])).await.unwrap();

    let other = catalog.upsert_folder(&path("/sync/other")).await.unwrap();
    let outside = file_at("/sync/other/keep.txt", other, b"keep");
    catalog
        .insert_file(&outside, &chunk_rows(&outside, &[b"keep"]))
        .await
        .unwrap();

    let mut removed = catalog.delete_by_path(&path("/sync/docs")).await.unwrap();
    removed.sort();
    let mut expected = vec![top.file_id(), deep.file_id()];
    expected.sort();
    assert_eq!(removed, expected);

    assert!(catalog.find_folder_by_path(&path("/sync/docs")).await.unwrap().is_none());
    assert!(catalog.find_folder_by_path(&path("/sync/docs/2024")).await.unwrap().is_none());
    // Unrelated entities survive
    assert!(catalog.find_file_by_path(&path("/sync/other/keep.txt")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let (catalog, _dir) = temp_catalog().await;
    let err = catalog.delete_by_path(&path("/sync/ghost")).await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[tokio::test]
async fn test_rename_file_preserves_identity_and_chunks() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let file = file_at("/sync/a.bin", folder_id, b"content");
    let chunks = chunk_rows(&file, &[b"c1", b"c2"]);
    catalog.insert_file(&file, &chunks).await.unwrap();

    catalog
        .rename_or_move(&path("/sync/a.bin"), &path("/sync/sub/b.bin"))
        .await
        .unwrap();

    assert!(catalog.find_file_by_path(&path("/sync/a.bin")).await.unwrap().is_none());
    let moved = catalog
        .find_file_by_path(&path("/sync/sub/b.bin"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.file_id(), file.file_id());
    assert_eq!(moved.file_name(), "b.bin");
    assert_eq!(moved.file_hash(), file.file_hash());

    let stored = catalog.chunks_for_file(file.file_id()).await.unwrap();
    let original_ids: Vec<_> = chunks.iter().map(|c| c.chunk_id()).collect();
    let stored_ids: Vec<_> = stored.iter().map(|c| c.chunk_id()).collect();
    assert_eq!(stored_ids, original_ids);
}

#[tokio::test]
async fn test_rename_folder_cascades_to_descendants() {
    let (catalog, _dir) = temp_catalog().await;
    let nested = catalog.upsert_folder(&path("/sync/docs/2024")).await.unwrap();
    let file = file_at("/sync/docs/2024/notes.txt", nested, b"deep");
    catalog.insert_file(&file, &chunk_rows(&file, &[b"deep"])).await.unwrap();

    catalog
        .rename_or_move(&path("/sync/docs"), &path("/sync/papers"))
        .await
        .unwrap();

    let folder = catalog
        .find_folder_by_path(&path("/sync/papers/2024"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(folder.folder_id(), nested);

    let moved = catalog
        .find_file_by_path(&path("/sync/papers/2024/notes.txt"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.file_id(), file.file_id());
    assert!(catalog.find_folder_by_path(&path("/sync/docs")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rename_to_occupied_path_rejected() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let a = file_at("/sync/a.bin", folder_id, b"a");
    catalog.insert_file(&a, &chunk_rows(&a, &[b"a"])).await.unwrap();
    let b = file_at("/sync/b.bin", folder_id, b"b");
    catalog.insert_file(&b, &chunk_rows(&b, &[b"b"])).await.unwrap();

    let err = catalog
        .rename_or_move(&path("/sync/a.bin"), &path("/sync/b.bin"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::DuplicatePath(_)));
}

#[tokio::test]
async fn test_mark_chunks_synced_and_pending() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let file = file_at("/sync/a.bin", folder_id, b"content");
    let chunks = chunk_rows(&file, &[b"c1", b"c2"]);
    catalog.insert_file(&file, &chunks).await.unwrap();

    let pending = catalog.files_pending_sync().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file_id(), file.file_id());

    let ids: Vec<_> = chunks.iter().map(|c| c.chunk_id()).collect();
    catalog.mark_chunks_synced(file.file_id(), &ids).await.unwrap();

    assert!(catalog.files_pending_sync().await.unwrap().is_empty());
    let stored = catalog.chunks_for_file(file.file_id()).await.unwrap();
    assert!(stored.iter().all(|c| c.is_synced()));
}

#[tokio::test]
async fn test_mark_unknown_chunk_rejected() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();
    let file = file_at("/sync/a.bin", folder_id, b"content");
    catalog.insert_file(&file, &chunk_rows(&file, &[b"c1"])).await.unwrap();

    let err = catalog
        .mark_chunks_synced(file.file_id(), &[ChunkId::new()])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[tokio::test]
async fn test_find_synced_fingerprint_only_matches_synced() {
    let (catalog, _dir) = temp_catalog().await;
    let folder_id = catalog.upsert_folder(&path("/sync")).await.unwrap();

    let file = file_at("/sync/a.bin", folder_id, b"content");
    let chunks = chunk_rows(&file, &[b"shared-bytes"]);
    let fingerprint = chunks[0].fingerprint().clone();
    catalog.insert_file(&file, &chunks).await.unwrap();

    // Unsynced chunks do not participate in dedup
    assert!(catalog.find_synced_fingerprint(&fingerprint).await.unwrap().is_none());

    let ids: Vec<_> = chunks.iter().map(|c| c.chunk_id()).collect();
    catalog.mark_chunks_synced(file.file_id(), &ids).await.unwrap();

    let hit = catalog
        .find_synced_fingerprint(&fingerprint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.fingerprint(), &fingerprint);
    assert!(hit.is_synced());
}
