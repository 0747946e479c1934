// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Whole-system flows: rescan-driven sync of a populated tree, folder
//! hierarchy cataloging, delete/modify cycles, crash-shaped retries, and
//! the local API surface — all against the mock files service.

use std::sync::Arc;

use crate::common::{patterned_bytes, test_env, write_sync_file, TestEnv};
use mirrorbox::infrastructure::api::{self, ApiState};
use mirrorbox_domain::{Catalog, ChangeEvent, ContentHash, SyncPath};
use tokio::sync::mpsc;

/// Runs one rescan and drains every resulting event sequentially.
async fn sync_pass(env: &TestEnv) {
    let events = env.context.rescanner.scan().await.unwrap();
    for event in events {
        env.context.engine.process_event(event).await.unwrap();
    }
}

#[tokio::test]
async fn test_nested_folder_tree_is_cataloged() {
    let env = test_env().await;
    write_sync_file(&env, "x/y/z/leaf.txt", b"hi");

    sync_pass(&env).await;

    let folders = env.context.catalog.list_folders().await.unwrap();
    // root, x, y, z
    assert_eq!(folders.len(), 4);

    let by_name = |name: &str| folders.iter().find(|f| f.folder_name() == name).unwrap();
    let x = by_name("x");
    let y = by_name("y");
    let z = by_name("z");
    let root = folders.iter().find(|f| f.is_root()).unwrap();

    assert_eq!(x.parent_folder_id(), Some(root.folder_id()));
    assert_eq!(y.parent_folder_id(), Some(x.folder_id()));
    assert_eq!(z.parent_folder_id(), Some(y.folder_id()));

    let files = env.context.catalog.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].folder_id(), z.folder_id());
    assert_eq!(*files[0].file_hash(), ContentHash::from_bytes(b"hi"));
}

#[tokio::test]
async fn test_rescan_syncs_existing_tree_and_is_idempotent() {
    let env = test_env().await;
    let a = patterned_bytes(150_000, 20);
    let b = patterned_bytes(90_000, 21);
    write_sync_file(&env, "a.bin", &a);
    write_sync_file(&env, "docs/b.bin", &b);

    sync_pass(&env).await;

    let files = env.context.catalog.list_files().await.unwrap();
    assert_eq!(files.len(), 2);
    assert!(env.context.catalog.files_pending_sync().await.unwrap().is_empty());
    let prepares_after_first = env.mock.state.lock().unwrap().prepare_count;

    // A second pass over an unchanged tree uploads nothing new
    sync_pass(&env).await;
    assert_eq!(
        env.mock.state.lock().unwrap().prepare_count,
        prepares_after_first,
        "idempotent rescan must not re-upload unchanged files"
    );
    assert_eq!(env.context.catalog.list_files().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_and_modify_cycle() {
    let env = test_env().await;
    let a = patterned_bytes(120_000, 22);
    let b = patterned_bytes(60_000, 23);
    let path_a = write_sync_file(&env, "keep.bin", &a);
    let path_b = write_sync_file(&env, "gone.bin", &b);

    sync_pass(&env).await;
    assert_eq!(env.context.catalog.list_files().await.unwrap().len(), 2);

    // Delete one, grow the other
    std::fs::remove_file(env.sync_dir.join("gone.bin")).unwrap();
    let mut grown = a.clone();
    grown.extend_from_slice(&patterned_bytes(30_000, 24));
    write_sync_file(&env, "keep.bin", &grown);

    sync_pass(&env).await;

    assert!(env.context.catalog.find_file_by_path(&path_b).await.unwrap().is_none());
    let kept = env.context.catalog.find_file_by_path(&path_a).await.unwrap().unwrap();
    assert_eq!(*kept.file_hash(), ContentHash::from_bytes(&grown));

    // And the grown file still restores byte-for-byte
    let dest = env.sync_dir.parent().unwrap().join("kept_restore.bin");
    env.context.downloader.download_file(kept.file_id(), &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), grown);
}

#[tokio::test]
async fn test_interrupted_upload_retries_on_rescan() {
    let env = test_env().await;
    let data = patterned_bytes(100_000, 25);
    let path = write_sync_file(&env, "flaky.bin", &data);

    // Simulate a crash between insert and confirm: the catalog holds the
    // file with unsynced chunks (what a cancelled upload leaves behind).
    let folder_id = env
        .context
        .catalog
        .upsert_folder(&path.parent().unwrap())
        .await
        .unwrap();
    let file = mirrorbox_domain::entities::FileEntry::new(
        path.clone(),
        folder_id,
        "application/octet-stream".to_string(),
        ContentHash::from_bytes(&data),
    )
    .unwrap();
    let chunks = vec![
        mirrorbox_domain::entities::Chunk::new(
            mirrorbox_domain::ChunkId::new(),
            file.file_id(),
            mirrorbox_domain::PartNumber::FIRST,
            ContentHash::from_bytes(&data),
        ),
    ];
    env.context.catalog.insert_file(&file, &chunks).await.unwrap();

    let pending = env.context.catalog.files_pending_sync().await.unwrap();
    assert_eq!(pending.len(), 1);

    // The rescan emits Modified for the existing path; unsynced chunks
    // force a re-upload even though the hash is unchanged.
    sync_pass(&env).await;

    let resynced = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    let chunks = env.context.catalog.chunks_for_file(resynced.file_id()).await.unwrap();
    assert!(!chunks.is_empty());
    assert!(chunks.iter().all(|c| c.is_synced()));
    assert!(env.context.catalog.files_pending_sync().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_local_api_surface() {
    let env = test_env().await;
    let data = patterned_bytes(70_000, 26);
    write_sync_file(&env, "api_visible.bin", &data);
    sync_pass(&env).await;

    let (rescan_tx, mut rescan_rx) = mpsc::channel(1);
    let state = Arc::new(ApiState {
        catalog: Arc::clone(&env.context.catalog),
        remote: Arc::clone(&env.context.remote),
        rescan_tx,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let token = env.coordinator.token();
    let server = tokio::spawn(async move {
        axum::serve(listener, api::router(state))
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    // Health
    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    // Listing
    let files: serde_json::Value = client
        .get(format!("{}/api/files", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listing = files.as_array().unwrap();
    assert_eq!(listing.len(), 1);
    let file_id = listing[0]["file_id"].as_str().unwrap().to_string();
    assert!(listing[0]["file_path"].as_str().unwrap().ends_with("api_visible.bin"));

    // Detail with chunks
    let detail: serde_json::Value = client
        .get(format!("{}/api/files/{}", base, file_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["file_hash"].as_str().unwrap().len(), 64);
    assert!(!detail["chunks"].as_array().unwrap().is_empty());

    // Folders
    let folders: serde_json::Value = client
        .get(format!("{}/api/folders", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!folders.as_array().unwrap().is_empty());

    // Sync trigger enqueues exactly one rescan
    let trigger = client
        .post(format!("{}/api/sync", base))
        .send()
        .await
        .unwrap();
    assert_eq!(trigger.status(), reqwest::StatusCode::ACCEPTED);
    assert!(rescan_rx.recv().await.is_some());

    // Unknown file id is a 404
    let missing = client
        .get(format!("{}/api/files/{}", base, mirrorbox_domain::FileId::new()))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    env.coordinator.initiate_shutdown();
    let _ = server.await;
}

#[tokio::test]
async fn test_folder_rename_cascade_end_to_end() {
    let env = test_env().await;
    let data = patterned_bytes(50_000, 27);
    write_sync_file(&env, "photos/2024/pic.bin", &data);
    sync_pass(&env).await;

    let old_file_path =
        SyncPath::from_std_path(&env.sync_dir.join("photos/2024/pic.bin")).unwrap();
    let before = env
        .context
        .catalog
        .find_file_by_path(&old_file_path)
        .await
        .unwrap()
        .unwrap();

    // Rename the top folder on disk and deliver the canonical event
    std::fs::rename(env.sync_dir.join("photos"), env.sync_dir.join("albums")).unwrap();
    let from = SyncPath::from_std_path(&env.sync_dir.join("photos")).unwrap();
    let to = SyncPath::from_std_path(&env.sync_dir.join("albums")).unwrap();
    env.context
        .engine
        .process_event(ChangeEvent::Renamed {
            from,
            to,
            kind: mirrorbox_domain::PathKind::Directory,
        })
        .await
        .unwrap();

    let new_file_path =
        SyncPath::from_std_path(&env.sync_dir.join("albums/2024/pic.bin")).unwrap();
    let after = env
        .context
        .catalog
        .find_file_by_path(&new_file_path)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.file_id(), before.file_id());

    // No re-upload happened for a pure move
    assert_eq!(env.mock.state.lock().unwrap().prepare_count, 1);
}
