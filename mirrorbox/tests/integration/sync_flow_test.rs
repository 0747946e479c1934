// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Upload/download flows against the in-process mock files service: the
//! three-phase multipart protocol, chunk geometry at the boundaries,
//! content modification, deduplication, ranged downloads, and integrity
//! verification.

use crate::common::{patterned_bytes, test_env, test_env_with_chunk_size, write_sync_file};
use mirrorbox_domain::{Catalog, ChangeEvent, ContentHash, PathKind};

const MIB: u64 = 1024 * 1024;

#[tokio::test]
async fn test_small_file_sync() {
    let env = test_env_with_chunk_size(5 * MIB).await;
    let data = patterned_bytes(2 * MIB as usize, 1);
    let path = write_sync_file(&env, "a.bin", &data);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();

    let file = env
        .context
        .catalog
        .find_file_by_path(&path)
        .await
        .unwrap()
        .expect("file should be cataloged");
    assert_eq!(*file.file_hash(), ContentHash::from_bytes(&data));

    let chunks = env.context.catalog.chunks_for_file(file.file_id()).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_synced(), "last_synced should be set after confirm");

    assert_eq!(env.mock.put_count(), 1);
    assert_eq!(env.mock.confirm_count(), 1);
}

#[tokio::test]
async fn test_large_file_chunk_geometry() {
    let env = test_env_with_chunk_size(5 * MIB).await;
    let data = patterned_bytes(12 * MIB as usize, 2);
    let path = write_sync_file(&env, "large.bin", &data);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();

    let file = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    let chunks = env.context.catalog.chunks_for_file(file.file_id()).await.unwrap();

    // 12 MiB at 5 MiB chunks: parts {1,2,3}
    let parts: Vec<u32> = chunks.iter().map(|c| c.part_number().get()).collect();
    assert_eq!(parts, vec![1, 2, 3]);

    // Fingerprints pairwise distinct for patterned content
    let fingerprints: Vec<&str> = chunks.iter().map(|c| c.fingerprint().as_str()).collect();
    assert_ne!(fingerprints[0], fingerprints[1]);
    assert_ne!(fingerprints[1], fingerprints[2]);
    assert_ne!(fingerprints[0], fingerprints[2]);

    // The mock absorbed chunk payloads of {5, 5, 2} MiB
    let mut sizes: Vec<usize> = {
        let state = env.mock.state.lock().unwrap();
        state.chunk_bytes.values().map(|b| b.len()).collect()
    };
    sizes.sort_unstable();
    assert_eq!(
        sizes,
        vec![2 * MIB as usize, 5 * MIB as usize, 5 * MIB as usize]
    );
}

#[tokio::test]
async fn test_modification_creates_new_file_id() {
    let env = test_env_with_chunk_size(5 * MIB).await;
    let original = patterned_bytes(2 * MIB as usize, 3);
    let path = write_sync_file(&env, "a.bin", &original);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();
    let before = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();

    // Append 512 KiB and re-sync
    let mut modified = original.clone();
    modified.extend_from_slice(&patterned_bytes(512 * 1024, 4));
    write_sync_file(&env, "a.bin", &modified);

    env.context
        .engine
        .process_event(ChangeEvent::Modified { path: path.clone() })
        .await
        .unwrap();

    let after = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    assert_ne!(after.file_id(), before.file_id(), "modification replaces the identity");
    assert_ne!(after.file_hash(), before.file_hash());
    assert_eq!(*after.file_hash(), ContentHash::from_bytes(&modified));

    // Still one chunk: 2.5 MiB fits a single 5 MiB chunk, with a fresh
    // fingerprint covering the appended bytes
    let chunks = env.context.catalog.chunks_for_file(after.file_id()).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(*chunks[0].fingerprint(), ContentHash::from_bytes(&modified));

    // The superseded record and its chunk rows are gone
    assert!(env.context.catalog.find_file(before.file_id()).await.unwrap().is_none());
    assert!(env
        .context
        .catalog
        .chunks_for_file(before.file_id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unchanged_content_drops_event() {
    let env = test_env().await;
    let data = patterned_bytes(100_000, 5);
    let path = write_sync_file(&env, "same.bin", &data);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();
    let first = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    let prepares_before = env.mock.state.lock().unwrap().prepare_count;

    env.context
        .engine
        .process_event(ChangeEvent::Modified { path: path.clone() })
        .await
        .unwrap();

    let second = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    assert_eq!(second.file_id(), first.file_id(), "unchanged content keeps identity");
    assert_eq!(
        env.mock.state.lock().unwrap().prepare_count,
        prepares_before,
        "no new upload is prepared for unchanged content"
    );
}

#[tokio::test]
async fn test_duplicate_content_dedup_skips_puts() {
    let env = test_env().await;
    let data = patterned_bytes(200_000, 6);

    let path_a = write_sync_file(&env, "a.bin", &data);
    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path_a.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();
    let puts_after_first = env.mock.put_count();
    assert!(puts_after_first > 0);

    let path_b = write_sync_file(&env, "b.bin", &data);
    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path_b.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();

    let a = env.context.catalog.find_file_by_path(&path_a).await.unwrap().unwrap();
    let b = env.context.catalog.find_file_by_path(&path_b).await.unwrap().unwrap();

    // Same bytes, same hash, pairwise-equal fingerprints
    assert_eq!(a.file_hash(), b.file_hash());
    let fp = |chunks: &[mirrorbox_domain::entities::Chunk]| {
        chunks.iter().map(|c| c.fingerprint().clone()).collect::<Vec<_>>()
    };
    let chunks_a = env.context.catalog.chunks_for_file(a.file_id()).await.unwrap();
    let chunks_b = env.context.catalog.chunks_for_file(b.file_id()).await.unwrap();
    assert_eq!(fp(&chunks_a), fp(&chunks_b));

    // Upload once, confirm twice
    assert_eq!(env.mock.put_count(), puts_after_first, "dedup skipped every PUT");
    assert_eq!(env.mock.confirm_count(), 2);
    assert!(chunks_b.iter().all(|c| c.is_synced()));
}

#[tokio::test]
async fn test_download_subrange_with_derived_ranges() {
    let env = test_env_with_chunk_size(5 * MIB).await;
    let data = patterned_bytes(12 * MIB as usize, 7);
    let path = write_sync_file(&env, "large.bin", &data);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();

    let file = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    let chunks = env.context.catalog.chunks_for_file(file.file_id()).await.unwrap();

    // Request parts {1, 3} only
    let subset = vec![chunks[0].clone(), chunks[2].clone()];
    let fetched = env
        .context
        .downloader
        .fetch_chunks(file.file_id(), &subset)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 2);
    for (part, bytes) in &fetched {
        let expected = subset
            .iter()
            .find(|c| c.part_number() == *part)
            .unwrap()
            .fingerprint()
            .clone();
        assert_eq!(ContentHash::from_bytes(bytes), expected);
    }

    // The mock saw ranged GETs at the derived offsets. The service omitted
    // range metadata, so the client computed [(p-1)·S, p·S-1].
    let mut ranges: Vec<String> = env.mock.ranges_served().into_iter().map(|(_, r)| r).collect();
    ranges.sort();
    assert_eq!(ranges, vec!["bytes=0-5242879", "bytes=10485760-15728639"]);

    // Chunk 3 is the 2 MiB tail
    let tail = fetched
        .iter()
        .find(|(p, _)| p.get() == 3)
        .map(|(_, b)| b.len())
        .unwrap();
    assert_eq!(tail, 2 * MIB as usize);
}

#[tokio::test]
async fn test_upload_download_round_trip() {
    let env = test_env().await;
    let data = patterned_bytes(300_000, 8);
    let path = write_sync_file(&env, "roundtrip.bin", &data);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();

    let file = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    let dest = env.sync_dir.parent().unwrap().join("restored.bin");
    env.context
        .downloader
        .download_file(file.file_id(), &dest)
        .await
        .unwrap();

    let restored = std::fs::read(&dest).unwrap();
    assert_eq!(restored, data, "reassembly reproduces the original bytes");
    assert_eq!(ContentHash::from_bytes(&restored), *file.file_hash());
}

#[tokio::test]
async fn test_confirm_is_idempotent() {
    use mirrorbox::infrastructure::remote::wire::ConfirmRequest;
    use mirrorbox::infrastructure::remote::RemoteFiles;

    let env = test_env().await;
    let data = patterned_bytes(50_000, 9);
    let path = write_sync_file(&env, "a.bin", &data);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();

    let file = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    let chunks = env.context.catalog.chunks_for_file(file.file_id()).await.unwrap();
    let request = ConfirmRequest {
        file_id: file.file_id(),
        chunk_ids: chunks.iter().map(|c| c.chunk_id()).collect(),
    };

    // Re-confirming the already-confirmed upload succeeds identically
    env.context.remote.confirm_upload(&request).await.unwrap();
    env.context.remote.confirm_upload(&request).await.unwrap();

    // And the file still downloads
    let dest = env.sync_dir.parent().unwrap().join("after_reconfirm.bin");
    env.context.downloader.download_file(file.file_id(), &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn test_corrupted_download_is_integrity_failure() {
    let env = test_env().await;
    let data = patterned_bytes(80_000, 10);
    let path = write_sync_file(&env, "a.bin", &data);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();
    let file = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();

    env.mock.corrupt_reads(true);
    let dest = env.sync_dir.parent().unwrap().join("corrupt.bin");
    let err = env
        .context
        .downloader
        .download_file(file.file_id(), &dest)
        .await
        .unwrap_err();
    assert!(matches!(err, mirrorbox_domain::SyncError::IntegrityFailure(_)));
    assert!(!dest.exists(), "no partial output is left behind");
}

#[tokio::test]
async fn test_rename_preserves_download_identity() {
    let env = test_env().await;
    let data = patterned_bytes(120_000, 11);
    let path = write_sync_file(&env, "before.bin", &data);

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();
    let before = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();

    // Rename on disk, then deliver the canonical event
    let from_os = env.sync_dir.join("before.bin");
    let to_os = env.sync_dir.join("after.bin");
    std::fs::rename(&from_os, &to_os).unwrap();
    let to_path = mirrorbox_domain::SyncPath::from_std_path(&to_os).unwrap();

    env.context
        .engine
        .process_event(ChangeEvent::Renamed {
            from: path.clone(),
            to: to_path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();

    let after = env.context.catalog.find_file_by_path(&to_path).await.unwrap().unwrap();
    assert_eq!(after.file_id(), before.file_id(), "rename preserves identity");

    // Download for the same file id still succeeds: no re-upload happened
    let dest = env.sync_dir.parent().unwrap().join("renamed_restore.bin");
    env.context.downloader.download_file(after.file_id(), &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn test_empty_file_sync() {
    let env = test_env().await;
    let path = write_sync_file(&env, "empty.bin", b"");

    env.context
        .engine
        .process_event(ChangeEvent::Created {
            path: path.clone(),
            kind: PathKind::File,
        })
        .await
        .unwrap();

    let file = env.context.catalog.find_file_by_path(&path).await.unwrap().unwrap();
    assert_eq!(*file.file_hash(), ContentHash::from_bytes(b""));

    let chunks = env.context.catalog.chunks_for_file(file.file_id()).await.unwrap();
    assert_eq!(chunks.len(), 1, "a zero-byte file has exactly one chunk");
    assert_eq!(*chunks[0].fingerprint(), ContentHash::from_bytes(b""));
    assert!(chunks[0].is_synced());
}
