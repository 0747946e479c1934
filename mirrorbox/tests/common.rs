// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared test harness: an in-process mock files service speaking the real
//! wire contract, plus helpers for building a wired application context
//! over temporary directories.
//!
//! The mock issues presigned URLs pointing back at itself, stores chunk
//! PUTs in memory, assembles the completed object at confirm time, and
//! serves ranged GETs against the whole object — the same shape as an
//! S3-style multipart upload behind the real service.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Bookkeeping for one issued chunk slot.
#[derive(Debug, Clone)]
pub struct IssuedChunk {
    pub file_id: String,
    pub part_number: u32,
}

/// Observable state of the mock service.
#[derive(Debug, Default)]
pub struct MockState {
    /// chunk_id -> slot metadata, assigned at prepare time
    pub issued: HashMap<String, IssuedChunk>,
    /// chunk_id -> uploaded bytes
    pub chunk_bytes: HashMap<String, Vec<u8>>,
    /// file_id -> chunk ids in confirmed (part) order
    pub confirmed: HashMap<String, Vec<String>>,
    /// Range headers seen by the object endpoint, in arrival order
    pub ranges_served: Vec<(String, String)>,
    pub prepare_count: usize,
    pub put_count: usize,
    pub confirm_count: usize,
    pub download_count: usize,
    /// When set, the object endpoint corrupts the first byte it serves
    pub corrupt_reads: bool,
}

/// In-process mock of the remote files service.
pub struct MockFilesService {
    pub base_url: String,
    pub state: Arc<Mutex<MockState>>,
    _server: tokio::task::JoinHandle<()>,
}

#[derive(Clone)]
struct MockContext {
    state: Arc<Mutex<MockState>>,
    base_url: String,
}

impl MockFilesService {
    /// Binds an ephemeral port and serves the mock until dropped.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);
        let state = Arc::new(Mutex::new(MockState::default()));

        let ctx = MockContext {
            state: Arc::clone(&state),
            base_url: base_url.clone(),
        };
        let app = Router::new()
            .route("/health", get(health))
            .route("/files", post(prepare))
            .route("/files/confirm", post(confirm))
            .route("/files/download", post(download))
            .route("/chunks/{chunk_id}", put(put_chunk))
            .route("/object/{file_id}", get(get_object))
            .layer(axum::extract::DefaultBodyLimit::max(64 * 1024 * 1024))
            .with_state(ctx);

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            state,
            _server: server,
        }
    }

    /// Number of PUTs the mock has absorbed.
    pub fn put_count(&self) -> usize {
        self.state.lock().unwrap().put_count
    }

    /// Number of confirm calls.
    pub fn confirm_count(&self) -> usize {
        self.state.lock().unwrap().confirm_count
    }

    /// Range headers observed by the object endpoint.
    pub fn ranges_served(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().ranges_served.clone()
    }

    /// Makes subsequent object reads return corrupted bytes.
    pub fn corrupt_reads(&self, enabled: bool) {
        self.state.lock().unwrap().corrupt_reads = enabled;
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn prepare(State(ctx): State<MockContext>, Json(body): Json<Value>) -> Json<Value> {
    let chunk_count = body["chunk_count"].as_u64().unwrap_or(0) as u32;
    let file_id = Uuid::new_v4().to_string();

    let mut state = ctx.state.lock().unwrap();
    state.prepare_count += 1;

    let mut urls = Vec::new();
    for part in 1..=chunk_count {
        let chunk_id = Uuid::new_v4().to_string();
        state.issued.insert(
            chunk_id.clone(),
            IssuedChunk {
                file_id: file_id.clone(),
                part_number: part,
            },
        );
        urls.push(json!({
            "chunk_id": chunk_id,
            "part_number": part,
            "presigned_url": format!("{}/chunks/{}", ctx.base_url, chunk_id),
        }));
    }

    Json(json!({ "file_id": file_id, "presigned_urls": urls }))
}

async fn put_chunk(
    State(ctx): State<MockContext>,
    AxumPath(chunk_id): AxumPath<String>,
    body: Bytes,
) -> Response {
    let mut state = ctx.state.lock().unwrap();
    if !state.issued.contains_key(&chunk_id) {
        return (StatusCode::FORBIDDEN, "unknown presigned url").into_response();
    }
    state.put_count += 1;

    // ETag mirrors the object store convention: a content digest in quotes
    let digest = mirrorbox_domain::ContentHash::from_bytes(&body);
    state.chunk_bytes.insert(chunk_id, body.to_vec());

    ([(axum::http::header::ETAG, format!("\"{}\"", digest))], StatusCode::OK).into_response()
}

async fn confirm(State(ctx): State<MockContext>, Json(body): Json<Value>) -> Json<Value> {
    let file_id = body["file_id"].as_str().unwrap_or_default().to_string();
    let chunk_ids: Vec<String> = body["chunk_ids"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let mut state = ctx.state.lock().unwrap();
    state.confirm_count += 1;

    for chunk_id in &chunk_ids {
        match state.issued.get(chunk_id) {
            Some(slot) if slot.file_id == file_id => {}
            _ => {
                return Json(json!({
                    "success": false,
                    "error_message": format!("chunk {} was not issued for file {}", chunk_id, file_id),
                }));
            }
        }
    }

    // Idempotent: confirming the same payload twice is a no-op.
    state.confirmed.insert(file_id, chunk_ids);
    Json(json!({ "success": true }))
}

async fn download(State(ctx): State<MockContext>, Json(body): Json<Value>) -> Json<Value> {
    let file_id = body["file_id"].as_str().unwrap_or_default().to_string();
    let mut state = ctx.state.lock().unwrap();
    state.download_count += 1;

    if !state.confirmed.contains_key(&file_id) {
        return Json(json!({
            "success": false,
            "error_message": format!("file {} has not been confirmed", file_id),
        }));
    }
    let mut urls = Vec::new();
    if let Some(chunks) = body["chunks"].as_array() {
        for chunk in chunks {
            // No range metadata on purpose: the client must derive it from
            // the part number and the fixed chunk size.
            urls.push(json!({
                "chunk_id": chunk["chunk_id"],
                "part_number": chunk["part_number"],
                "presigned_url": format!("{}/object/{}", ctx.base_url, file_id),
            }));
        }
    }

    Json(json!({ "success": true, "download_urls": urls }))
}

async fn get_object(
    State(ctx): State<MockContext>,
    AxumPath(file_id): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = ctx.state.lock().unwrap();

    let chunk_ids = match state.confirmed.get(&file_id) {
        Some(ids) => ids.clone(),
        None => return (StatusCode::NOT_FOUND, "file not confirmed").into_response(),
    };
    let mut object = Vec::new();
    for chunk_id in &chunk_ids {
        match state.chunk_bytes.get(chunk_id) {
            Some(bytes) => object.extend_from_slice(bytes),
            None => return (StatusCode::NOT_FOUND, "chunk bytes missing").into_response(),
        }
    }
    if state.corrupt_reads && !object.is_empty() {
        object[0] ^= 0xff;
    }

    match headers.get(axum::http::header::RANGE).and_then(|v| v.to_str().ok()) {
        Some(range) => {
            state
                .ranges_served
                .push((file_id.clone(), range.to_string()));
            match parse_range(range, object.len() as u64) {
                Some((start, end)) => {
                    let slice = object[start as usize..=(end as usize)].to_vec();
                    (StatusCode::PARTIAL_CONTENT, slice).into_response()
                }
                None => (StatusCode::RANGE_NOT_SATISFIABLE, "bad range").into_response(),
            }
        }
        None => (StatusCode::OK, object).into_response(),
    }
}

/// Parses `bytes=a-b`, clamping the end to the object length like an
/// object store does.
fn parse_range(header: &str, len: u64) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    let end: u64 = end.parse().ok()?;
    if len == 0 || start >= len {
        return None;
    }
    Some((start, end.min(len - 1)))
}

// === Application wiring helpers ===

use mirrorbox::application::use_cases::AppContext;
use mirrorbox::infrastructure::config::SyncConfig;
use mirrorbox_bootstrap::ShutdownCoordinator;

/// Temporary directories plus a wired context against a mock service.
pub struct TestEnv {
    pub context: AppContext,
    pub mock: MockFilesService,
    pub coordinator: ShutdownCoordinator,
    pub sync_dir: std::path::PathBuf,
    _root: tempfile::TempDir,
}

/// Builds a full application context over temp dirs, pointing the remote
/// client at a fresh mock service.
pub async fn test_env_with_chunk_size(chunk_size: u64) -> TestEnv {
    let root = tempfile::tempdir().unwrap();
    let sync_dir = root.path().join("sync");
    let chunk_dir = root.path().join("staging");
    let db_path = root.path().join("catalog.db");
    std::fs::create_dir_all(&sync_dir).unwrap();

    let mock = MockFilesService::start().await;
    let config = SyncConfig {
        sync_dir: sync_dir.clone(),
        chunk_dir,
        db_path,
        chunk_size,
        files_service_url: mock.base_url.clone(),
        request_timeout_secs: 5,
        max_retries: 2,
        upload_workers: 4,
        event_queue_depth: 64,
        debounce_ms: 100,
        api_addr: "127.0.0.1:0".to_string(),
        dedup_uploads: true,
        client_id: None,
    };

    let coordinator = ShutdownCoordinator::default();
    let context = AppContext::build(config, coordinator.token()).await.unwrap();
    TestEnv {
        context,
        mock,
        coordinator,
        sync_dir,
        _root: root,
    }
}

/// Default environment with a small (64 KiB) chunk size for fast tests.
pub async fn test_env() -> TestEnv {
    test_env_with_chunk_size(64 * 1024).await
}

/// Deterministic pseudo-random payload.
pub fn patterned_bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i as u64 * 31 + seed as u64 * 17) % 251) as u8)
        .collect()
}

/// Writes a file inside the sync root and returns its canonical path.
pub fn write_sync_file(env: &TestEnv, rel: &str, contents: &[u8]) -> mirrorbox_domain::SyncPath {
    let path = env.sync_dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    mirrorbox_domain::SyncPath::from_std_path(&path).unwrap()
}
