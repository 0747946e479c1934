// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local HTTP API
//!
//! Read-only projections over the catalog plus a manual sync trigger, used
//! by smoke tests and operators. Runs inside the daemon next to the sync
//! engine; nothing here mutates the catalog directly — `POST /api/sync`
//! only enqueues a rescan and returns immediately.
//!
//! Routes:
//! - `GET  /health` — liveness payload
//! - `GET  /api/files` — file listing
//! - `GET  /api/files/{file_id}` — file details with chunks
//! - `GET  /api/folders` — folder listing
//! - `POST /api/sync` — enqueue a full rescan
//! - `POST /api/files/download` — proxy to the remote download-URL request

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use mirrorbox_bootstrap::CancellationToken;
use mirrorbox_domain::value_objects::FileId;
use mirrorbox_domain::{Catalog, SyncError};

use super::remote::wire::DownloadRequest;
use super::remote::RemoteFiles;

/// Shared state behind the router.
pub struct ApiState {
    pub catalog: Arc<dyn Catalog>,
    pub remote: Arc<dyn RemoteFiles>,
    /// Signals the engine to run a full rescan.
    pub rescan_tx: mpsc::Sender<()>,
}

/// File listing row.
#[derive(Debug, Serialize)]
struct FileSummary {
    file_id: String,
    file_name: String,
    file_path: String,
}

/// Chunk row in a file detail response.
#[derive(Debug, Serialize)]
struct ChunkView {
    chunk_id: String,
    part_number: u32,
    fingerprint: String,
    last_synced: Option<String>,
}

/// File detail response.
#[derive(Debug, Serialize)]
struct FileDetail {
    file_id: String,
    file_name: String,
    file_path: String,
    folder_id: String,
    file_type: String,
    file_hash: String,
    chunks: Vec<ChunkView>,
}

/// Folder listing row.
#[derive(Debug, Serialize)]
struct FolderSummary {
    folder_id: String,
    folder_name: String,
    folder_path: String,
    parent_folder_id: Option<String>,
}

struct ApiError(SyncError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::InvalidConfiguration(_) | SyncError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            SyncError::RemoteService(_) | SyncError::Transport(_) | SyncError::Timeout(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        Self(e)
    }
}

/// Builds the router over the shared state.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/files", get(list_files))
        .route("/api/files/{file_id}", get(file_detail))
        .route("/api/folders", get(list_folders))
        .route("/api/sync", post(trigger_sync))
        .route("/api/files/download", post(proxy_download))
        .with_state(state)
}

/// Binds and serves the API until the cancellation token fires.
pub async fn serve(
    addr: &str,
    state: Arc<ApiState>,
    token: CancellationToken,
) -> Result<(), SyncError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SyncError::InvalidConfiguration(format!("cannot bind api on {}: {}", addr, e)))?;
    info!(addr = %addr, "local api listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .map_err(|e| SyncError::Internal(format!("api server error: {}", e)))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn list_files(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<FileSummary>>, ApiError> {
    let files = state.catalog.list_files().await?;
    Ok(Json(
        files
            .into_iter()
            .map(|f| FileSummary {
                file_id: f.file_id().to_string(),
                file_name: f.file_name().to_string(),
                file_path: f.file_path().to_string(),
            })
            .collect(),
    ))
}

async fn file_detail(
    State(state): State<Arc<ApiState>>,
    Path(file_id): Path<String>,
) -> Result<Json<FileDetail>, ApiError> {
    let file_id = FileId::parse(&file_id)?;
    let file = state
        .catalog
        .find_file(file_id)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("file {}", file_id)))?;
    let chunks = state.catalog.chunks_for_file(file_id).await?;

    Ok(Json(FileDetail {
        file_id: file.file_id().to_string(),
        file_name: file.file_name().to_string(),
        file_path: file.file_path().to_string(),
        folder_id: file.folder_id().to_string(),
        file_type: file.file_type().to_string(),
        file_hash: file.file_hash().to_string(),
        chunks: chunks
            .into_iter()
            .map(|c| ChunkView {
                chunk_id: c.chunk_id().to_string(),
                part_number: c.part_number().get(),
                fingerprint: c.fingerprint().to_string(),
                last_synced: c.last_synced().map(|t| t.to_rfc3339()),
            })
            .collect(),
    }))
}

async fn list_folders(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<FolderSummary>>, ApiError> {
    let folders = state.catalog.list_folders().await?;
    Ok(Json(
        folders
            .into_iter()
            .map(|f| FolderSummary {
                folder_id: f.folder_id().to_string(),
                folder_name: f.folder_name().to_string(),
                folder_path: f.folder_path().to_string(),
                parent_folder_id: f.parent_folder_id().map(|id| id.to_string()),
            })
            .collect(),
    ))
}

async fn trigger_sync(State(state): State<Arc<ApiState>>) -> Response {
    match state.rescan_tx.try_send(()) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "enqueued": true }))).into_response(),
        Err(mpsc::error::TrySendError::Full(())) => {
            // A rescan is already queued; that one will cover this request.
            (StatusCode::ACCEPTED, Json(json!({ "enqueued": false, "already_pending": true })))
                .into_response()
        }
        Err(mpsc::error::TrySendError::Closed(())) => {
            warn!("rescan channel closed; engine is gone");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "sync engine not running" })),
            )
                .into_response()
        }
    }
}

async fn proxy_download(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let response = state.remote.request_download(&request).await?;
    Ok(Json(serde_json::to_value(response).map_err(SyncError::from)?))
}
