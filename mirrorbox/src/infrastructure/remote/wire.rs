// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Files Service Wire Contract
//!
//! Request/response bodies for the three endpoints (JSON over HTTP, UTF-8):
//!
//! - `POST /files` — request presigned upload URLs
//! - `POST /files/confirm` — complete a multipart upload
//! - `POST /files/download` — request presigned download URLs with ranges
//!
//! Field names and shapes follow the service contract exactly; identifiers
//! serialize as lowercase UUID strings, hashes as 64 lowercase hex chars.

use serde::{Deserialize, Serialize};

use mirrorbox_domain::value_objects::{ChunkId, ContentHash, FileId, FolderId};

/// `POST /files` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareUploadRequest {
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub folder_id: FolderId,
    pub chunk_count: u32,
    pub file_hash: ContentHash,
}

/// One presigned upload slot, part numbers 1-based contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUpload {
    pub chunk_id: ChunkId,
    pub part_number: u32,
    pub presigned_url: String,
}

/// `POST /files` response body. `presigned_urls` length equals the
/// requested `chunk_count`; the service-issued `file_id` is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareUploadResponse {
    pub file_id: FileId,
    pub presigned_urls: Vec<PresignedUpload>,
}

/// `POST /files/confirm` request body. `chunk_ids` order equals the
/// `part_number` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub file_id: FileId,
    pub chunk_ids: Vec<ChunkId>,
}

/// `POST /files/confirm` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One chunk reference in a download request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadChunkRef {
    pub chunk_id: ChunkId,
    pub part_number: u32,
    pub fingerprint: ContentHash,
}

/// `POST /files/download` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub file_id: FileId,
    pub chunks: Vec<DownloadChunkRef>,
}

/// One presigned download URL. Range metadata is optional on the wire;
/// when absent the client derives it from the part number and the fixed
/// chunk size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadUrl {
    pub chunk_id: ChunkId,
    pub part_number: u32,
    pub presigned_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_byte: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_byte: Option<u64>,
}

/// `POST /files/download` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub download_urls: Vec<DownloadUrl>,
}

/// `GET /health` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
