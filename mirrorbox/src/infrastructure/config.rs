// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sync Configuration
//!
//! Process-wide configuration, initialized once at startup and immutable
//! thereafter. Values are layered: built-in defaults, then an optional TOML
//! file, then environment variables with the `MIRRORBOX_` prefix (e.g.
//! `MIRRORBOX_SYNC_DIR`, `MIRRORBOX_FILES_SERVICE_URL`).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use mirrorbox_domain::{ChunkSize, SyncError};

/// Complete runtime configuration for the sync client.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Path to the sync root whose contents are mirrored
    pub sync_dir: PathBuf,

    /// Staging directory for chunk payloads pending upload
    pub chunk_dir: PathBuf,

    /// Catalog database file location
    pub db_path: PathBuf,

    /// Fixed chunk size in bytes
    pub chunk_size: u64,

    /// Base URL of the remote files service
    pub files_service_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Bounded retry attempts for transient network failures
    pub max_retries: u32,

    /// Parallel chunk transfer workers (uploads and downloads)
    pub upload_workers: usize,

    /// Capacity of the watcher → engine event queue
    pub event_queue_depth: usize,

    /// Debounce window for coalescing bursts of events, in milliseconds
    pub debounce_ms: u64,

    /// Bind address of the local read-only API
    pub api_addr: String,

    /// Skip presigned PUTs for fingerprints already synced (content dedup)
    pub dedup_uploads: bool,

    /// Optional tag for multi-device debugging
    pub client_id: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_dir: PathBuf::from("/app/my_dropbox"),
            chunk_dir: PathBuf::from("/app/chunks"),
            db_path: PathBuf::from("/app/mirrorbox.db"),
            chunk_size: ChunkSize::DEFAULT_SIZE,
            files_service_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            max_retries: 3,
            upload_workers: 8,
            event_queue_depth: 1024,
            debounce_ms: 500,
            api_addr: "127.0.0.1:8081".to_string(),
            dedup_uploads: true,
            client_id: None,
        }
    }
}

impl SyncConfig {
    /// Loads configuration from defaults, an optional TOML file, and
    /// `MIRRORBOX_*` environment variables (later layers win).
    pub fn load(config_file: Option<&str>) -> Result<Self, SyncError> {
        let defaults = SyncConfig::default();

        let mut builder = config::Config::builder()
            .set_default("sync_dir", defaults.sync_dir.to_string_lossy().to_string())
            .and_then(|b| b.set_default("chunk_dir", defaults.chunk_dir.to_string_lossy().to_string()))
            .and_then(|b| b.set_default("db_path", defaults.db_path.to_string_lossy().to_string()))
            .and_then(|b| b.set_default("chunk_size", defaults.chunk_size))
            .and_then(|b| b.set_default("files_service_url", defaults.files_service_url.clone()))
            .and_then(|b| b.set_default("request_timeout_secs", defaults.request_timeout_secs))
            .and_then(|b| b.set_default("max_retries", defaults.max_retries as u64))
            .and_then(|b| b.set_default("upload_workers", defaults.upload_workers as u64))
            .and_then(|b| b.set_default("event_queue_depth", defaults.event_queue_depth as u64))
            .and_then(|b| b.set_default("debounce_ms", defaults.debounce_ms))
            .and_then(|b| b.set_default("api_addr", defaults.api_addr.clone()))
            .and_then(|b| b.set_default("dedup_uploads", defaults.dedup_uploads))
            .map_err(|e| SyncError::InvalidConfiguration(e.to_string()))?;

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("MIRRORBOX").try_parsing(true))
            .build()
            .map_err(|e| SyncError::InvalidConfiguration(e.to_string()))?;

        let cfg: SyncConfig = settings
            .try_deserialize()
            .map_err(|e| SyncError::InvalidConfiguration(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<(), SyncError> {
        ChunkSize::new(self.chunk_size)?;
        if self.upload_workers == 0 {
            return Err(SyncError::InvalidConfiguration(
                "upload_workers must be at least 1".into(),
            ));
        }
        if self.event_queue_depth == 0 {
            return Err(SyncError::InvalidConfiguration(
                "event_queue_depth must be at least 1".into(),
            ));
        }
        if self.files_service_url.is_empty() {
            return Err(SyncError::InvalidConfiguration(
                "files_service_url must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Validated chunk size value object.
    pub fn chunk_size(&self) -> ChunkSize {
        // validate() ran at load time
        ChunkSize::new(self.chunk_size).unwrap_or_default()
    }

    /// Per-request network timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Debounce window for the watcher.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// SQLite connection URL for the catalog database.
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.db_path.display())
    }
}
