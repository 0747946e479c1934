// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Composition Root
//!
//! Wires configuration into the concrete service graph shared by every
//! use case: catalog pool, remote client, chunker, uploader, downloader,
//! rescanner, and sync engine. Built once per process.

use std::sync::Arc;
use tokio::sync::Semaphore;

use mirrorbox_bootstrap::CancellationToken;
use mirrorbox_domain::{Catalog, SyncError, SyncPath};

use crate::application::services::{Chunker, Downloader, SyncEngine, Uploader};
use crate::infrastructure::config::SyncConfig;
use crate::infrastructure::remote::{FilesServiceClient, RemoteFiles};
use crate::infrastructure::repositories::{schema, SqliteCatalog};
use crate::infrastructure::watcher::Rescanner;

/// Fully wired application services.
pub struct AppContext {
    pub config: SyncConfig,
    pub root: SyncPath,
    pub catalog: Arc<dyn Catalog>,
    pub remote: Arc<dyn RemoteFiles>,
    pub chunker: Arc<Chunker>,
    pub uploader: Arc<Uploader>,
    pub downloader: Arc<Downloader>,
    pub rescanner: Arc<Rescanner>,
    pub engine: Arc<SyncEngine>,
}

impl AppContext {
    /// Builds the service graph: initializes the catalog database, the
    /// HTTP client, and the shared transfer worker pool.
    pub async fn build(config: SyncConfig, token: CancellationToken) -> Result<Self, SyncError> {
        let root = SyncPath::from_std_path(&config.sync_dir)?;

        tokio::fs::create_dir_all(&config.sync_dir).await?;
        tokio::fs::create_dir_all(&config.chunk_dir).await?;
        if let Some(parent) = config.db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool = schema::initialize_database(&config.database_url())
            .await
            .map_err(|e| SyncError::Database(format!("catalog init failed: {}", e)))?;
        let catalog: Arc<dyn Catalog> = Arc::new(SqliteCatalog::new(pool, root.clone()));

        let remote: Arc<dyn RemoteFiles> = Arc::new(FilesServiceClient::new(
            config.files_service_url.clone(),
            config.request_timeout(),
            config.max_retries,
        )?);

        let workers = Arc::new(Semaphore::new(config.upload_workers));
        let chunker = Arc::new(Chunker::new(config.chunk_size(), config.chunk_dir.clone()));
        let uploader = Arc::new(Uploader::new(
            Arc::clone(&remote),
            Arc::clone(&catalog),
            Arc::clone(&chunker),
            Arc::clone(&workers),
            config.dedup_uploads,
        ));
        let downloader = Arc::new(Downloader::new(
            Arc::clone(&remote),
            Arc::clone(&catalog),
            Arc::clone(&chunker),
            config.chunk_size(),
            Arc::clone(&workers),
        ));
        let rescanner = Arc::new(Rescanner::new(Arc::clone(&catalog), root.clone()));
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&catalog),
            Arc::clone(&chunker),
            Arc::clone(&uploader),
            Arc::clone(&rescanner),
            token,
        ));

        Ok(Self {
            config,
            root,
            catalog,
            remote,
            chunker,
            uploader,
            downloader,
            rescanner,
            engine,
        })
    }
}
