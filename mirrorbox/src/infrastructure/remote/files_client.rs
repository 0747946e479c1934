// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Files Service Client
//!
//! Typed HTTP client for the remote files service and the presigned PUT/GET
//! traffic it brokers. Transient failures (connection errors, timeouts,
//! 408/429/5xx) are retried with exponential backoff and jitter up to the
//! configured attempt limit; a `success:false` body or any other 4xx is
//! surfaced as `SyncError::RemoteService` without retry.
//!
//! The [`RemoteFiles`] trait is the seam the sync engine and downloader
//! depend on; tests substitute an in-process mock service behind the same
//! client by pointing the base URL at it.

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use mirrorbox_domain::SyncError;

use super::wire::{
    ConfirmRequest, ConfirmResponse, DownloadRequest, DownloadResponse, HealthResponse,
    PrepareUploadRequest, PrepareUploadResponse,
};

/// Base delay for the exponential backoff schedule.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound on a single backoff delay.
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Port over the files service wire contract plus presigned blob I/O.
#[async_trait]
pub trait RemoteFiles: Send + Sync {
    /// `POST /files` — request presigned upload URLs for a file's chunks.
    async fn prepare_upload(
        &self,
        request: &PrepareUploadRequest,
    ) -> Result<PrepareUploadResponse, SyncError>;

    /// `POST /files/confirm` — complete the multipart upload. The service
    /// is idempotent on identical confirmations.
    async fn confirm_upload(&self, request: &ConfirmRequest) -> Result<(), SyncError>;

    /// `POST /files/download` — request presigned download URLs.
    async fn request_download(
        &self,
        request: &DownloadRequest,
    ) -> Result<DownloadResponse, SyncError>;

    /// PUT a chunk's bytes to a presigned URL, returning the `ETag` header
    /// when the store provides one.
    async fn put_chunk(&self, presigned_url: &str, bytes: Vec<u8>) -> Result<Option<String>, SyncError>;

    /// Ranged GET against a presigned URL. `range_header` is sent bit-exact
    /// when present.
    async fn get_chunk(
        &self,
        presigned_url: &str,
        range_header: Option<&str>,
    ) -> Result<Vec<u8>, SyncError>;

    /// `GET /health` — true when the service reports healthy.
    async fn health(&self) -> Result<bool, SyncError>;
}

/// Reqwest-backed implementation of [`RemoteFiles`].
pub struct FilesServiceClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl FilesServiceClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::transport(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Backoff delay before retry `attempt` (1-based), with jitter.
    fn backoff_delay(attempt: u32) -> Duration {
        let exp = RETRY_BASE_DELAY.saturating_mul(1 << attempt.min(8));
        let capped = exp.min(RETRY_MAX_DELAY);
        let jitter = rand::rng().random_range(0..=capped.as_millis() as u64 / 4);
        capped + Duration::from_millis(jitter)
    }

    /// True for statuses worth another attempt.
    fn is_retryable_status(status: StatusCode) -> bool {
        status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
    }

    fn classify_send_error(e: reqwest::Error) -> SyncError {
        if e.is_timeout() {
            SyncError::Timeout(e.to_string())
        } else {
            SyncError::transport(e.to_string())
        }
    }

    /// POSTs a JSON body and decodes a JSON response with the retry policy.
    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, SyncError> {
        let url = self.url(path);
        let mut last_err = SyncError::transport("no attempts made");

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Self::backoff_delay(attempt);
                debug!(url = %url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                tokio::time::sleep(delay).await;
            }

            let response = match self.http.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    let err = Self::classify_send_error(e);
                    if err.is_transient() && attempt < self.max_retries {
                        warn!(url = %url, attempt, error = %err, "request failed, will retry");
                        last_err = err;
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status();
            if Self::is_retryable_status(status) {
                last_err = SyncError::transport(format!("{} returned {}", url, status));
                if attempt < self.max_retries {
                    warn!(url = %url, attempt, %status, "retryable status");
                    continue;
                }
                return Err(last_err);
            }
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(SyncError::remote(format!("{} returned {}: {}", url, status, text)));
            }

            return response
                .json::<R>()
                .await
                .map_err(|e| SyncError::Serialization(format!("decoding {} response: {}", url, e)));
        }

        Err(last_err)
    }
}

#[async_trait]
impl RemoteFiles for FilesServiceClient {
    async fn prepare_upload(
        &self,
        request: &PrepareUploadRequest,
    ) -> Result<PrepareUploadResponse, SyncError> {
        let response: PrepareUploadResponse = self.post_json("/files", request).await?;
        if response.presigned_urls.len() as u32 != request.chunk_count {
            return Err(SyncError::remote(format!(
                "service returned {} presigned urls for {} chunks",
                response.presigned_urls.len(),
                request.chunk_count
            )));
        }
        Ok(response)
    }

    async fn confirm_upload(&self, request: &ConfirmRequest) -> Result<(), SyncError> {
        let response: ConfirmResponse = self.post_json("/files/confirm", request).await?;
        if !response.success {
            return Err(SyncError::remote(
                response
                    .error_message
                    .unwrap_or_else(|| "confirm rejected without message".to_string()),
            ));
        }
        Ok(())
    }

    async fn request_download(
        &self,
        request: &DownloadRequest,
    ) -> Result<DownloadResponse, SyncError> {
        let response: DownloadResponse = self.post_json("/files/download", request).await?;
        if !response.success {
            return Err(SyncError::remote(
                response
                    .error_message
                    .unwrap_or_else(|| "download rejected without message".to_string()),
            ));
        }
        Ok(response)
    }

    async fn put_chunk(
        &self,
        presigned_url: &str,
        bytes: Vec<u8>,
    ) -> Result<Option<String>, SyncError> {
        let mut last_err = SyncError::transport("no attempts made");

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Self::backoff_delay(attempt)).await;
            }

            let response = match self
                .http
                .put(presigned_url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes.clone())
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    let err = Self::classify_send_error(e);
                    if err.is_transient() && attempt < self.max_retries {
                        warn!(attempt, error = %err, "chunk PUT failed, will retry");
                        last_err = err;
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status();
            if Self::is_retryable_status(status) {
                last_err = SyncError::transport(format!("chunk PUT returned {}", status));
                if attempt < self.max_retries {
                    continue;
                }
                return Err(last_err);
            }
            if !status.is_success() {
                return Err(SyncError::remote(format!("chunk PUT returned {}", status)));
            }

            let etag = response
                .headers()
                .get(reqwest::header::ETAG)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim_matches('"').to_string());
            return Ok(etag);
        }

        Err(last_err)
    }

    async fn get_chunk(
        &self,
        presigned_url: &str,
        range_header: Option<&str>,
    ) -> Result<Vec<u8>, SyncError> {
        let mut last_err = SyncError::transport("no attempts made");

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Self::backoff_delay(attempt)).await;
            }

            let mut request = self.http.get(presigned_url);
            if let Some(range) = range_header {
                request = request.header(reqwest::header::RANGE, range);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    let err = Self::classify_send_error(e);
                    if err.is_transient() && attempt < self.max_retries {
                        warn!(attempt, error = %err, "chunk GET failed, will retry");
                        last_err = err;
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status();
            if Self::is_retryable_status(status) {
                last_err = SyncError::transport(format!("chunk GET returned {}", status));
                if attempt < self.max_retries {
                    continue;
                }
                return Err(last_err);
            }
            // 200 for whole-object fetches, 206 for ranged ones
            if !(status.is_success() || status == StatusCode::PARTIAL_CONTENT) {
                return Err(SyncError::remote(format!("chunk GET returned {}", status)));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| SyncError::transport(format!("reading chunk body: {}", e)))?;
            return Ok(bytes.to_vec());
        }

        Err(last_err)
    }

    async fn health(&self) -> Result<bool, SyncError> {
        let url = self.url("/health");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(Self::classify_send_error)?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let body: HealthResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Serialization(format!("decoding health response: {}", e)))?;
        Ok(body.status == "healthy")
    }
}
