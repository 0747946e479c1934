// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Mirrorbox
//!
//! Dropbox-style file synchronization client. A local sync root is
//! continuously mirrored into a content-addressed object store: the watcher
//! observes changes, the chunker splits files into fixed-size chunks with
//! SHA-256 fingerprints, the catalog records folders/files/chunks, and the
//! sync engine drives a three-phase multipart upload (prepare → parallel
//! presigned PUTs → confirm) against the remote files service. The
//! download path reverses the flow: presigned ranged GETs, fingerprint
//! verification, and reassembly.
//!
//! ## Layers
//!
//! - `application` — services (chunker, sync engine, uploader,
//!   downloader) and use cases (watch, sync once, restore, status)
//! - `infrastructure` — SQLite catalog, files-service HTTP client,
//!   filesystem watcher, configuration, logging, local HTTP API
//! - `presentation` — clap CLI definitions
//!
//! Domain types live in the `mirrorbox_domain` crate; process lifecycle
//! (signals, shutdown, exit codes) in `mirrorbox_bootstrap`.

pub mod application;
pub mod infrastructure;
pub mod presentation;
