// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Mirrorbox Domain
//!
//! Core business logic of the mirrorbox file synchronization client. This
//! crate is independent of databases, the filesystem watcher, and the HTTP
//! stack; it defines the vocabulary the rest of the workspace speaks.
//!
//! ## Module Structure
//!
//! - `entities` — objects with identity that persist through state changes:
//!   `Folder`, `FileEntry`, `Chunk`
//! - `value_objects` — immutable, self-validating values: typed identifiers,
//!   `ContentHash`, `ChunkSize`, `SyncPath`, `PartNumber`, chunk manifests
//! - `events` — the canonical change-event stream produced by the watcher
//!   and consumed by the sync engine
//! - `services` — stateless domain logic: checksum computation, media-type
//!   detection
//! - `repositories` — persistence ports implemented by the infrastructure
//!   layer (the catalog)
//! - `error` — the `SyncError` domain error type
//!
//! ## Key Invariants
//!
//! The domain layer enforces the catalog invariants:
//!
//! - Folder paths are unique and form a tree rooted at the sync root; a
//!   parent's path is always a strict prefix of its children's paths
//! - File paths are unique; every committed file carries a 64-character
//!   lowercase-hex SHA-256 of its full content
//! - A file's chunks carry contiguous 1-based part numbers and 64-character
//!   lowercase-hex SHA-256 fingerprints; a chunk's byte range is fully
//!   determined by its part number and the fixed chunk size

pub mod entities;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod value_objects;

// Re-export commonly used types for convenient access
pub use entities::{Chunk, FileEntry, Folder};
pub use error::SyncError;
pub use events::{ChangeEvent, PathKind};
pub use repositories::Catalog;
pub use value_objects::{
    ChunkId, ChunkManifestEntry, ChunkSize, ContentHash, FileId, FileManifest, FolderId,
    PartNumber, SyncPath,
};
