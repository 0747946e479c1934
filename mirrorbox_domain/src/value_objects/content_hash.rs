// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Content Hash Value Object
//!
//! A validated SHA-256 digest in lowercase hexadecimal form. Used both as a
//! whole-file `file_hash` and as a per-chunk `fingerprint` — the two differ
//! only in what bytes were hashed.
//!
//! ## Guarantees
//!
//! - Always exactly 64 lowercase hex characters once constructed
//! - Byte-identical inputs yield identical hashes
//! - Comparison is by value; the type is cheap to clone
//!
//! The hash of the empty byte string is well defined and is what a
//! zero-length file (or its single zero-length chunk) carries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::SyncError;

/// Length of a SHA-256 digest in hex characters.
pub const HASH_HEX_LEN: usize = 64;

/// SHA-256 digest rendered as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Computes the hash of a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps an already-computed digest, validating length and alphabet.
    ///
    /// # Errors
    /// Returns `SyncError::InvalidChunk` when the string is not exactly 64
    /// lowercase hex characters.
    pub fn parse(s: impl Into<String>) -> Result<Self, SyncError> {
        let s = s.into();
        if s.len() != HASH_HEX_LEN || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(SyncError::InvalidChunk(format!(
                "hash must be {} lowercase hex characters, got '{}'",
                HASH_HEX_LEN, s
            )));
        }
        Ok(Self(s))
    }

    /// Wraps a finalized SHA-256 digest.
    pub fn from_digest(digest: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(digest.as_ref()))
    }

    /// The hash as a hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
