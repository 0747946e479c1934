// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Checksum
//!
//! Incremental SHA-256 used by the chunker to compute the whole-file hash
//! and per-chunk fingerprints in a single pass over the data, without
//! buffering the file in memory.

use sha2::{Digest, Sha256};

use crate::value_objects::ContentHash;

/// Incremental SHA-256 hasher producing a [`ContentHash`].
pub struct StreamingChecksum {
    hasher: Sha256,
    bytes_processed: u64,
}

impl StreamingChecksum {
    /// Starts a fresh digest.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            bytes_processed: 0,
        }
    }

    /// Feeds more bytes into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.bytes_processed += bytes.len() as u64;
    }

    /// Total bytes fed so far.
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Finalizes and returns the hash, consuming the hasher.
    pub fn finalize(self) -> ContentHash {
        ContentHash::from_digest(self.hasher.finalize())
    }
}

impl Default for StreamingChecksum {
    fn default() -> Self {
        Self::new()
    }
}
