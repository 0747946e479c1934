// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! 1-based chunk position within a file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SyncError;

/// 1-based position of a chunk within its file.
///
/// Within a file, part numbers form the contiguous set {1, …, N}. The value
/// participates in the byte-range derivation together with [`ChunkSize`]
/// (`crate::ChunkSize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartNumber(u32);

impl PartNumber {
    /// Creates a part number, rejecting zero.
    pub fn new(value: u32) -> Result<Self, SyncError> {
        if value == 0 {
            return Err(SyncError::InvalidChunk("part numbers are 1-based".into()));
        }
        Ok(Self(value))
    }

    /// The first part of any file.
    pub const FIRST: PartNumber = PartNumber(1);

    /// The raw 1-based value.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// The next part number.
    pub fn next(&self) -> PartNumber {
        PartNumber(self.0 + 1)
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
