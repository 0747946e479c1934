// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Stateless domain services.

pub mod checksum;
pub mod media_type;

pub use checksum::StreamingChecksum;
pub use media_type::media_type_for_path;
