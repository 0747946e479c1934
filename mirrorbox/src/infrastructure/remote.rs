// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed wrapper over the remote files service and presigned URL traffic.

pub mod files_client;
pub mod wire;

pub use files_client::{FilesServiceClient, RemoteFiles};
