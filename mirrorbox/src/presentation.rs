// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dropbox-style file synchronization client.
#[derive(Debug, Parser)]
#[command(name = "mirrorbox", version, about = "Mirror a local directory into a content-addressed object store")]
pub struct Cli {
    /// Optional TOML configuration file (environment variables override it)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose logging (debug level for mirrorbox crates)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon: watch the sync root and mirror changes continuously
    Watch,

    /// Run one full scan-and-sync pass, then exit
    Sync,

    /// Download a synced file and reassemble it locally
    Restore {
        /// File id (uuid) or canonical path inside the sync root
        target: String,

        /// Destination path for the reassembled file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print a catalog and service status summary
    Status,
}
