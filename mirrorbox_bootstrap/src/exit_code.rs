// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Codes
//!
//! Unix sysexits-style exit codes for the CLI. The mapping is coarse on
//! purpose: operators script against these values, so they stay stable
//! even as error messages evolve.

use std::fmt;

/// Process exit codes following the BSD sysexits convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Successful termination
    Ok = 0,
    /// Generic failure
    Failure = 1,
    /// Command line usage error
    Usage = 64,
    /// Input data error (bad paths, malformed responses)
    DataErr = 65,
    /// Service unavailable (files service unreachable)
    Unavailable = 69,
    /// Internal software error
    Software = 70,
    /// I/O error
    IoErr = 74,
    /// Configuration error
    Config = 78,
}

impl ExitCode {
    /// The raw process exit code value
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

/// Maps an application result to a process exit code, logging the error.
pub fn result_to_exit_code<E: fmt::Display>(result: Result<(), E>) -> std::process::ExitCode {
    match result {
        Ok(()) => ExitCode::Ok.into(),
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::Failure.into()
        }
    }
}
