// /////////////////////////////////////////////////////////////////////////////
// Mirrorbox Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Mirrorbox entry point: parse the CLI, load configuration, wire the
//! service graph, and hand off to the selected use case.

use clap::Parser;

use mirrorbox::application::use_cases::{
    restore_file::RestoreFileUseCase, show_status::ShowStatusUseCase, sync_once::SyncOnceUseCase,
    watch::WatchUseCase, AppContext,
};
use mirrorbox::infrastructure::{config::SyncConfig, logging};
use mirrorbox::presentation::{Cli, Command};
use mirrorbox_bootstrap::result_to_exit_code;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    result_to_exit_code(run(cli).await)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SyncConfig::load(cli.config.as_deref())?;

    let coordinator = WatchUseCase::default_coordinator();
    let context = AppContext::build(config, coordinator.token()).await?;

    match cli.command {
        Command::Watch => WatchUseCase::new(context).execute(coordinator).await,
        Command::Sync => SyncOnceUseCase::new(context).execute().await,
        Command::Restore { target, output } => {
            RestoreFileUseCase::new(context).execute(&target, output).await
        }
        Command::Status => ShowStatusUseCase::new(context).execute().await,
    }
}
