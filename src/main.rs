// Entry point of the Drive publisher.
//
// **Architecture Overview:**
// - `core/` = Publishing logic (auth decisions, API description, upload rules)
// - `infra/` = Implementations of core traits (Google endpoints, local files)
// - `cli/` = Command-line adapter (arguments, logging, wiring)
//
// This file's job is to:
// 1. Load configuration
// 2. Set up logging
// 3. Hand off to the publish command and report its outcome

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use clap::Parser;
use std::process::ExitCode;

use crate::cli::config::{PublishArgs, PublisherConfig};
use crate::cli::{logging, publish_command};

fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "publish".to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let args = PublishArgs::parse();
    let config = PublisherConfig::from_args(args, &program_name());

    logging::init(&config.log_file)?;
    tracing::debug!(?config, "Starting publish");

    // Failures are reported through tracing only, so drive.log records them too.
    match publish_command::run(&config).await {
        Ok(outcome) => {
            tracing::info!("{}", publish_command::summary(&outcome, &config));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
