mod bootstrap_helpers;
mod cli_args;
mod runtime_cli_validation;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mirrorbot_release::ReleaseLookup;
use mirrorbot_slack_runtime::{run_slack_bridge, MirrorMessageHandler};
use tracing::info;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;
use crate::runtime_cli_validation::{
    build_release_lookup_config, build_slack_bridge_config, validate_mirrorbot_cli,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    validate_mirrorbot_cli(&cli)?;

    let lookup = ReleaseLookup::new(build_release_lookup_config(&cli))
        .context("failed to initialize release lookup")?;
    info!(
        mirror = lookup.config().mirror_base_url.as_str(),
        release_status = lookup.config().release_status_base_url.as_str(),
        streams = %lookup.config().status_streams.join(","),
        "starting mirrorbot"
    );
    let handler = MirrorMessageHandler::new(Arc::new(lookup), cli.mention_keyword.clone());

    run_slack_bridge(build_slack_bridge_config(&cli), handler).await
}

#[cfg(test)]
mod tests;
