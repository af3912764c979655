use std::time::Duration;

use anyhow::{bail, Result};
use mirrorbot_release::ReleaseLookupConfig;
use mirrorbot_slack_runtime::SlackBridgeRuntimeConfig;

use crate::cli_args::Cli;

fn resolve_non_empty_cli_value(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub(crate) fn validate_mirrorbot_cli(cli: &Cli) -> Result<()> {
    if resolve_non_empty_cli_value(Some(&cli.slack_bot_token)).is_none() {
        bail!("--slack-bot-token (or SLACK_BOT_TOKEN) must not be blank");
    }
    if resolve_non_empty_cli_value(Some(&cli.slack_app_token)).is_none() {
        bail!("--slack-app-token (or SLACK_APP_TOKEN) must not be blank");
    }
    if cli.version_prefix.trim().is_empty() {
        bail!("--version-prefix must not be blank");
    }
    if !cli
        .status_streams
        .iter()
        .any(|stream| !stream.trim().is_empty())
    {
        bail!("--status-streams must name at least one release stream");
    }
    if cli.request_timeout_ms == 0 {
        bail!("--request-timeout-ms must be greater than 0");
    }
    if cli.slack_processed_event_cap == 0 {
        bail!("--slack-processed-event-cap must be greater than 0");
    }
    if cli.slack_reconnect_delay_ms == 0 {
        bail!("--slack-reconnect-delay-ms must be greater than 0");
    }
    if cli.slack_retry_max_attempts == 0 {
        bail!("--slack-retry-max-attempts must be greater than 0");
    }
    if cli.slack_retry_base_delay_ms == 0 {
        bail!("--slack-retry-base-delay-ms must be greater than 0");
    }
    Ok(())
}

pub(crate) fn build_release_lookup_config(cli: &Cli) -> ReleaseLookupConfig {
    ReleaseLookupConfig {
        mirror_base_url: cli.mirror_base_url.trim().to_string(),
        release_status_base_url: cli.release_status_base_url.trim().to_string(),
        version_prefix: cli.version_prefix.trim().to_string(),
        status_streams: cli
            .status_streams
            .iter()
            .map(|stream| stream.trim())
            .filter(|stream| !stream.is_empty())
            .map(str::to_string)
            .collect(),
        request_timeout_ms: cli.request_timeout_ms,
    }
}

pub(crate) fn build_slack_bridge_config(cli: &Cli) -> SlackBridgeRuntimeConfig {
    SlackBridgeRuntimeConfig {
        api_base: cli.slack_api_base.trim().to_string(),
        app_token: cli.slack_app_token.trim().to_string(),
        bot_token: cli.slack_bot_token.trim().to_string(),
        bot_user_id: resolve_non_empty_cli_value(cli.slack_bot_user_id.as_deref()),
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.slack_retry_max_attempts,
        retry_base_delay_ms: cli.slack_retry_base_delay_ms,
        reconnect_delay: Duration::from_millis(cli.slack_reconnect_delay_ms),
        processed_event_cap: cli.slack_processed_event_cap,
    }
}
