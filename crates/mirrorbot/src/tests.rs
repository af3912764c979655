use std::time::Duration;

use clap::Parser;

use crate::cli_args::Cli;
use crate::runtime_cli_validation::{
    build_release_lookup_config, build_slack_bridge_config, validate_mirrorbot_cli,
};

fn parse_cli_with_tokens(extra: &[&str]) -> Cli {
    let mut args = vec![
        "mirrorbot",
        "--slack-bot-token",
        "xoxb-test",
        "--slack-app-token",
        "xapp-test",
    ];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args).expect("parse cli")
}

#[test]
fn unit_cli_defaults_match_public_endpoints() {
    let cli = parse_cli_with_tokens(&[]);
    assert_eq!(cli.slack_api_base, "https://slack.com/api");
    assert_eq!(
        cli.mirror_base_url,
        "https://mirror.openshift.com/pub/openshift-v4/clients/"
    );
    assert_eq!(cli.version_prefix, "4.");
    assert_eq!(cli.mention_keyword, "@mirrorbot");
    assert_eq!(
        cli.status_streams,
        vec!["4-dev-preview".to_string(), "4-stable".to_string()]
    );
    assert_eq!(cli.request_timeout_ms, 10_000);
    assert_eq!(cli.slack_processed_event_cap, 1_024);
    assert!(validate_mirrorbot_cli(&cli).is_ok());
}

#[test]
fn functional_cli_flags_flow_into_runtime_configs() {
    let cli = parse_cli_with_tokens(&[
        "--slack-bot-user-id",
        " UBOT ",
        "--mirror-base-url",
        "http://127.0.0.1:8080/clients/",
        "--status-streams",
        "4-stable, 4-dev-preview",
        "--slack-reconnect-delay-ms",
        "250",
    ]);
    validate_mirrorbot_cli(&cli).expect("valid cli");

    let lookup = build_release_lookup_config(&cli);
    assert_eq!(lookup.mirror_base_url, "http://127.0.0.1:8080/clients/");
    assert_eq!(
        lookup.status_streams,
        vec!["4-stable".to_string(), "4-dev-preview".to_string()]
    );

    let slack = build_slack_bridge_config(&cli);
    assert_eq!(slack.bot_user_id.as_deref(), Some("UBOT"));
    assert_eq!(slack.bot_token, "xoxb-test");
    assert_eq!(slack.app_token, "xapp-test");
    assert_eq!(slack.reconnect_delay, Duration::from_millis(250));
}

#[test]
fn regression_blank_bot_user_id_falls_back_to_auth_lookup() {
    let cli = parse_cli_with_tokens(&["--slack-bot-user-id", "  "]);
    assert!(build_slack_bridge_config(&cli).bot_user_id.is_none());
}

#[test]
fn regression_validation_rejects_blank_tokens() {
    let cli = Cli::try_parse_from([
        "mirrorbot",
        "--slack-bot-token",
        "   ",
        "--slack-app-token",
        "xapp-test",
    ])
    .expect("parse cli");
    let error = validate_mirrorbot_cli(&cli).expect_err("blank bot token");
    assert!(error.to_string().contains("--slack-bot-token"));

    let cli = Cli::try_parse_from([
        "mirrorbot",
        "--slack-bot-token",
        "xoxb-test",
        "--slack-app-token",
        "",
    ])
    .expect("parse cli");
    let error = validate_mirrorbot_cli(&cli).expect_err("blank app token");
    assert!(error.to_string().contains("--slack-app-token"));
}

#[test]
fn regression_validation_rejects_zero_limits() {
    let cli = parse_cli_with_tokens(&["--slack-retry-max-attempts", "0"]);
    let error = validate_mirrorbot_cli(&cli).expect_err("zero retries");
    assert!(error
        .to_string()
        .contains("--slack-retry-max-attempts must be greater than 0"));

    let cli = parse_cli_with_tokens(&["--slack-processed-event-cap", "0"]);
    assert!(validate_mirrorbot_cli(&cli).is_err());
}

#[test]
fn regression_validation_rejects_empty_stream_list() {
    let cli = parse_cli_with_tokens(&["--status-streams", " , "]);
    let error = validate_mirrorbot_cli(&cli).expect_err("no streams");
    assert!(error.to_string().contains("--status-streams"));
}
