use clap::Parser;
use mirrorbot_release::{
    DEFAULT_VERSION_PREFIX, MIRROR_BASE_URL, RELEASE_LOOKUP_TIMEOUT_MS, RELEASE_STATUS_BASE_URL,
};
use mirrorbot_slack_runtime::{DEFAULT_MENTION_KEYWORD, SLACK_API_BASE};

#[derive(Debug, Parser)]
#[command(
    name = "mirrorbot",
    about = "Slack bot that reports the newest OpenShift release for a 4.xx version",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "slack-bot-token",
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API (xoxb-...)"
    )]
    pub(crate) slack_bot_token: String,

    #[arg(
        long = "slack-app-token",
        env = "SLACK_APP_TOKEN",
        hide_env_values = true,
        help = "Slack app-level token for Socket Mode (xapp-...)"
    )]
    pub(crate) slack_app_token: String,

    #[arg(
        long = "slack-bot-user-id",
        env = "MIRRORBOT_SLACK_BOT_USER_ID",
        help = "Optional bot user id; resolved through auth.test when omitted"
    )]
    pub(crate) slack_bot_user_id: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "MIRRORBOT_SLACK_API_BASE",
        default_value = SLACK_API_BASE,
        help = "Slack Web API base URL"
    )]
    pub(crate) slack_api_base: String,

    #[arg(
        long = "mirror-base-url",
        env = "MIRRORBOT_MIRROR_BASE_URL",
        default_value = MIRROR_BASE_URL,
        help = "Mirror clients directory holding the ocp and ocp-dev-preview folders"
    )]
    pub(crate) mirror_base_url: String,

    #[arg(
        long = "release-status-base-url",
        env = "MIRRORBOT_RELEASE_STATUS_BASE_URL",
        default_value = RELEASE_STATUS_BASE_URL,
        help = "Release-controller base URL used for the status API and release page links"
    )]
    pub(crate) release_status_base_url: String,

    #[arg(
        long = "status-streams",
        env = "MIRRORBOT_STATUS_STREAMS",
        value_delimiter = ',',
        default_value = "4-dev-preview,4-stable",
        help = "Release streams queried in order for build status and pull spec"
    )]
    pub(crate) status_streams: Vec<String>,

    #[arg(
        long = "version-prefix",
        env = "MIRRORBOT_VERSION_PREFIX",
        default_value = DEFAULT_VERSION_PREFIX,
        help = "Prefix a message token must start with to be treated as a version"
    )]
    pub(crate) version_prefix: String,

    #[arg(
        long = "mention-keyword",
        env = "MIRRORBOT_MENTION_KEYWORD",
        default_value = DEFAULT_MENTION_KEYWORD,
        help = "Case-insensitive literal that counts as a bot mention"
    )]
    pub(crate) mention_keyword: String,

    #[arg(
        long = "request-timeout-ms",
        env = "MIRRORBOT_REQUEST_TIMEOUT_MS",
        default_value_t = RELEASE_LOOKUP_TIMEOUT_MS,
        help = "Timeout applied to every mirror, release-controller, and Slack request"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "slack-retry-max-attempts",
        env = "MIRRORBOT_SLACK_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        help = "Maximum attempts for retryable slack api failures (429/5xx/transport)"
    )]
    pub(crate) slack_retry_max_attempts: usize,

    #[arg(
        long = "slack-retry-base-delay-ms",
        env = "MIRRORBOT_SLACK_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base backoff delay for slack api retries"
    )]
    pub(crate) slack_retry_base_delay_ms: u64,

    #[arg(
        long = "slack-reconnect-delay-ms",
        env = "MIRRORBOT_SLACK_RECONNECT_DELAY_MS",
        default_value_t = 2_000,
        help = "Delay before reconnecting after socket/session errors"
    )]
    pub(crate) slack_reconnect_delay_ms: u64,

    #[arg(
        long = "slack-processed-event-cap",
        env = "MIRRORBOT_SLACK_PROCESSED_EVENT_CAP",
        default_value_t = 1_024,
        help = "Maximum processed-event keys to retain for duplicate delivery protection"
    )]
    pub(crate) slack_processed_event_cap: usize,
}
