//! Slack Web API calls made by the bridge: bot identity lookup, Socket Mode
//! URL allocation and reply posting.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::slack_helpers::{error_excerpt, retry_after, SlackRetryPolicy};

const RETRY_ATTEMPT_HEADER: &str = "x-mirrorbot-retry-attempt";

/// Every Web API response carries `ok` and, on failure, an `error` code.
#[derive(Debug, Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    payload: T,
}

#[derive(Debug, Default, Deserialize)]
struct AuthTestPayload {
    user: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectionsOpenPayload {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PostMessagePayload {
    channel: Option<String>,
    ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SlackBotIdentity {
    pub(crate) user: String,
    pub(crate) user_id: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SlackPostedMessage {
    pub(crate) channel: String,
    pub(crate) ts: String,
}

/// Which credential a Web API method requires.
#[derive(Debug, Clone, Copy)]
enum SlackToken {
    /// `xapp-` token, only accepted by `apps.connections.open`.
    App,
    /// `xoxb-` token for everything the bot does as itself.
    Bot,
}

#[derive(Clone)]
pub(crate) struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: String,
    bot_token: String,
    retry: SlackRetryPolicy,
}

impl SlackApiClient {
    pub(crate) fn new(
        api_base: String,
        app_token: String,
        bot_token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("mirrorbot-slack-bridge"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token: app_token.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
            retry: SlackRetryPolicy::new(retry_max_attempts, retry_base_delay_ms),
        })
    }

    pub(crate) async fn auth_test(&self) -> Result<SlackBotIdentity> {
        let payload: AuthTestPayload = self.call("auth.test", SlackToken::Bot, None).await?;
        let user_id = non_blank(payload.user_id)
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))?;
        Ok(SlackBotIdentity {
            user: payload.user.unwrap_or_default(),
            user_id,
        })
    }

    /// Allocates a fresh single-use Socket Mode WebSocket URL.
    pub(crate) async fn open_socket_connection(&self) -> Result<String> {
        let payload: ConnectionsOpenPayload = self
            .call("apps.connections.open", SlackToken::App, None)
            .await?;
        non_blank(payload.url)
            .ok_or_else(|| anyhow!("slack apps.connections.open did not return url"))
    }

    /// Posts a channel message with link and media previews disabled.
    pub(crate) async fn post_message(
        &self,
        channel: &str,
        text: &str,
    ) -> Result<SlackPostedMessage> {
        let body = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        let payload: PostMessagePayload = self
            .call("chat.postMessage", SlackToken::Bot, Some(&body))
            .await?;
        Ok(SlackPostedMessage {
            channel: payload.channel.unwrap_or_else(|| channel.to_string()),
            ts: payload
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    /// Calls a Web API method and unwraps Slack's `ok`/`error` envelope.
    async fn call<T>(&self, method: &str, token: SlackToken, body: Option<&Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let envelope: SlackEnvelope<T> = self.send_with_retry(method, token, body).await?;
        if !envelope.ok {
            bail!(
                "slack {method} failed: {}",
                envelope.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(envelope.payload)
    }

    async fn send_with_retry<T>(
        &self,
        method: &str,
        token: SlackToken,
        body: Option<&Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{method}", self.api_base);
        let bearer = match token {
            SlackToken::App => &self.app_token,
            SlackToken::Bot => &self.bot_token,
        };
        let mut attempt = 0_usize;
        loop {
            attempt += 1;
            let mut request = self
                .http
                .post(&url)
                .bearer_auth(bearer)
                .header(RETRY_ATTEMPT_HEADER, (attempt - 1).to_string());
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(error) if self.retry.retries_transport(attempt, &error) => {
                    tracing::debug!(method, attempt, error = %error, "retrying slack api request");
                    tokio::time::sleep(self.retry.delay_before_retry(attempt, None)).await;
                    continue;
                }
                Err(error) => {
                    return Err(error).with_context(|| format!("slack api {method} request failed"))
                }
            };

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<T>()
                    .await
                    .with_context(|| format!("failed to decode slack {method}"));
            }

            let wait = retry_after(response.headers());
            if self.retry.retries_status(attempt, status) {
                tracing::debug!(
                    method,
                    attempt,
                    status = status.as_u16(),
                    "retrying slack api request"
                );
                tokio::time::sleep(self.retry.delay_before_retry(attempt, wait)).await;
                continue;
            }
            let text = response.text().await.unwrap_or_default();
            bail!(
                "slack api {method} failed with status {}: {}",
                status.as_u16(),
                error_excerpt(&text)
            );
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
