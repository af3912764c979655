//! Slack Socket Mode runtime that receives message events and posts release replies.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use crate::message_handler::{InboundMessage, MirrorMessageHandler, ReplySender};

mod slack_api_client;
mod slack_event_window;

use slack_api_client::SlackApiClient;
use slack_event_window::ProcessedEventWindow;

pub const SLACK_API_BASE: &str = "https://slack.com/api";
const SHUTDOWN_REPLY_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
/// Runtime configuration for the Slack Socket Mode transport loop.
pub struct SlackBridgeRuntimeConfig {
    pub api_base: String,
    pub app_token: String,
    pub bot_token: String,
    pub bot_user_id: Option<String>,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub reconnect_delay: Duration,
    pub processed_event_cap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct SlackSocketEnvelope {
    #[serde(default)]
    envelope_id: String,
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SlackMessageEvent {
    key: String,
    event_id: String,
    channel_id: String,
    user_id: String,
    text: String,
}

impl SlackMessageEvent {
    fn to_inbound(&self) -> InboundMessage {
        InboundMessage {
            channel_id: self.channel_id.clone(),
            user_id: self.user_id.clone(),
            text: self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Reconnect,
}

#[async_trait]
impl ReplySender for SlackApiClient {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()> {
        let posted = self.post_message(channel_id, text).await?;
        debug!(
            channel = posted.channel.as_str(),
            ts = posted.ts.as_str(),
            "posted reply"
        );
        Ok(())
    }
}

/// Runs the Slack bridge transport loop until ctrl-c.
pub async fn run_slack_bridge(
    config: SlackBridgeRuntimeConfig,
    handler: MirrorMessageHandler,
) -> Result<()> {
    let mut runtime = SlackBridgeRuntime::new(config, handler).await?;
    runtime.run().await
}

struct SlackBridgeRuntime {
    config: SlackBridgeRuntimeConfig,
    slack_client: SlackApiClient,
    handler: Arc<MirrorMessageHandler>,
    bot_user_id: String,
    processed: ProcessedEventWindow,
    reply_tasks: JoinSet<()>,
}

impl SlackBridgeRuntime {
    async fn new(config: SlackBridgeRuntimeConfig, handler: MirrorMessageHandler) -> Result<Self> {
        let slack_client = SlackApiClient::new(
            config.api_base.clone(),
            config.app_token.clone(),
            config.bot_token.clone(),
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;

        let bot_user_id = match config.bot_user_id.clone() {
            Some(user_id) if !user_id.trim().is_empty() => user_id.trim().to_string(),
            _ => {
                let identity = slack_client
                    .auth_test()
                    .await
                    .context("slack authentication failed")?;
                info!(
                    user = identity.user.as_str(),
                    user_id = identity.user_id.as_str(),
                    "logged in as bot user"
                );
                identity.user_id
            }
        };
        let processed = ProcessedEventWindow::new(config.processed_event_cap);

        Ok(Self {
            config,
            slack_client,
            handler: Arc::new(handler),
            bot_user_id,
            processed,
            reply_tasks: JoinSet::new(),
        })
    }

    async fn run(&mut self) -> Result<()> {
        loop {
            let socket_url = match self.slack_client.open_socket_connection().await {
                Ok(url) => url,
                Err(error) => {
                    warn!(%error, "slack bridge failed to open socket connection");
                    if self.wait_for_reconnect().await {
                        break;
                    }
                    continue;
                }
            };

            info!("slack bridge socket connected; mirrorbot is running in socket mode");
            match self.run_socket_session(&socket_url).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("slack bridge shutdown requested");
                    break;
                }
                Ok(SessionEnd::Reconnect) => {
                    info!("slack bridge socket closed; reconnecting");
                }
                Err(error) => {
                    warn!(error = %format!("{error:#}"), "slack bridge socket session error");
                }
            }

            if self.wait_for_reconnect().await {
                break;
            }
        }

        self.drain_pending_replies(SHUTDOWN_REPLY_GRACE).await;
        Ok(())
    }

    /// Sleeps for the reconnect delay; returns true when ctrl-c arrived first.
    async fn wait_for_reconnect(&self) -> bool {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("slack bridge shutdown requested");
                true
            }
            _ = tokio::time::sleep(self.config.reconnect_delay) => false,
        }
    }

    async fn run_socket_session(&mut self, socket_url: &str) -> Result<SessionEnd> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .with_context(|| "failed to connect slack socket mode websocket")?;
        let (mut sink, mut source) = stream.split();

        loop {
            self.drain_finished_replies();

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return Ok(SessionEnd::Shutdown);
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SessionEnd::Reconnect);
                    };
                    let message = message_result.context("failed reading slack websocket message")?;
                    let Some(envelope) = parse_socket_envelope(message)? else {
                        continue;
                    };
                    if let Some(end) = self.dispatch_envelope(&mut sink, &envelope).await? {
                        return Ok(end);
                    }
                }
            }
        }
    }

    /// Acks `envelope`, then routes it; `Some` ends the current socket session.
    async fn dispatch_envelope<S>(
        &mut self,
        sink: &mut S,
        envelope: &SlackSocketEnvelope,
    ) -> Result<Option<SessionEnd>>
    where
        S: futures_util::Sink<WsMessage> + Unpin,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        if !envelope.envelope_id.is_empty() {
            ack_envelope(sink, &envelope.envelope_id).await?;
        }
        match envelope.envelope_type.as_str() {
            "disconnect" => {
                info!("slack requested socket disconnect");
                return Ok(Some(SessionEnd::Reconnect));
            }
            "hello" => debug!("slack socket hello received"),
            _ => {
                if let Err(error) = self.handle_envelope(envelope) {
                    warn!(
                        envelope_id = envelope.envelope_id.as_str(),
                        error = %format!("{error:#}"),
                        "failed to handle slack envelope"
                    );
                }
            }
        }
        Ok(None)
    }

    fn handle_envelope(&mut self, envelope: &SlackSocketEnvelope) -> Result<()> {
        let Some(event) = normalize_socket_envelope(envelope)? else {
            return Ok(());
        };
        if !self.processed.mark_processed(&event.key) {
            debug!(key = event.key.as_str(), "skipping duplicate slack event");
            return Ok(());
        }

        let message = event.to_inbound();
        if !self.handler.should_respond(&message, &self.bot_user_id) {
            return Ok(());
        }

        let handler = Arc::clone(&self.handler);
        let slack_client = self.slack_client.clone();
        let bot_user_id = self.bot_user_id.clone();
        let event_id = event.event_id;
        self.reply_tasks.spawn(async move {
            if let Err(error) = handler
                .handle_message(&message, &bot_user_id, &slack_client)
                .await
            {
                warn!(
                    event_id = event_id.as_str(),
                    channel = message.channel_id.as_str(),
                    error = %format!("{error:#}"),
                    "failed to handle slack message"
                );
            }
        });
        Ok(())
    }

    fn drain_finished_replies(&mut self) {
        while let Some(joined) = self.reply_tasks.try_join_next() {
            if let Err(error) = joined {
                warn!(%error, "slack reply task panicked or was cancelled");
            }
        }
    }

    /// Waits up to `grace` for in-flight replies, then aborts the rest.
    async fn drain_pending_replies(&mut self, grace: Duration) {
        if self.reply_tasks.is_empty() {
            return;
        }
        info!(
            pending = self.reply_tasks.len(),
            "waiting for in-flight slack replies"
        );
        let finished = tokio::time::timeout(grace, async {
            while let Some(joined) = self.reply_tasks.join_next().await {
                if let Err(error) = joined {
                    warn!(%error, "slack reply task panicked or was cancelled");
                }
            }
        })
        .await;
        if finished.is_err() {
            warn!(
                pending = self.reply_tasks.len(),
                "abandoning slack replies still running at shutdown"
            );
            self.reply_tasks.shutdown().await;
        }
    }
}

async fn ack_envelope<S>(sink: &mut S, envelope_id: &str) -> Result<()>
where
    S: futures_util::Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let ack = json!({ "envelope_id": envelope_id }).to_string();
    sink.send(WsMessage::Text(ack.into()))
        .await
        .context("failed to send slack socket ack")
}

fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    match message {
        WsMessage::Text(text) => {
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Binary(bytes) => {
            let text =
                String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?;
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    #[serde(default)]
    event_id: String,
    event: SlackEventPayload,
}

#[derive(Debug, Deserialize)]
struct SlackEventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Message subtypes that still carry new text typed by a person.
const USER_MESSAGE_SUBTYPES: [&str; 3] = ["thread_broadcast", "file_share", "me_message"];

fn is_user_authored_subtype(subtype: Option<&str>) -> bool {
    match subtype {
        None => true,
        Some(subtype) => USER_MESSAGE_SUBTYPES.contains(&subtype),
    }
}

/// Extracts a user-authored message from an `events_api` envelope.
///
/// Edits, deletions, bot posts and other system subtypes are dropped.
fn normalize_socket_envelope(envelope: &SlackSocketEnvelope) -> Result<Option<SlackMessageEvent>> {
    if envelope.envelope_type != "events_api" {
        return Ok(None);
    }

    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack event callback payload")?;
    if callback.callback_type != "event_callback" {
        return Ok(None);
    }

    let event = callback.event;
    if event.event_type != "message" || !is_user_authored_subtype(event.subtype.as_deref()) {
        return Ok(None);
    }
    let user_id = match event.user {
        Some(user) if !user.trim().is_empty() => user,
        _ => return Ok(None),
    };
    let channel_id = match event.channel {
        Some(channel) if !channel.trim().is_empty() => channel,
        _ => return Ok(None),
    };
    let message_ts = match event.ts {
        Some(ts) if !ts.trim().is_empty() => ts,
        _ => return Ok(None),
    };

    let key = format!("{}:{}:{}", callback.event_id, channel_id, message_ts);
    Ok(Some(SlackMessageEvent {
        key,
        event_id: callback.event_id,
        channel_id,
        user_id,
        text: event.text.unwrap_or_default(),
    }))
}
