//! Inbound message handling: mention gating, release lookup, and reply.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mirrorbot_release::ReleaseLookup;
use tracing::{debug, info};

use crate::slack_helpers::contains_ignore_case;

pub const DEFAULT_MENTION_KEYWORD: &str = "@mirrorbot";

#[derive(Debug, Clone, PartialEq, Eq)]
/// One text message delivered by the chat transport.
pub struct InboundMessage {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
}

#[async_trait]
/// Trait contract for posting text back to a chat channel.
///
/// Implementations must disable link previews.
pub trait ReplySender: Send + Sync {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()>;
}

/// True when `text` mentions the bot by keyword or by platform mention tag.
///
/// Nothing qualifies while the bot user id is unknown.
pub fn contains_mention(text: &str, mention_keyword: &str, bot_user_id: &str) -> bool {
    if bot_user_id.is_empty() {
        return false;
    }
    (!mention_keyword.is_empty() && contains_ignore_case(text, mention_keyword))
        || contains_ignore_case(text, &format!("<@{bot_user_id}>"))
}

#[derive(Clone)]
pub struct MirrorMessageHandler {
    lookup: Arc<ReleaseLookup>,
    mention_keyword: String,
}

impl MirrorMessageHandler {
    pub fn new(lookup: Arc<ReleaseLookup>, mention_keyword: impl Into<String>) -> Self {
        Self {
            lookup,
            mention_keyword: mention_keyword.into(),
        }
    }

    pub fn should_respond(&self, message: &InboundMessage, bot_user_id: &str) -> bool {
        message.user_id != bot_user_id
            && contains_mention(&message.text, &self.mention_keyword, bot_user_id)
    }

    /// Handles one message, returning whether a reply was posted.
    pub async fn handle_message(
        &self,
        message: &InboundMessage,
        bot_user_id: &str,
        sender: &dyn ReplySender,
    ) -> Result<bool> {
        self.handle_message_at(message, bot_user_id, sender, Utc::now())
            .await
    }

    pub async fn handle_message_at(
        &self,
        message: &InboundMessage,
        bot_user_id: &str,
        sender: &dyn ReplySender,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if !self.should_respond(message, bot_user_id) {
            return Ok(false);
        }
        info!(
            channel = message.channel_id.as_str(),
            user = message.user_id.as_str(),
            text = message.text.as_str(),
            "received mention"
        );

        let Some(reply) = self.lookup.reply_for_message(&message.text, now).await else {
            debug!(
                channel = message.channel_id.as_str(),
                "mention carried no version token"
            );
            return Ok(false);
        };
        sender
            .send_text(&message.channel_id, &reply)
            .await
            .with_context(|| format!("failed to post reply to channel {}", message.channel_id))?;
        Ok(true)
    }
}
