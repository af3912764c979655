//! Slack transport for mirrorbot.
//!
//! Connects over Socket Mode, filters channel messages down to bot mentions,
//! and posts release lookup replies through the Web API.

pub mod message_handler;
mod slack_helpers;
pub mod slack_runtime;

pub use message_handler::{
    contains_mention, InboundMessage, MirrorMessageHandler, ReplySender, DEFAULT_MENTION_KEYWORD,
};
pub use slack_runtime::{run_slack_bridge, SlackBridgeRuntimeConfig, SLACK_API_BASE};
