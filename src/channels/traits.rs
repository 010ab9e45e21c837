//! Channel Trait Definitions
//!
//! Platform-neutral inbound events, outbound responses and the sender trait
//! a chat platform implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use crate::replies::Visibility;

/// Error types for channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// Inbound chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Platform message ID
    pub id: String,

    /// Channel the message was posted in
    pub channel_id: String,

    /// Originating guild; `None` for direct messages
    pub guild_id: Option<String>,

    /// Sender identifier
    pub author_id: String,

    /// Sent by a bot account?
    pub author_is_bot: bool,

    /// Message text (empty when the platform withholds content)
    pub content: String,
}

impl ChannelMessage {
    /// Create a simple guild text message
    pub fn text(guild_id: &str, channel_id: &str, author_id: &str, content: &str) -> Self {
        Self {
            id: format!("{}-{}", channel_id, chrono::Utc::now().timestamp_millis()),
            channel_id: channel_id.to_string(),
            guild_id: Some(guild_id.to_string()),
            author_id: author_id.to_string(),
            author_is_bot: false,
            content: content.to_string(),
        }
    }
}

/// Slash-command invocation
#[derive(Debug, Clone, Default)]
pub struct CommandInvocation {
    pub name: String,

    /// String option values by option name
    pub options: HashMap<String, String>,

    pub user_id: String,

    /// `None` when invoked from a direct message
    pub guild_id: Option<String>,

    pub channel_id: String,
}

impl CommandInvocation {
    pub fn new(name: &str, user_id: &str, guild_id: Option<&str>, channel_id: &str) -> Self {
        Self {
            name: name.to_string(),
            options: HashMap::new(),
            user_id: user_id.to_string(),
            guild_id: guild_id.map(str::to_string),
            channel_id: channel_id.to_string(),
        }
    }

    pub fn with_option(mut self, name: &str, value: &str) -> Self {
        self.options.insert(name.to_string(), value.to_string());
        self
    }

    /// Non-blank option value
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .get(name)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Embed field
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich embed, rendered by the platform adapter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl Embed {
    pub fn new(title: &str, color: u32) -> Self {
        Self {
            title: title.to_string(),
            color,
            ..Default::default()
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn field(mut self, name: &str, value: &str, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: &str) -> Self {
        self.footer = Some(footer.to_string());
        self
    }

    pub fn timestamp_now(mut self) -> Self {
        self.timestamp = Some(chrono::Utc::now());
        self
    }
}

/// Response to a command invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelResponse {
    /// Plain text content
    pub content: Option<String>,

    /// Embed attachment
    pub embed: Option<Embed>,

    /// Public or ephemeral
    pub visibility: Visibility,
}

impl ChannelResponse {
    pub fn text(content: &str, visibility: Visibility) -> Self {
        Self {
            content: Some(content.to_string()),
            embed: None,
            visibility,
        }
    }

    /// Private error notice
    pub fn error(message: &str) -> Self {
        Self::text(&format!("❌ {}", message), Visibility::Private)
    }

    pub fn embed(embed: Embed, visibility: Visibility) -> Self {
        Self {
            content: None,
            embed: Some(embed),
            visibility,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        self.visibility.is_ephemeral()
    }
}

/// Outbound message delivery - implement for each platform
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name identifier
    fn name(&self) -> &str;

    /// Post `content` as a reply referencing `message_id`
    async fn send_reply(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<String, ChannelError>;

    /// Post `content` as a plain message
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_option_is_missing() {
        let invocation = CommandInvocation::new("reply", "U1", Some("G1"), "C1")
            .with_option("trigger", "hi")
            .with_option("response", "   ");

        assert_eq!(invocation.option("trigger"), Some("hi"));
        assert_eq!(invocation.option("response"), None);
        assert_eq!(invocation.option("mode"), None);
    }

    #[test]
    fn test_error_response_is_private() {
        let response = ChannelResponse::error("nope");
        assert_eq!(response.content.as_deref(), Some("❌ nope"));
        assert!(response.is_ephemeral());
    }
}
