//! The seam between the tracker and the chat platform.
//!
//! The tracker only knows the `ChatClient` trait and the platform-neutral
//! `Notice` model; rendering notices as embeds and talking to the actual
//! REST API is the client implementation's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Notice accent colors.
pub mod color {
    pub const BLURPLE: u32 = 0x5865F2;
    pub const RED: u32 = 0xED4245;
    pub const GREEN: u32 = 0x57F287;
    pub const GOLD: u32 = 0xFEE75C;
}

/// Identifier of the channel notices are posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a previously posted channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A platform-neutral notice, rendered as an embed by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Embed title.
    pub title: String,
    /// Optional body text.
    pub description: Option<String>,
    /// Optional stream link, rendered prominently.
    pub link: Option<String>,
    /// Accent color.
    pub color: u32,
}

impl Notice {
    /// Notice for a stream going live.
    #[must_use]
    pub fn live(stream: &str, url: &str) -> Self {
        Self {
            title: format!("\u{1F4FA} {stream} is live"),
            description: None,
            link: Some(url.to_string()),
            color: color::BLURPLE,
        }
    }

    /// Notice for a stream that ended.
    #[must_use]
    pub fn offline(stream: &str) -> Self {
        Self {
            title: format!("\u{1F534} {stream} Offline"),
            description: Some("Stream Ended".to_string()),
            link: None,
            color: color::RED,
        }
    }
}

/// Chat client errors.
///
/// None of these are fatal to the relay; the tracker logs and moves on.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The message or channel no longer exists.
    #[error("message or channel not found")]
    NotFound,

    /// Missing permission to act on the channel.
    #[error("missing permission for the channel")]
    Forbidden,

    /// The chat API rejected the request.
    #[error("chat API error: status {status}")]
    Api { status: u16 },

    /// Failed to reach the chat service.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ChatError {
    /// Whether this error means the target was already gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Outbound operations against the chat platform.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post a notice to a channel, returning a handle for later edits.
    async fn post_notice(
        &self,
        channel: ChannelId,
        notice: &Notice,
    ) -> Result<MessageHandle, ChatError>;

    /// Replace the content of a previously posted notice.
    async fn edit_notice(
        &self,
        channel: ChannelId,
        message: MessageHandle,
        notice: &Notice,
    ) -> Result<(), ChatError>;

    /// Delete a previously posted notice.
    async fn delete_notice(
        &self,
        channel: ChannelId,
        message: MessageHandle,
    ) -> Result<(), ChatError>;

    /// Measure a round trip to the chat service.
    async fn ping(&self) -> Result<Duration, ChatError>;
}
