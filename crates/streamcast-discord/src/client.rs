//! Discord REST client.

use crate::embed;
use async_trait::async_trait;
use reqwest::{header, Response, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use streamcast_core::chat::{ChannelId, ChatClient, ChatError, MessageHandle, Notice};
use tracing::debug;

/// Default Discord API base URL.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord REST client posting stream notices as embeds.
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// Create-message response; Discord snowflakes arrive as strings.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

fn transport(e: reqwest::Error) -> ChatError {
    ChatError::Transport(e.to_string())
}

impl DiscordClient {
    /// Create a client against the public Discord API.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DISCORD_API_BASE, token)
    }

    /// Create a client against a custom base URL (for tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    fn message_url(&self, channel: ChannelId, message: MessageHandle) -> String {
        format!("{}/channels/{}/messages/{}", self.base_url, channel, message)
    }

    fn check(response: Response) -> Result<Response, ChatError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ChatError::NotFound),
            StatusCode::FORBIDDEN => Err(ChatError::Forbidden),
            status => Err(ChatError::Api {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl ChatClient for DiscordClient {
    async fn post_notice(
        &self,
        channel: ChannelId,
        notice: &Notice,
    ) -> Result<MessageHandle, ChatError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel);
        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.auth())
            .json(&embed::render(notice))
            .send()
            .await
            .map_err(transport)?;

        let body: MessageResponse = Self::check(response)?.json().await.map_err(transport)?;
        let id = body
            .id
            .parse()
            .map_err(|_| ChatError::Transport(format!("non-numeric message id: {}", body.id)))?;

        debug!(channel = %channel, message = id, "Posted notice");
        Ok(MessageHandle(id))
    }

    async fn edit_notice(
        &self,
        channel: ChannelId,
        message: MessageHandle,
        notice: &Notice,
    ) -> Result<(), ChatError> {
        let response = self
            .http
            .patch(self.message_url(channel, message))
            .header(header::AUTHORIZATION, self.auth())
            .json(&embed::render(notice))
            .send()
            .await
            .map_err(transport)?;

        Self::check(response)?;
        debug!(channel = %channel, message = %message, "Edited notice");
        Ok(())
    }

    async fn delete_notice(
        &self,
        channel: ChannelId,
        message: MessageHandle,
    ) -> Result<(), ChatError> {
        let response = self
            .http
            .delete(self.message_url(channel, message))
            .header(header::AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(transport)?;

        Self::check(response)?;
        debug!(channel = %channel, message = %message, "Deleted notice");
        Ok(())
    }

    async fn ping(&self) -> Result<Duration, ChatError> {
        let url = format!("{}/gateway", self.base_url);
        let start = Instant::now();
        let response = self.http.get(&url).send().await.map_err(transport)?;
        Self::check(response)?;
        Ok(start.elapsed())
    }
}
