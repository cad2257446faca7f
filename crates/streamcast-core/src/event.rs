//! Webhook callback events from the media server.
//!
//! The media server posts a JSON body to `/{action}` for every lifecycle
//! callback. Payload fields default to empty strings; the webhook contract
//! is forgiving by design.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Callback actions the media server can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Generic stream event.
    Stream,
    /// A stream started publishing.
    OnPublish,
    /// A stream stopped publishing.
    OnUnpublish,
}

impl CallbackAction {
    /// Get the action as the wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::OnPublish => "on_publish",
            Self::OnUnpublish => "on_unpublish",
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an action string is not a known callback.
#[derive(Debug, Error)]
#[error("unknown callback action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for CallbackAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream" => Ok(Self::Stream),
            "on_publish" => Ok(Self::OnPublish),
            "on_unpublish" => Ok(Self::OnUnpublish),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Raw JSON body of a media-server HTTP callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPayload {
    /// Callback action, also present in the body.
    #[serde(default)]
    pub action: String,
    /// Stream name.
    #[serde(default)]
    pub stream: String,
    /// Publish parameters (query string the publisher used).
    #[serde(default)]
    pub param: String,
    /// Server-relative stream URL path.
    #[serde(default)]
    pub stream_url: String,
}

/// A parsed event handed to the tracker.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    /// Action string from the body; unknown values are ignored downstream.
    pub action: String,
    /// Stream name.
    pub stream: String,
    /// Publish parameters.
    pub param: String,
    /// Server-relative stream URL path.
    pub stream_url: String,
}

impl From<CallbackPayload> for StreamEvent {
    fn from(payload: CallbackPayload) -> Self {
        Self {
            action: payload.action,
            stream: payload.stream,
            param: payload.param,
            stream_url: payload.stream_url,
        }
    }
}
