//! # streamcast-discord
//!
//! Discord REST implementation of the Streamcast `ChatClient`.
//!
//! Notices are rendered as single-embed messages against the v10 API.
//! The base URL is overridable so tests can point the client at a stub
//! server.

mod client;
mod embed;

pub use client::{DiscordClient, DISCORD_API_BASE};
