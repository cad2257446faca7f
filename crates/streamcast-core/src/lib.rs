//! # streamcast-core
//!
//! Domain logic for the Streamcast relay: parsing media-server webhook
//! callbacks, deciding which streams get announced, and keeping the
//! live-notice bookkeeping.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Event** - Parsed publish/unpublish callbacks from the media server
//! - **Filter** - Open/whitelist/blacklist stream filtering
//! - **Settings** - Persisted bot configuration (flat JSON file)
//! - **Chat** - The `ChatClient` seam and the notice (embed) model
//! - **Tracker** - Single-owner task mapping live streams to posted notices
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Webhook   │────▶│   Tracker   │────▶│ ChatClient  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │  Settings   │
//!                     └─────────────┘
//! ```

pub mod chat;
pub mod event;
pub mod filter;
pub mod settings;
pub mod tracker;

pub use chat::{ChannelId, ChatClient, ChatError, MessageHandle, Notice};
pub use event::{CallbackAction, CallbackPayload, StreamEvent};
pub use filter::{FilterList, FilterPolicy};
pub use settings::{Settings, SettingsError, SettingsStore};
pub use tracker::{AdminCommand, AdminReply, Tracker, TrackerHandle};
