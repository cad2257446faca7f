//! # Streamcast Server
//!
//! Relays media-server publish callbacks into a chat channel.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! streamcast
//!
//! # Run with custom config
//! STREAMCAST_PORT=3000 STREAMCAST_SETTINGS=/app/settings.json streamcast
//! ```

mod config;
mod handlers;
mod metrics;

use anyhow::{Context, Result};
use std::sync::Arc;
use streamcast_core::settings::SettingsStore;
use streamcast_core::tracker::Tracker;
use streamcast_discord::DiscordClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration and persisted settings
    let config = config::Config::load()?;
    let store = SettingsStore::new(&config.settings_path);
    let settings = store
        .load_or_default()
        .with_context(|| format!("Failed to load settings from {}", config.settings_path))?;

    // Initialize tracing; the persisted debug toggle picks the default level
    let default_filter = if settings.enable_debug {
        "streamcast_server=debug,streamcast_core=debug,streamcast_discord=debug"
    } else {
        "streamcast_server=info,streamcast_core=info,streamcast_discord=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Streamcast on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Wire the chat client and spawn the tracker task
    let chat = Arc::new(DiscordClient::new(settings.token.clone()));
    let (tracker, tracker_handle) = Tracker::new(chat, settings, store);
    tokio::spawn(tracker.run());

    // Start the server
    handlers::run_server(config, tracker_handle).await?;

    Ok(())
}
