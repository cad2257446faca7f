//! Persisted bot settings.
//!
//! Settings live in a single flat JSON file with upper-case keys. The file
//! is read once at startup and rewritten wholesale on every administrative
//! mutation. Tracked-stream state is deliberately not persisted; a restart
//! forgets everything currently live.

use crate::chat::ChannelId;
use crate::filter::{FilterList, FilterPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persisted configuration for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Settings {
    /// Chat platform bot token.
    pub token: String,
    /// Target channel; `None` until set by an admin command.
    pub channel_id: Option<ChannelId>,
    /// Prefix of the public stream URL.
    pub url_domain: String,
    /// Suffix appended after the stream path (e.g. `.m3u8`).
    pub url_ext: String,
    /// Delete the notice when a stream ends instead of editing it.
    pub delete_on_unpublished: bool,
    /// Master toggle for posting stream notices.
    pub enable_stream_messages: bool,
    /// Start logging at debug level.
    pub enable_debug: bool,
    /// Active filter policy.
    pub filter_option: FilterPolicy,
    /// Stream names the policy applies to.
    pub filter_list: FilterList,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel_id: None,
            url_domain: String::new(),
            url_ext: String::new(),
            delete_on_unpublished: false,
            enable_stream_messages: true,
            enable_debug: false,
            filter_option: FilterPolicy::Open,
            filter_list: FilterList::new(),
        }
    }
}

impl Settings {
    /// Assemble the public URL for a stream path reported by the server.
    #[must_use]
    pub fn stream_url(&self, stream_path: &str) -> String {
        format!("{}{}{}", self.url_domain, stream_path, self.url_ext)
    }
}

/// Settings persistence errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read or write the settings file.
    #[error("settings file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON.
    #[error("settings file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads and rewrites the flat settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Create a store for the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Read the settings file, falling back to defaults if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(&self) -> Result<Settings, SettingsError> {
        if self.path.exists() {
            self.load()
        } else {
            Ok(Settings::default())
        }
    }

    /// Rewrite the whole settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
