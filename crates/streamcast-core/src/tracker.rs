//! The stream tracker.
//!
//! A single-owner task consumes parsed webhook events and administrative
//! commands from one queue, so shared state (the tracked-stream map and
//! the settings) is touched by exactly one task and events are processed
//! one at a time in arrival order. Two publish callbacks racing for the
//! same stream resolve as "last scheduled wins".
//!
//! Nothing here is fatal: policy rejections are silent no-ops, a missing
//! message counts as already resolved, and chat transport failures are
//! logged and abandoned.

use crate::chat::{ChannelId, ChatClient, MessageHandle, Notice};
use crate::event::{CallbackAction, StreamEvent};
use crate::filter::FilterPolicy;
use crate::settings::{Settings, SettingsStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Capacity of the tracker command queue.
const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Administrative operations accepted by the tracker.
#[derive(Debug)]
pub enum AdminCommand {
    /// Measure chat round-trip latency.
    Ping,
    /// Flip the stream-messages toggle.
    ToggleMessages,
    /// Point notices at a channel.
    SetChannel(ChannelId),
    /// Add a stream name to the filter list.
    FilterAdd(String),
    /// Remove a stream name from the filter list.
    FilterRemove(String),
    /// Set the active filter policy.
    FilterSet(FilterPolicy),
    /// Report the policy and its members.
    FilterView,
}

/// Reply to an administrative command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminReply {
    /// Chat round-trip latency.
    Latency(Duration),
    /// The latency probe failed.
    LatencyUnavailable(String),
    /// New state of the stream-messages toggle.
    MessagesEnabled(bool),
    /// Notices now target this channel.
    ChannelSet(ChannelId),
    /// The name was added to the filter list.
    FilterAdded(String),
    /// The name was already listed; nothing changed.
    AlreadyListed(String),
    /// The name was removed from the filter list.
    FilterRemoved(String),
    /// The name was not listed; nothing changed.
    NotListed(String),
    /// The active policy changed.
    PolicySet(FilterPolicy),
    /// Current policy and members.
    FilterView {
        policy: FilterPolicy,
        streams: Vec<String>,
    },
}

/// Work items carried on the tracker queue.
#[derive(Debug)]
pub enum TrackerCommand {
    /// A parsed webhook event.
    Event(StreamEvent),
    /// An admin command with its reply channel.
    Admin(AdminCommand, oneshot::Sender<AdminReply>),
}

/// Cloneable handle for submitting work to the tracker task.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerCommand>,
}

impl TrackerHandle {
    /// Queue a webhook event.
    ///
    /// A full or closed queue drops the event; the webhook contract never
    /// surfaces internal errors, so this only logs.
    pub fn submit_event(&self, event: StreamEvent) {
        if let Err(e) = self.tx.try_send(TrackerCommand::Event(event)) {
            warn!(error = %e, "Dropping webhook event, tracker queue unavailable");
        }
    }

    /// Run an admin command and wait for its reply.
    ///
    /// Returns `None` if the tracker task is gone.
    pub async fn admin(&self, command: AdminCommand) -> Option<AdminReply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(TrackerCommand::Admin(command, reply_tx))
            .await
            .is_err()
        {
            return None;
        }
        reply_rx.await.ok()
    }
}

/// Tracks live streams and the notices posted for them.
pub struct Tracker {
    chat: Arc<dyn ChatClient>,
    settings: Settings,
    store: SettingsStore,
    tracked: HashMap<String, MessageHandle>,
    rx: mpsc::Receiver<TrackerCommand>,
}

impl Tracker {
    /// Create a tracker and the handle feeding it.
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatClient>,
        settings: Settings,
        store: SettingsStore,
    ) -> (Self, TrackerHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        (
            Self {
                chat,
                settings,
                store,
                tracked: HashMap::new(),
                rx,
            },
            TrackerHandle { tx },
        )
    }

    /// Consume commands until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                TrackerCommand::Event(event) => self.handle_event(event).await,
                TrackerCommand::Admin(command, reply) => {
                    let response = self.handle_admin(command).await;
                    let _ = reply.send(response);
                }
            }
        }
        debug!("Tracker queue closed, shutting down");
    }

    /// Streams currently believed live, sorted for stable output.
    #[must_use]
    pub fn tracked_streams(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tracked.keys().cloned().collect();
        names.sort();
        names
    }

    async fn handle_event(&mut self, event: StreamEvent) {
        let Some(channel) = self.settings.channel_id else {
            debug!("No channel configured, ignoring event");
            return;
        };

        let url = self.settings.stream_url(&event.stream_url);
        debug!(
            action = %event.action,
            stream = %event.stream,
            param = %event.param,
            url = %url,
            "Webhook event"
        );

        if !self
            .settings
            .filter_option
            .allows(&self.settings.filter_list, &event.stream)
        {
            debug!(
                stream = %event.stream,
                policy = %self.settings.filter_option,
                "Stream filtered"
            );
            return;
        }

        if !self.settings.enable_stream_messages {
            debug!("Stream messages are disabled");
            return;
        }

        match event.action.parse::<CallbackAction>() {
            Ok(CallbackAction::OnPublish) => self.on_publish(channel, &event.stream, &url).await,
            Ok(CallbackAction::OnUnpublish) => self.on_unpublish(channel, &event.stream).await,
            Ok(CallbackAction::Stream) | Err(_) => {
                debug!(action = %event.action, "Unsupported callback action");
            }
        }

        debug!(active = ?self.tracked_streams(), "Active streams");
    }

    /// A stream went live: replace any prior notice, post a fresh one.
    async fn on_publish(&mut self, channel: ChannelId, stream: &str, url: &str) {
        if let Some(stale) = self.tracked.remove(stream) {
            debug!(stream = %stream, message = %stale, "Stream already tracked, replacing prior notice");
            match self.chat.delete_notice(channel, stale).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(stream = %stream, "Prior notice already gone");
                }
                Err(e) => {
                    warn!(stream = %stream, error = %e, "Failed to delete prior notice");
                }
            }
        }

        match self.chat.post_notice(channel, &Notice::live(stream, url)).await {
            Ok(handle) => {
                self.tracked.insert(stream.to_string(), handle);
            }
            Err(e) => warn!(stream = %stream, error = %e, "Failed to post live notice"),
        }
    }

    /// A stream ended: resolve its notice, delete or edit per settings.
    async fn on_unpublish(&mut self, channel: ChannelId, stream: &str) {
        let Some(handle) = self.tracked.remove(stream) else {
            debug!(stream = %stream, "No tracked notice to resolve");
            return;
        };

        let result = if self.settings.delete_on_unpublished {
            self.chat.delete_notice(channel, handle).await
        } else {
            self.chat
                .edit_notice(channel, handle, &Notice::offline(stream))
                .await
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!(stream = %stream, "Notice already gone"),
            Err(e) => warn!(stream = %stream, error = %e, "Failed to resolve notice"),
        }
    }

    async fn handle_admin(&mut self, command: AdminCommand) -> AdminReply {
        match command {
            AdminCommand::Ping => match self.chat.ping().await {
                Ok(latency) => AdminReply::Latency(latency),
                Err(e) => AdminReply::LatencyUnavailable(e.to_string()),
            },
            AdminCommand::ToggleMessages => {
                self.settings.enable_stream_messages = !self.settings.enable_stream_messages;
                self.persist();
                AdminReply::MessagesEnabled(self.settings.enable_stream_messages)
            }
            AdminCommand::SetChannel(channel) => {
                self.settings.channel_id = Some(channel);
                self.persist();
                AdminReply::ChannelSet(channel)
            }
            AdminCommand::FilterAdd(stream) => {
                if self.settings.filter_list.add(stream.clone()) {
                    self.persist();
                    AdminReply::FilterAdded(stream)
                } else {
                    AdminReply::AlreadyListed(stream)
                }
            }
            AdminCommand::FilterRemove(stream) => {
                if self.settings.filter_list.remove(&stream) {
                    self.persist();
                    AdminReply::FilterRemoved(stream)
                } else {
                    AdminReply::NotListed(stream)
                }
            }
            AdminCommand::FilterSet(policy) => {
                self.settings.filter_option = policy;
                self.persist();
                AdminReply::PolicySet(policy)
            }
            AdminCommand::FilterView => AdminReply::FilterView {
                policy: self.settings.filter_option,
                streams: self.settings.filter_list.names().to_vec(),
            },
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.settings) {
            warn!(
                path = %self.store.path().display(),
                error = %e,
                "Failed to persist settings"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Post(String),
        Edit(u64, String),
        Delete(u64),
    }

    /// Recording chat client; optionally fails specific operations.
    struct MockChat {
        calls: Mutex<Vec<Call>>,
        next_id: AtomicU64,
        delete_error: Mutex<Option<ChatError>>,
        post_error: Mutex<Option<ChatError>>,
    }

    impl MockChat {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                delete_error: Mutex::new(None),
                post_error: Mutex::new(None),
            }
        }

        fn fail_delete_with(&self, error: ChatError) {
            *self.delete_error.lock().unwrap() = Some(error);
        }

        fn fail_post_with(&self, error: ChatError) {
            *self.post_error.lock().unwrap() = Some(error);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatClient for MockChat {
        async fn post_notice(
            &self,
            _channel: ChannelId,
            notice: &Notice,
        ) -> Result<MessageHandle, ChatError> {
            self.calls.lock().unwrap().push(Call::Post(notice.title.clone()));
            if let Some(e) = self.post_error.lock().unwrap().take() {
                return Err(e);
            }
            Ok(MessageHandle(self.next_id.fetch_add(1, Ordering::Relaxed)))
        }

        async fn edit_notice(
            &self,
            _channel: ChannelId,
            message: MessageHandle,
            notice: &Notice,
        ) -> Result<(), ChatError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Edit(message.0, notice.title.clone()));
            Ok(())
        }

        async fn delete_notice(
            &self,
            _channel: ChannelId,
            message: MessageHandle,
        ) -> Result<(), ChatError> {
            self.calls.lock().unwrap().push(Call::Delete(message.0));
            if let Some(e) = self.delete_error.lock().unwrap().take() {
                return Err(e);
            }
            Ok(())
        }

        async fn ping(&self) -> Result<Duration, ChatError> {
            Ok(Duration::from_millis(42))
        }
    }

    fn test_settings() -> Settings {
        Settings {
            channel_id: Some(ChannelId(7)),
            url_domain: "https://cdn.example".to_string(),
            url_ext: ".m3u8".to_string(),
            ..Settings::default()
        }
    }

    fn tracker_with(
        settings: Settings,
    ) -> (Tracker, TrackerHandle, Arc<MockChat>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        store.save(&settings).unwrap();
        let chat = Arc::new(MockChat::new());
        let (tracker, handle) = Tracker::new(chat.clone(), settings, store);
        (tracker, handle, chat, dir)
    }

    fn publish(stream: &str) -> StreamEvent {
        StreamEvent {
            action: "on_publish".to_string(),
            stream: stream.to_string(),
            param: String::new(),
            stream_url: format!("/live/{stream}"),
        }
    }

    fn unpublish(stream: &str) -> StreamEvent {
        StreamEvent {
            action: "on_unpublish".to_string(),
            stream: stream.to_string(),
            param: String::new(),
            stream_url: format!("/live/{stream}"),
        }
    }

    #[tokio::test]
    async fn test_publish_tracks_stream() {
        let (mut tracker, _handle, chat, _dir) = tracker_with(test_settings());

        tracker.handle_event(publish("alice")).await;

        assert_eq!(tracker.tracked_streams(), ["alice"]);
        assert_eq!(
            chat.calls(),
            [Call::Post("\u{1F4FA} alice is live".to_string())]
        );
    }

    #[tokio::test]
    async fn test_publish_then_unpublish_edits_and_untracks() {
        let (mut tracker, _handle, chat, _dir) = tracker_with(test_settings());

        tracker.handle_event(publish("alice")).await;
        tracker.handle_event(unpublish("alice")).await;

        assert!(tracker.tracked_streams().is_empty());
        assert_eq!(
            chat.calls(),
            [
                Call::Post("\u{1F4FA} alice is live".to_string()),
                Call::Edit(1, "\u{1F534} alice Offline".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unpublish_deletes_when_configured() {
        let mut settings = test_settings();
        settings.delete_on_unpublished = true;
        let (mut tracker, _handle, chat, _dir) = tracker_with(settings);

        tracker.handle_event(publish("alice")).await;
        tracker.handle_event(unpublish("alice")).await;

        assert!(tracker.tracked_streams().is_empty());
        assert_eq!(
            chat.calls(),
            [
                Call::Post("\u{1F4FA} alice is live".to_string()),
                Call::Delete(1),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_publish_deletes_prior_notice_first() {
        let (mut tracker, _handle, chat, _dir) = tracker_with(test_settings());

        tracker.handle_event(publish("alice")).await;
        tracker.handle_event(publish("alice")).await;

        assert_eq!(tracker.tracked_streams(), ["alice"]);
        assert_eq!(
            chat.calls(),
            [
                Call::Post("\u{1F4FA} alice is live".to_string()),
                Call::Delete(1),
                Call::Post("\u{1F4FA} alice is live".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_whitelist_suppresses_unlisted() {
        let mut settings = test_settings();
        settings.filter_option = FilterPolicy::Whitelist;
        settings.filter_list.add("bob");
        let (mut tracker, _handle, chat, _dir) = tracker_with(settings);

        tracker.handle_event(publish("alice")).await;

        assert!(tracker.tracked_streams().is_empty());
        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blacklist_suppresses_listed() {
        let mut settings = test_settings();
        settings.filter_option = FilterPolicy::Blacklist;
        settings.filter_list.add("alice");
        let (mut tracker, _handle, chat, _dir) = tracker_with(settings);

        tracker.handle_event(publish("alice")).await;
        tracker.handle_event(publish("bob")).await;

        assert_eq!(tracker.tracked_streams(), ["bob"]);
        assert_eq!(chat.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_messages_are_a_no_op() {
        let mut settings = test_settings();
        settings.enable_stream_messages = false;
        let (mut tracker, _handle, chat, _dir) = tracker_with(settings);

        tracker.handle_event(publish("alice")).await;

        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_channel_configured_is_a_no_op() {
        let mut settings = test_settings();
        settings.channel_id = None;
        let (mut tracker, _handle, chat, _dir) = tracker_with(settings);

        tracker.handle_event(publish("alice")).await;

        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action_ignored() {
        let (mut tracker, _handle, chat, _dir) = tracker_with(test_settings());

        let mut event = publish("alice");
        event.action = "on_play".to_string();
        tracker.handle_event(event).await;

        assert!(chat.calls().is_empty());
        assert!(tracker.tracked_streams().is_empty());
    }

    #[tokio::test]
    async fn test_unpublish_without_tracked_notice_is_benign() {
        let (mut tracker, _handle, chat, _dir) = tracker_with(test_settings());

        tracker.handle_event(unpublish("alice")).await;

        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stale_delete_not_found_is_benign() {
        let (mut tracker, _handle, chat, _dir) = tracker_with(test_settings());

        tracker.handle_event(publish("alice")).await;
        chat.fail_delete_with(ChatError::NotFound);
        tracker.handle_event(publish("alice")).await;

        // The replacement notice is still posted and tracked.
        assert_eq!(tracker.tracked_streams(), ["alice"]);
        assert_eq!(chat.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_post_failure_leaves_stream_untracked() {
        let (mut tracker, _handle, chat, _dir) = tracker_with(test_settings());

        chat.fail_post_with(ChatError::Forbidden);
        tracker.handle_event(publish("alice")).await;

        assert!(tracker.tracked_streams().is_empty());
    }

    #[tokio::test]
    async fn test_unpublish_transport_failure_still_untracks() {
        let mut settings = test_settings();
        settings.delete_on_unpublished = true;
        let (mut tracker, _handle, chat, _dir) = tracker_with(settings);

        tracker.handle_event(publish("alice")).await;
        chat.fail_delete_with(ChatError::Transport("connection reset".to_string()));
        tracker.handle_event(unpublish("alice")).await;

        assert!(tracker.tracked_streams().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_round_trips() {
        let (mut tracker, _handle, _chat, _dir) = tracker_with(test_settings());

        assert_eq!(
            tracker.handle_admin(AdminCommand::ToggleMessages).await,
            AdminReply::MessagesEnabled(false)
        );
        assert_eq!(
            tracker.handle_admin(AdminCommand::ToggleMessages).await,
            AdminReply::MessagesEnabled(true)
        );
    }

    #[tokio::test]
    async fn test_filter_add_remove_acknowledgements() {
        let (mut tracker, _handle, _chat, _dir) = tracker_with(test_settings());

        assert_eq!(
            tracker
                .handle_admin(AdminCommand::FilterAdd("alice".to_string()))
                .await,
            AdminReply::FilterAdded("alice".to_string())
        );
        assert_eq!(
            tracker
                .handle_admin(AdminCommand::FilterAdd("alice".to_string()))
                .await,
            AdminReply::AlreadyListed("alice".to_string())
        );
        assert_eq!(
            tracker
                .handle_admin(AdminCommand::FilterRemove("alice".to_string()))
                .await,
            AdminReply::FilterRemoved("alice".to_string())
        );
        assert_eq!(
            tracker
                .handle_admin(AdminCommand::FilterRemove("alice".to_string()))
                .await,
            AdminReply::NotListed("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_mutations_rewrite_settings_file() {
        let (mut tracker, _handle, _chat, _dir) = tracker_with(test_settings());

        tracker
            .handle_admin(AdminCommand::FilterSet(FilterPolicy::Blacklist))
            .await;
        tracker
            .handle_admin(AdminCommand::FilterAdd("mallory".to_string()))
            .await;
        tracker
            .handle_admin(AdminCommand::SetChannel(ChannelId(31337)))
            .await;

        let persisted = tracker.store.load().unwrap();
        assert_eq!(persisted.filter_option, FilterPolicy::Blacklist);
        assert!(persisted.filter_list.contains("mallory"));
        assert_eq!(persisted.channel_id, Some(ChannelId(31337)));
    }

    #[tokio::test]
    async fn test_filter_view_reports_members_in_order() {
        let (mut tracker, _handle, _chat, _dir) = tracker_with(test_settings());

        tracker
            .handle_admin(AdminCommand::FilterAdd("bob".to_string()))
            .await;
        tracker
            .handle_admin(AdminCommand::FilterAdd("alice".to_string()))
            .await;

        assert_eq!(
            tracker.handle_admin(AdminCommand::FilterView).await,
            AdminReply::FilterView {
                policy: FilterPolicy::Open,
                streams: vec!["bob".to_string(), "alice".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_ping_reports_latency() {
        let (mut tracker, _handle, _chat, _dir) = tracker_with(test_settings());

        assert_eq!(
            tracker.handle_admin(AdminCommand::Ping).await,
            AdminReply::Latency(Duration::from_millis(42))
        );
    }

    #[tokio::test]
    async fn test_handle_drives_running_tracker() {
        let (tracker, handle, chat, _dir) = tracker_with(test_settings());
        let task = tokio::spawn(tracker.run());

        handle.submit_event(publish("alice"));
        let reply = handle.admin(AdminCommand::FilterView).await;
        assert!(matches!(reply, Some(AdminReply::FilterView { .. })));

        // The admin reply proves the earlier event was already processed.
        assert_eq!(chat.calls().len(), 1);

        drop(handle);
        task.await.unwrap();
    }
}
