// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end conversation testing.
//!
//! `TestHarness` assembles the real [`DialogueController`] with a temp
//! SQLite ledger, a scripted intent provider, a scripted media reader and a
//! capturing channel. Each helper delivers one event and waits for the
//! controller to finish handling it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tally_config::model::{DialogueConfig, StorageConfig};
use tally_core::{
    ChannelEvent, ChatId, ConversationRecord, ConversationStore, MediaPayload, PluginAdapter,
    ProviderAdapter, StateKey, TallyError,
};
use tally_dialogue::{DialogueController, NONE_STATE};
use tally_intent::IntentExtractor;
use tally_storage::SqliteStore;

use crate::memory_states::MemoryStates;
use crate::mock_channel::MockChannel;
use crate::mock_provider::{MockMediaReader, MockProvider};
use crate::recording_ledger::RecordingLedger;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    dialogue: DialogueConfig,
    media: bool,
    channel: MockChannel,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            dialogue: DialogueConfig::default(),
            media: true,
            channel: MockChannel::telegram(),
        }
    }

    /// Queue intent provider replies (raw model output).
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_dialogue(mut self, dialogue: DialogueConfig) -> Self {
        self.dialogue = dialogue;
        self
    }

    /// Build without a media reader, as when media is disabled in config.
    pub fn without_media(mut self) -> Self {
        self.media = false;
        self
    }

    /// Talk through a WhatsApp-shaped channel instead of Telegram.
    pub fn on_whatsapp(mut self) -> Self {
        self.channel = MockChannel::whatsapp();
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, TallyError> {
        let temp_dir = tempfile::TempDir::new().map_err(TallyError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        store.initialize().await?;
        let ledger = Arc::new(RecordingLedger::new(store.clone()));

        let states = Arc::new(MemoryStates::new());
        let mock_provider = Arc::new(MockProvider::with_responses(self.responses));
        let extractor = Arc::new(IntentExtractor::new(
            vec![mock_provider.clone() as Arc<dyn ProviderAdapter>],
            Duration::from_secs(5),
        ));
        let mock_media = Arc::new(MockMediaReader::new());

        let mut controller =
            DialogueController::new(ledger.clone(), states.clone(), extractor, self.dialogue);
        if self.media {
            controller = controller.with_media_reader(mock_media.clone());
        }

        Ok(TestHarness {
            controller,
            mock_provider,
            mock_media,
            mock_channel: self.channel,
            ledger,
            store,
            states,
            chat: ChatId::new("1001"),
            callbacks: AtomicU64::new(0),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub controller: DialogueController,
    pub mock_provider: Arc<MockProvider>,
    pub mock_media: Arc<MockMediaReader>,
    pub mock_channel: MockChannel,
    /// The ledger the controller sees; records every mutation.
    pub ledger: Arc<RecordingLedger>,
    /// SQLite store behind the ledger (temp DB, cleaned up on drop).
    pub store: Arc<SqliteStore>,
    pub states: Arc<MemoryStates>,
    /// The chat every helper speaks as.
    pub chat: ChatId,
    callbacks: AtomicU64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings and no scripted replies.
    pub async fn new() -> Result<Self, TallyError> {
        Self::builder().build().await
    }

    pub async fn handle(&self, event: ChannelEvent) {
        self.controller.handle(&self.mock_channel, event).await;
    }

    pub async fn send_text(&self, text: &str) {
        self.handle(ChannelEvent::Text {
            chat_id: self.chat.clone(),
            text: text.to_string(),
        })
        .await;
    }

    /// Tap a button carrying `data`, with a fresh callback id.
    pub async fn tap(&self, data: &str) {
        let n = self.callbacks.fetch_add(1, Ordering::Relaxed);
        self.handle(ChannelEvent::Button {
            chat_id: self.chat.clone(),
            callback_id: Some(format!("cb-{n}")),
            data: data.to_string(),
        })
        .await;
    }

    /// Tap the most recently offered option whose label contains `label`.
    ///
    /// Panics if no such option was offered.
    pub async fn tap_labelled(&self, label: &str) {
        let data = self
            .mock_channel
            .option_labelled(label)
            .await
            .unwrap_or_else(|| panic!("no option labelled {label:?} was offered"));
        self.tap(&data).await;
    }

    pub async fn send_voice(&self) {
        self.handle(ChannelEvent::Voice {
            chat_id: self.chat.clone(),
            media: MediaPayload {
                bytes: b"OggS".to_vec(),
                mime_type: "audio/ogg".to_string(),
            },
        })
        .await;
    }

    pub async fn send_image(&self, caption: Option<&str>) {
        self.handle(ChannelEvent::Image {
            chat_id: self.chat.clone(),
            media: MediaPayload {
                bytes: vec![0xFF, 0xD8, 0xFF],
                mime_type: "image/jpeg".to_string(),
            },
            caption: caption.map(str::to_string),
        })
        .await;
    }

    /// Queue one intent provider reply.
    pub async fn respond(&self, json: &str) {
        self.mock_provider.add_response(json).await;
    }

    /// The key this chat's state is stored under.
    pub fn state_key(&self) -> StateKey {
        StateKey::new(self.mock_channel.name(), &self.chat)
    }

    pub async fn state(&self) -> Option<ConversationRecord> {
        self.states
            .get_user_state(self.state_key().as_str())
            .await
            .ok()
            .flatten()
    }

    /// Current state name, `none` when no record exists.
    pub async fn state_name(&self) -> String {
        self.state()
            .await
            .map_or_else(|| NONE_STATE.to_string(), |r| r.state)
    }

    /// Age this chat's state record by `secs`.
    pub async fn backdate_state(&self, secs: i64) {
        self.states.backdate(self.state_key().as_str(), secs).await;
    }

    pub async fn last_text(&self) -> String {
        self.mock_channel.last_text().await
    }
}
