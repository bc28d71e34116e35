// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` and captures every outbound
//! message for assertion in tests. It can impersonate either platform's
//! capabilities so capability-driven rendering is exercised.

use async_trait::async_trait;
use tokio::sync::Mutex;

use tally_core::{
    AdapterType, Button, ChannelAdapter, ChannelCapabilities, ChannelEvent, ChatId,
    HealthStatus, Keyboard, ListSection, PluginAdapter, TallyError,
};

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat: ChatId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Buttons {
        chat: ChatId,
        body: String,
        buttons: Vec<Button>,
    },
    List {
        chat: ChatId,
        body: String,
        button_label: String,
        sections: Vec<ListSection>,
    },
    Document {
        chat: ChatId,
        filename: String,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
}

impl Sent {
    /// The visible text of the message; a document's caption.
    pub fn body(&self) -> &str {
        match self {
            Self::Text { text, .. } => text,
            Self::Buttons { body, .. } | Self::List { body, .. } => body,
            Self::Document { caption, .. } => caption.as_deref().unwrap_or_default(),
        }
    }

    /// Callback data of every option offered, in order.
    pub fn options(&self) -> Vec<String> {
        match self {
            Self::Text {
                keyboard: Some(keyboard),
                ..
            } => keyboard.buttons().map(|b| b.data.clone()).collect(),
            Self::Buttons { buttons, .. } => buttons.iter().map(|b| b.data.clone()).collect(),
            Self::List { sections, .. } => sections
                .iter()
                .flat_map(|s| s.rows.iter().map(|r| r.id.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Label of the offered option carrying `data`.
    pub fn label_of(&self, data: &str) -> Option<String> {
        match self {
            Self::Text {
                keyboard: Some(keyboard),
                ..
            } => keyboard
                .buttons()
                .find(|b| b.data == data)
                .map(|b| b.label.clone()),
            Self::Buttons { buttons, .. } => buttons
                .iter()
                .find(|b| b.data == data)
                .map(|b| b.label.clone()),
            Self::List { sections, .. } => sections
                .iter()
                .flat_map(|s| s.rows.iter())
                .find(|r| r.id == data)
                .map(|r| r.title.clone()),
            _ => None,
        }
    }
}

/// A mock messaging channel for testing.
pub struct MockChannel {
    name: &'static str,
    display_name: &'static str,
    capabilities: ChannelCapabilities,
    sent: Mutex<Vec<Sent>>,
    acks: Mutex<Vec<String>>,
}

impl MockChannel {
    /// A channel with inline keyboards and document support, like Telegram.
    pub fn telegram() -> Self {
        Self {
            name: "telegram",
            display_name: "Telegram",
            capabilities: ChannelCapabilities {
                inline_keyboards: true,
                max_buttons: 100,
                max_list_rows: 100,
                max_message_length: 4096,
                supports_documents: true,
                supports_images: true,
                supports_voice: true,
            },
            sent: Mutex::new(Vec::new()),
            acks: Mutex::new(Vec::new()),
        }
    }

    /// A channel limited to three reply buttons and ten list rows, like WhatsApp.
    pub fn whatsapp() -> Self {
        Self {
            name: "whatsapp",
            display_name: "WhatsApp",
            capabilities: ChannelCapabilities {
                inline_keyboards: false,
                max_buttons: 3,
                max_list_rows: 10,
                max_message_length: 4096,
                supports_documents: true,
                supports_images: true,
                supports_voice: true,
            },
            sent: Mutex::new(Vec::new()),
            acks: Mutex::new(Vec::new()),
        }
    }

    /// Override the reported capabilities.
    pub fn with_capabilities(mut self, capabilities: ChannelCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Everything sent so far, in order.
    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn last(&self) -> Option<Sent> {
        self.sent.lock().await.last().cloned()
    }

    /// Body of the most recent message, or an empty string.
    pub async fn last_text(&self) -> String {
        self.last()
            .await
            .map(|s| s.body().to_string())
            .unwrap_or_default()
    }

    /// Options offered by the most recent message that offered any.
    pub async fn last_options(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .map(Sent::options)
            .find(|o| !o.is_empty())
            .unwrap_or_default()
    }

    /// Callback data of the most recently offered option whose label
    /// contains `label`.
    pub async fn option_labelled(&self, label: &str) -> Option<String> {
        let sent = self.sent.lock().await;
        sent.iter().rev().find_map(|s| {
            s.options()
                .into_iter()
                .find(|data| s.label_of(data).is_some_and(|l| l.contains(label)))
        })
    }

    pub async fn documents(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| matches!(s, Sent::Document { .. }))
            .cloned()
            .collect()
    }

    /// Callback ids passed to `acknowledge_button`.
    pub async fn acks(&self) -> Vec<String> {
        self.acks.lock().await.clone()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::telegram()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        self.capabilities.clone()
    }

    fn display_name(&self) -> &str {
        self.display_name
    }

    /// Accepts a JSON-encoded [`ChannelEvent`] or a JSON array of them.
    async fn normalize_inbound(&self, raw: &[u8]) -> Result<Vec<ChannelEvent>, TallyError> {
        if let Ok(events) = serde_json::from_slice::<Vec<ChannelEvent>>(raw) {
            return Ok(events);
        }
        Ok(vec![serde_json::from_slice::<ChannelEvent>(raw)?])
    }

    async fn send_text(&self, chat: &ChatId, text: &str, keyboard: Option<&Keyboard>) -> bool {
        self.sent.lock().await.push(Sent::Text {
            chat: chat.clone(),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        true
    }

    async fn send_buttons(&self, chat: &ChatId, body: &str, buttons: &[Button]) -> bool {
        self.sent.lock().await.push(Sent::Buttons {
            chat: chat.clone(),
            body: body.to_string(),
            buttons: buttons.to_vec(),
        });
        true
    }

    async fn send_list(
        &self,
        chat: &ChatId,
        body: &str,
        button_label: &str,
        sections: &[ListSection],
    ) -> bool {
        self.sent.lock().await.push(Sent::List {
            chat: chat.clone(),
            body: body.to_string(),
            button_label: button_label.to_string(),
            sections: sections.to_vec(),
        });
        true
    }

    async fn send_document(
        &self,
        chat: &ChatId,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> bool {
        self.sent.lock().await.push(Sent::Document {
            chat: chat.clone(),
            filename: filename.to_string(),
            bytes,
            caption: caption.map(str::to_string),
        });
        true
    }

    async fn acknowledge_button(&self, callback_id: &str) -> bool {
        self.acks.lock().await.push(callback_id.to_string());
        true
    }
}
