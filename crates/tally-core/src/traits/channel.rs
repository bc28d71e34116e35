// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for messaging platform integrations (Telegram, WhatsApp).

use async_trait::async_trait;

use crate::error::TallyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Button, ChannelCapabilities, ChannelEvent, ChatId, Keyboard, ListSection};

/// Adapter for a messaging platform.
///
/// Sends are best-effort: failures are logged inside the adapter and
/// reported as `false`, never as errors. An adapter without credentials
/// returns `false` from every send.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Human-facing platform name, used as the default payment method label.
    fn display_name(&self) -> &str;

    /// Converts a raw webhook body into zero or more normalized events.
    ///
    /// Payloads the bot ignores (status updates, group chats, stickers)
    /// produce an empty vector.
    async fn normalize_inbound(&self, raw: &[u8]) -> Result<Vec<ChannelEvent>, TallyError>;

    /// Sends text, optionally with an inline keyboard.
    async fn send_text(&self, chat: &ChatId, text: &str, keyboard: Option<&Keyboard>) -> bool;

    /// Sends a message with up to `max_buttons` reply buttons.
    async fn send_buttons(&self, chat: &ChatId, body: &str, buttons: &[Button]) -> bool;

    /// Sends a list menu opened by a single button labelled `button_label`.
    async fn send_list(
        &self,
        chat: &ChatId,
        body: &str,
        button_label: &str,
        sections: &[ListSection],
    ) -> bool;

    /// Sends a file attachment.
    async fn send_document(
        &self,
        chat: &ChatId,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> bool;

    /// Acknowledges a button tap. Must run before any reply on channels
    /// that show a pending spinner until the tap is answered.
    async fn acknowledge_button(&self, callback_id: &str) -> bool;
}
