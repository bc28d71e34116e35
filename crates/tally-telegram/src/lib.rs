// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Tally expense bot.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! webhook update normalization, inline keyboards, callback
//! acknowledgement, and HTML formatting of replies.

pub mod handler;
pub mod markdown;
pub mod media;

use async_trait::async_trait;
use tally_config::model::TelegramConfig;
use tally_core::{
    AdapterType, Button, ChannelAdapter, ChannelCapabilities, ChannelEvent, ChatId,
    HealthStatus, Keyboard, ListSection, PluginAdapter, TallyError,
};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode,
};
use tracing::{debug, info, warn};

const MAX_MESSAGE_LENGTH: usize = 4096;
const MAX_BUTTON_LABEL: usize = 64;

/// Telegram channel adapter implementing [`ChannelAdapter`].
///
/// Inbound updates arrive through the gateway webhook and are handed to
/// [`normalize_inbound`](ChannelAdapter::normalize_inbound). Without a bot
/// token the adapter still normalizes text, but every send returns `false`.
pub struct TelegramChannel {
    bot: Option<Bot>,
    config: TelegramConfig,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// A missing or empty `bot_token` yields a disabled adapter.
    pub fn new(config: TelegramConfig) -> Self {
        let bot = config
            .bot_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(Bot::new);
        if bot.is_none() {
            info!("telegram.bot_token not set; Telegram sends are disabled");
        }
        Self { bot, config }
    }

    /// Points the bot at a different Bot API server.
    pub fn with_api_url(mut self, url: &str) -> Result<Self, TallyError> {
        if let Some(bot) = self.bot.take() {
            let url = url
                .parse()
                .map_err(|e| TallyError::Config(format!("invalid Telegram API url: {e}")))?;
            self.bot = Some(bot.set_api_url(url));
        }
        Ok(self)
    }

    pub fn is_enabled(&self) -> bool {
        self.bot.is_some()
    }

    /// Expected `X-Telegram-Bot-Api-Secret-Token` header, if configured.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.config.webhook_secret.as_deref().filter(|s| !s.is_empty())
    }

    fn bot(&self) -> Option<&Bot> {
        if self.bot.is_none() {
            debug!("Telegram send skipped: channel not configured");
        }
        self.bot.as_ref()
    }

    /// Sends one message (split if too long), keyboard on the last chunk.
    ///
    /// HTML is tried first; if Telegram rejects the entities the chunk is
    /// resent as plain text.
    async fn deliver(&self, chat: &ChatId, text: &str, markup: Option<InlineKeyboardMarkup>) -> bool {
        let Some(bot) = self.bot() else {
            return false;
        };
        let Some(chat_id) = parse_chat_id(chat) else {
            return false;
        };

        let chunks = markdown::split_message(text, MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let markup = if i == last { markup.clone() } else { None };

            let mut request = bot
                .send_message(chat_id, markdown::to_html(chunk))
                .parse_mode(ParseMode::Html);
            if let Some(ref m) = markup {
                request = request.reply_markup(m.clone());
            }
            let Err(e) = request.await else {
                continue;
            };

            warn!(chat_id = %chat, error = %e, "HTML send failed, retrying as plain text");
            let mut request = bot.send_message(chat_id, markdown::to_plain(chunk));
            if let Some(m) = markup {
                request = request.reply_markup(m);
            }
            if let Err(e) = request.await {
                warn!(chat_id = %chat, error = %e, "failed to send Telegram message");
                return false;
            }
        }
        true
    }
}

/// Converts a keyboard into Telegram's inline markup, row for row.
pub fn inline_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        keyboard
            .rows
            .iter()
            .map(|row| row.iter().map(inline_button).collect::<Vec<_>>()),
    )
}

fn inline_button(button: &Button) -> InlineKeyboardButton {
    let label: String = button.label.chars().take(MAX_BUTTON_LABEL).collect();
    InlineKeyboardButton::callback(label, button.data.clone())
}

/// Telegram has no list widget; each row becomes one inline button.
pub fn list_markup(sections: &[ListSection]) -> InlineKeyboardMarkup {
    let buttons = sections
        .iter()
        .flat_map(|section| &section.rows)
        .map(|row| Button::new(row.title.clone(), row.id.clone()));
    inline_markup(&Keyboard::column(buttons))
}

fn parse_chat_id(chat: &ChatId) -> Option<teloxide::types::ChatId> {
    match chat.as_str().parse::<i64>() {
        Ok(id) => Some(teloxide::types::ChatId(id)),
        Err(e) => {
            warn!(chat_id = %chat, error = %e, "invalid Telegram chat id");
            None
        }
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        let Some(bot) = self.bot.as_ref() else {
            return Ok(HealthStatus::Degraded("bot token not configured".into()));
        };
        // Check if the bot token is valid by calling getMe.
        match bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        debug!("Telegram channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            inline_keyboards: true,
            max_buttons: 100,
            max_list_rows: 100,
            max_message_length: MAX_MESSAGE_LENGTH,
            supports_documents: true,
            supports_images: true,
            supports_voice: true,
        }
    }

    fn display_name(&self) -> &str {
        "Telegram"
    }

    async fn normalize_inbound(&self, raw: &[u8]) -> Result<Vec<ChannelEvent>, TallyError> {
        let update: Update = serde_json::from_slice(raw)
            .map_err(|e| TallyError::channel(format!("malformed Telegram update: {e}")))?;
        handler::normalize_update(self.bot.as_ref(), update, &self.config.allowed_chats).await
    }

    async fn send_text(&self, chat: &ChatId, text: &str, keyboard: Option<&Keyboard>) -> bool {
        let markup = keyboard.filter(|k| !k.is_empty()).map(inline_markup);
        self.deliver(chat, text, markup).await
    }

    async fn send_buttons(&self, chat: &ChatId, body: &str, buttons: &[Button]) -> bool {
        let keyboard = Keyboard::column(buttons.iter().cloned());
        self.send_text(chat, body, Some(&keyboard)).await
    }

    async fn send_list(
        &self,
        chat: &ChatId,
        body: &str,
        _button_label: &str,
        sections: &[ListSection],
    ) -> bool {
        self.deliver(chat, body, Some(list_markup(sections))).await
    }

    async fn send_document(
        &self,
        chat: &ChatId,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> bool {
        let Some(bot) = self.bot() else {
            return false;
        };
        let Some(chat_id) = parse_chat_id(chat) else {
            return false;
        };

        let file = InputFile::memory(bytes).file_name(filename.to_string());
        let mut request = bot.send_document(chat_id, file);
        if let Some(caption) = caption {
            request = request.caption(markdown::to_plain(caption));
        }
        match request.await {
            Ok(_) => true,
            Err(e) => {
                warn!(chat_id = %chat, filename, error = %e, "failed to send Telegram document");
                false
            }
        }
    }

    async fn acknowledge_button(&self, callback_id: &str) -> bool {
        let Some(bot) = self.bot() else {
            return false;
        };
        match bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "failed to answer callback query");
                false
            }
        }
    }
}
