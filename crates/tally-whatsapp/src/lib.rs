// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API channel adapter for the Tally expense bot.
//!
//! Inbound notifications arrive on the gateway webhook; outbound messages
//! are posted to the Graph API. WhatsApp allows at most three reply
//! buttons per message, so larger keyboards are sent as list menus.

pub mod media;
pub mod types;
pub mod verify;

use async_trait::async_trait;
use tally_config::model::WhatsAppConfig;
use tally_core::{
    AdapterType, Button, ChannelAdapter, ChannelCapabilities, ChannelEvent, ChatId,
    HealthStatus, Keyboard, ListRow, ListSection, PluginAdapter, TallyError,
};
use tracing::{debug, info, warn};

use crate::media::GraphApi;
use crate::types::{
    ButtonAction, DocumentRef, InboundMessage, Interactive, ListAction, OutboundContent,
    OutboundMessage, OutboundRow, OutboundSection, OutboundText, ReplyButton, ReplyButtonBody,
    TextBody, WebhookPayload,
};

const MAX_BUTTONS: usize = 3;
const MAX_LIST_ROWS: usize = 10;
const MAX_TEXT_LENGTH: usize = 4096;
const MAX_INTERACTIVE_BODY: usize = 1024;
const MAX_BUTTON_TITLE: usize = 20;
const MAX_ROW_TITLE: usize = 24;
const MAX_ROW_DESCRIPTION: usize = 72;

/// Credentials needed to call the Graph API.
struct Sender {
    api: GraphApi,
    phone_number_id: String,
}

/// WhatsApp channel adapter implementing [`ChannelAdapter`].
///
/// Sending requires both `access_token` and `phone_number_id`; without them
/// every send returns `false` and inbound media is dropped.
pub struct WhatsAppChannel {
    sender: Option<Sender>,
    config: WhatsAppConfig,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig) -> Self {
        let sender = match (
            config.access_token.as_deref().filter(|t| !t.is_empty()),
            config.phone_number_id.as_deref().filter(|p| !p.is_empty()),
        ) {
            (Some(token), Some(phone_number_id)) => Some(Sender {
                api: GraphApi {
                    client: reqwest::Client::new(),
                    base_url: config.api_base_url.clone(),
                    version: config.api_version.clone(),
                    access_token: token.to_string(),
                },
                phone_number_id: phone_number_id.to_string(),
            }),
            _ => {
                info!("whatsapp access_token/phone_number_id not set; WhatsApp sends are disabled");
                None
            }
        };
        Self { sender, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Answers the `GET` webhook handshake; `None` means respond 403.
    pub fn verify_subscription(
        &self,
        mode: Option<&str>,
        token: Option<&str>,
        challenge: Option<&str>,
    ) -> Option<String> {
        verify::subscription_challenge(mode, token, challenge, self.config.verify_token.as_deref())
    }

    /// Checks `X-Hub-Signature-256`. Passes when no app secret is configured.
    pub fn verify_signature(&self, signature_header: Option<&str>, body: &[u8]) -> bool {
        let secret = self.config.app_secret.as_deref().unwrap_or("");
        verify::verify_signature(secret, signature_header, body)
    }

    fn sender(&self) -> Option<&Sender> {
        if self.sender.is_none() {
            debug!("WhatsApp send skipped: channel not configured");
        }
        self.sender.as_ref()
    }

    async fn post(&self, message: OutboundMessage) -> bool {
        let Some(sender) = self.sender() else {
            return false;
        };
        let to = message.to.clone();
        let result = sender
            .api
            .client
            .post(sender.api.url(&format!("{}/messages", sender.phone_number_id)))
            .bearer_auth(&sender.api.access_token)
            .json(&message)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(chat_id = %to, error = %e, "failed to reach WhatsApp");
                return false;
            }
        };
        match media::ensure_success(response, "send").await {
            Ok(_) => true,
            Err(e) => {
                warn!(chat_id = %to, error = %e, "failed to send WhatsApp message");
                false
            }
        }
    }

    async fn message_event(&self, msg: &InboundMessage) -> Result<Option<ChannelEvent>, TallyError> {
        let chat_id = ChatId::new(msg.from.clone());

        match msg.kind.as_str() {
            "text" => Ok(msg.text.as_ref().map(|t| ChannelEvent::Text {
                chat_id,
                text: t.body.clone(),
            })),
            "interactive" => Ok(msg
                .interactive
                .as_ref()
                .and_then(|i| i.chosen_id())
                .map(|data| ChannelEvent::Button {
                    chat_id,
                    callback_id: None,
                    data: data.to_string(),
                })),
            "button" => Ok(msg.button.as_ref().map(|b| ChannelEvent::Button {
                chat_id,
                callback_id: None,
                data: b.payload.clone(),
            })),
            "image" | "audio" | "document" => {
                let media_ref = match msg.kind.as_str() {
                    "image" => msg.image.as_ref(),
                    "audio" => msg.audio.as_ref(),
                    _ => msg.document.as_ref(),
                };
                let Some(media_ref) = media_ref else {
                    return Ok(None);
                };
                if msg.kind == "document"
                    && !media_ref
                        .mime_type
                        .as_deref()
                        .is_some_and(|m| m.starts_with("image/"))
                {
                    debug!(msg_id = %msg.id, "ignoring non-image document");
                    return Ok(None);
                }
                let Some(sender) = self.sender.as_ref() else {
                    warn!(chat_id = %chat_id, "media received but WhatsApp is not configured to download it");
                    return Ok(None);
                };

                let payload = media::download(&sender.api, &media_ref.id).await?;
                Ok(Some(if msg.kind == "audio" {
                    ChannelEvent::Voice {
                        chat_id,
                        media: payload,
                    }
                } else {
                    ChannelEvent::Image {
                        chat_id,
                        media: payload,
                        caption: media_ref.caption.clone(),
                    }
                }))
            }
            other => {
                debug!(msg_id = %msg.id, kind = other, "ignoring unsupported message type");
                Ok(None)
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn reply_buttons(body: &str, buttons: &[Button]) -> Interactive {
    Interactive::Button {
        body: TextBody {
            body: truncate(body, MAX_INTERACTIVE_BODY),
        },
        action: ButtonAction {
            buttons: buttons
                .iter()
                .take(MAX_BUTTONS)
                .map(|b| ReplyButton {
                    kind: "reply",
                    reply: ReplyButtonBody {
                        id: b.data.clone(),
                        title: truncate(&b.label, MAX_BUTTON_TITLE),
                    },
                })
                .collect(),
        },
    }
}

fn list_menu(body: &str, button_label: &str, sections: &[ListSection]) -> Interactive {
    let mut remaining = MAX_LIST_ROWS;
    let sections = sections
        .iter()
        .filter_map(|section| {
            let rows: Vec<_> = section
                .rows
                .iter()
                .take(remaining)
                .map(|row| OutboundRow {
                    id: row.id.clone(),
                    title: truncate(&row.title, MAX_ROW_TITLE),
                    description: row
                        .description
                        .as_deref()
                        .map(|d| truncate(d, MAX_ROW_DESCRIPTION)),
                })
                .collect();
            remaining -= rows.len();
            (!rows.is_empty()).then(|| OutboundSection {
                title: truncate(&section.title, MAX_ROW_TITLE),
                rows,
            })
        })
        .collect();

    Interactive::List {
        body: TextBody {
            body: truncate(body, MAX_INTERACTIVE_BODY),
        },
        action: ListAction {
            button: truncate(button_label, MAX_BUTTON_TITLE),
            sections,
        },
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        if self.sender.is_none() {
            return Ok(HealthStatus::Degraded("credentials not configured".into()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        debug!("WhatsApp channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for WhatsAppChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            inline_keyboards: false,
            max_buttons: MAX_BUTTONS,
            max_list_rows: MAX_LIST_ROWS,
            max_message_length: MAX_TEXT_LENGTH,
            supports_documents: true,
            supports_images: true,
            supports_voice: true,
        }
    }

    fn display_name(&self) -> &str {
        "WhatsApp"
    }

    async fn normalize_inbound(&self, raw: &[u8]) -> Result<Vec<ChannelEvent>, TallyError> {
        let payload: WebhookPayload = serde_json::from_slice(raw)
            .map_err(|e| TallyError::channel(format!("malformed WhatsApp webhook: {e}")))?;

        let mut events = Vec::new();
        for msg in payload.messages() {
            if let Some(event) = self.message_event(msg).await? {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn send_text(&self, chat: &ChatId, text: &str, keyboard: Option<&Keyboard>) -> bool {
        match keyboard.filter(|k| !k.is_empty()) {
            None => {
                let content = OutboundContent::Text {
                    text: OutboundText {
                        preview_url: false,
                        body: truncate(text, MAX_TEXT_LENGTH),
                    },
                };
                self.post(OutboundMessage::new(chat.as_str(), content)).await
            }
            Some(keyboard) if keyboard.len() <= MAX_BUTTONS => {
                let buttons: Vec<Button> = keyboard.buttons().cloned().collect();
                self.send_buttons(chat, text, &buttons).await
            }
            Some(keyboard) => {
                let rows = keyboard
                    .buttons()
                    .map(|b| ListRow {
                        id: b.data.clone(),
                        title: b.label.clone(),
                        description: None,
                    })
                    .collect();
                let sections = [ListSection {
                    title: "Options".into(),
                    rows,
                }];
                self.send_list(chat, text, "Choose", &sections).await
            }
        }
    }

    async fn send_buttons(&self, chat: &ChatId, body: &str, buttons: &[Button]) -> bool {
        if buttons.len() > MAX_BUTTONS {
            warn!(count = buttons.len(), max = MAX_BUTTONS, "dropping reply buttons over the limit");
        }
        let content = OutboundContent::Interactive {
            interactive: reply_buttons(body, buttons),
        };
        self.post(OutboundMessage::new(chat.as_str(), content)).await
    }

    async fn send_list(
        &self,
        chat: &ChatId,
        body: &str,
        button_label: &str,
        sections: &[ListSection],
    ) -> bool {
        let content = OutboundContent::Interactive {
            interactive: list_menu(body, button_label, sections),
        };
        self.post(OutboundMessage::new(chat.as_str(), content)).await
    }

    async fn send_document(
        &self,
        chat: &ChatId,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> bool {
        let Some(sender) = self.sender() else {
            return false;
        };
        let media_id = match media::upload(&sender.api, &sender.phone_number_id, filename, bytes).await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(chat_id = %chat, filename, error = %e, "failed to upload WhatsApp document");
                return false;
            }
        };
        let content = OutboundContent::Document {
            document: DocumentRef {
                id: media_id,
                filename: filename.to_string(),
                caption: caption.map(str::to_string),
            },
        };
        self.post(OutboundMessage::new(chat.as_str(), content)).await
    }

    /// WhatsApp has nothing to acknowledge.
    async fn acknowledge_button(&self, _callback_id: &str) -> bool {
        true
    }
}
