// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API payload types.
//!
//! Inbound types cover the subset of the webhook notification the bot
//! reads; unknown fields are ignored. Outbound types serialize to the
//! `/{phone_number_id}/messages` request body.

use serde::{Deserialize, Serialize};

// --- Inbound webhook ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl WebhookPayload {
    /// All inbound messages across every entry and change, in delivery order.
    pub fn messages(&self) -> impl Iterator<Item = &InboundMessage> {
        self.entry
            .iter()
            .flat_map(|entry| &entry.changes)
            .filter(|change| change.field == "messages")
            .flat_map(|change| &change.value.messages)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Sender's WhatsApp id (phone number without `+`).
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<TextBody>,
    pub interactive: Option<InteractiveReply>,
    /// Quick-reply button on a template message.
    pub button: Option<TemplateButton>,
    pub image: Option<MediaRef>,
    pub audio: Option<MediaRef>,
    pub document: Option<MediaRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractiveReply {
    pub button_reply: Option<ReplyChoice>,
    pub list_reply: Option<ReplyChoice>,
}

impl InteractiveReply {
    /// The id of whichever button or list row was chosen.
    pub fn chosen_id(&self) -> Option<&str> {
        self.button_reply
            .as_ref()
            .or(self.list_reply.as_ref())
            .map(|choice| choice.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyChoice {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateButton {
    pub payload: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaRef {
    pub id: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
}

/// Response of `GET /{media_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    pub url: String,
    pub mime_type: Option<String>,
}

/// Response of `POST /{phone_number_id}/media`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedMedia {
    pub id: String,
}

// --- Outbound messages ---

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: String,
    #[serde(flatten)]
    pub content: OutboundContent,
}

impl OutboundMessage {
    pub fn new(to: impl Into<String>, content: OutboundContent) -> Self {
        Self {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: to.into(),
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundContent {
    Text { text: OutboundText },
    Interactive { interactive: Interactive },
    Document { document: DocumentRef },
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundText {
    pub preview_url: bool,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interactive {
    Button {
        body: TextBody,
        action: ButtonAction,
    },
    List {
        body: TextBody,
        action: ListAction,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ButtonAction {
    pub buttons: Vec<ReplyButton>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyButton {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub reply: ReplyButtonBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyButtonBody {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListAction {
    pub button: String,
    pub sections: Vec<OutboundSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundSection {
    pub title: String,
    pub rows: Vec<OutboundRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundRow {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentRef {
    pub id: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}
