// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update filtering and event extraction.
//!
//! Decides whether an incoming Telegram update should reach the dialogue
//! controller, based on chat type and the configured allow-list, then maps
//! it onto a channel-agnostic [`ChannelEvent`].

use tally_core::{ChannelEvent, ChatId, TallyError};
use teloxide::prelude::*;
use teloxide::types::{ChatKind, MaybeInaccessibleMessage, UpdateKind, User};
use tracing::{debug, warn};

use crate::media;

/// Checks whether a sender may use the bot.
///
/// An empty `allowed` list admits everyone. Otherwise an entry must match
/// the chat id, the user id, or the username (with or without `@`).
pub fn is_authorized(user: Option<&User>, chat_id: i64, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    let chat_id_str = chat_id.to_string();
    let user_id_str = user.map(|u| u.id.0.to_string());
    let username = user.and_then(|u| u.username.as_deref());

    allowed.iter().any(|entry| {
        if *entry == chat_id_str || user_id_str.as_deref() == Some(entry.as_str()) {
            return true;
        }
        let clean = entry.strip_prefix('@').unwrap_or(entry);
        username.is_some_and(|name| name.eq_ignore_ascii_case(clean))
    })
}

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Maps one webhook update onto zero or one events.
///
/// `bot` is needed only to download media; without it photos and voice
/// notes are dropped.
pub async fn normalize_update(
    bot: Option<&Bot>,
    update: Update,
    allowed: &[String],
) -> Result<Vec<ChannelEvent>, TallyError> {
    let event = match update.kind {
        UpdateKind::Message(msg) => {
            if !is_dm(&msg) {
                debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                return Ok(Vec::new());
            }
            if !is_authorized(msg.from.as_ref(), msg.chat.id.0, allowed) {
                debug!(chat_id = msg.chat.id.0, "ignoring unauthorized user");
                return Ok(Vec::new());
            }
            message_event(bot, &msg).await?
        }
        UpdateKind::CallbackQuery(query) => {
            let chat_id = callback_chat_id(&query);
            if !is_authorized(Some(&query.from), chat_id, allowed) {
                debug!(chat_id, "ignoring unauthorized callback");
                return Ok(Vec::new());
            }
            callback_event(&query)
        }
        _ => {
            debug!(update_id = update.id.0, "ignoring unsupported update kind");
            None
        }
    };
    Ok(event.into_iter().collect())
}

/// Extracts text, photo, image document, or voice content from a message.
///
/// Returns `None` for unsupported message types (stickers, locations, etc.).
pub async fn message_event(
    bot: Option<&Bot>,
    msg: &Message,
) -> Result<Option<ChannelEvent>, TallyError> {
    let chat_id = ChatId::new(msg.chat.id.0.to_string());

    if let Some(text) = msg.text() {
        return Ok(Some(ChannelEvent::Text {
            chat_id,
            text: text.to_string(),
        }));
    }

    let has_media = msg.photo().is_some() || msg.document().is_some() || msg.voice().is_some();
    let Some(bot) = bot.filter(|_| has_media) else {
        if has_media {
            warn!(chat_id = %chat_id, "media received but Telegram is not configured to download it");
        } else {
            debug!(msg_id = msg.id.0, "ignoring unsupported message type");
        }
        return Ok(None);
    };

    let caption = msg.caption().map(str::to_string);

    if let Some(photos) = msg.photo() {
        let media = media::photo_payload(bot, photos).await?;
        return Ok(Some(ChannelEvent::Image {
            chat_id,
            media,
            caption,
        }));
    }

    if let Some(doc) = msg.document() {
        return Ok(media::image_document_payload(bot, doc)
            .await?
            .map(|media| ChannelEvent::Image {
                chat_id,
                media,
                caption,
            }));
    }

    if let Some(voice) = msg.voice() {
        let media = media::voice_payload(bot, voice).await?;
        return Ok(Some(ChannelEvent::Voice { chat_id, media }));
    }

    Ok(None)
}

/// Maps an inline keyboard tap onto a button event.
///
/// Callback queries without data (game buttons) are ignored.
pub fn callback_event(query: &CallbackQuery) -> Option<ChannelEvent> {
    let data = query.data.clone()?;
    Some(ChannelEvent::Button {
        chat_id: ChatId::new(callback_chat_id(query).to_string()),
        callback_id: Some(query.id.0.clone()),
        data,
    })
}

/// The chat the tapped keyboard lives in, falling back to the user's DM.
fn callback_chat_id(query: &CallbackQuery) -> i64 {
    match &query.message {
        Some(MaybeInaccessibleMessage::Regular(msg)) => msg.chat.id.0,
        Some(MaybeInaccessibleMessage::Inaccessible(msg)) => msg.chat.id.0,
        None => query.from.id.0 as i64,
    }
}
