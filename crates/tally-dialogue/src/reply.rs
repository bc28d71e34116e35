// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound replies and their delivery through a channel's capabilities.

use tally_core::{ChannelAdapter, ChatId, Keyboard, ListRow, ListSection};
use tracing::debug;

use crate::callback::Callback;
use crate::keyboards;

/// A file attached to a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// What the bot says back: text, an optional keyboard, an optional file.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub document: Option<Document>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            document: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Attach the main menu, the usual follow-up to a terminal action.
    pub fn with_menu(self) -> Self {
        self.with_keyboard(keyboards::main_menu())
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }
}

/// Send a reply, adapting the keyboard to what the channel can render.
///
/// Inline keyboards are used where supported. Otherwise up to
/// `max_buttons` become reply buttons and larger keyboards become list
/// menus of at most `max_list_rows` rows each, see [`list_pages`]. Send
/// failures are already logged by the adapter and are not reported back.
pub async fn deliver(channel: &dyn ChannelAdapter, chat: &ChatId, reply: &Reply) {
    let caps = channel.capabilities();
    let chunks = split_text(&reply.text, caps.max_message_length);
    let (last, leading) = match chunks.split_last() {
        Some(split) => split,
        None => return,
    };
    for chunk in leading {
        channel.send_text(chat, chunk, None).await;
    }

    match &reply.keyboard {
        None => {
            channel.send_text(chat, last, None).await;
        }
        Some(keyboard) if keyboard.is_empty() => {
            channel.send_text(chat, last, None).await;
        }
        Some(keyboard) if caps.inline_keyboards => {
            channel.send_text(chat, last, Some(keyboard)).await;
        }
        Some(keyboard) if keyboard.len() <= caps.max_buttons => {
            let buttons: Vec<_> = keyboard.buttons().cloned().collect();
            channel.send_buttons(chat, last, &buttons).await;
        }
        Some(keyboard) => {
            let rows: Vec<ListRow> = keyboard
                .buttons()
                .map(|b| ListRow {
                    id: b.data.clone(),
                    title: b.label.clone(),
                    description: None,
                })
                .collect();
            let pages = list_pages(rows, caps.max_list_rows);
            if pages.len() > 1 {
                debug!(chat_id = %chat, pages = pages.len(), "list menu split across messages");
            }
            let total = pages.len();
            for (n, rows) in pages.into_iter().enumerate() {
                let body = if n == 0 {
                    last.clone()
                } else {
                    format!("More options ({}/{total})", n + 1)
                };
                let sections = [ListSection {
                    title: "Options".to_string(),
                    rows,
                }];
                channel.send_list(chat, &body, "Choose", &sections).await;
            }
        }
    }

    if let Some(document) = &reply.document {
        if caps.supports_documents {
            channel
                .send_document(
                    chat,
                    &document.filename,
                    document.bytes.clone(),
                    document.caption.as_deref(),
                )
                .await;
        } else {
            debug!(chat_id = %chat, "channel cannot send documents");
            channel
                .send_text(chat, "This channel can't receive files.", None)
                .await;
        }
    }
}

/// Split list rows into pages of at most `max_rows`. A Cancel row is kept
/// out of the paging and repeated at the end of every page, so each list
/// message can still be backed out of. A zero limit disables paging.
pub fn list_pages(mut rows: Vec<ListRow>, max_rows: usize) -> Vec<Vec<ListRow>> {
    if max_rows == 0 || rows.len() <= max_rows {
        return vec![rows];
    }
    let cancel_id = Callback::Cancel.encode();
    let cancel = rows
        .iter()
        .position(|r| r.id == cancel_id)
        .map(|i| rows.remove(i));
    let per_page = match &cancel {
        Some(_) => (max_rows - 1).max(1),
        None => max_rows,
    };
    rows.chunks(per_page)
        .map(|chunk| {
            let mut page = chunk.to_vec();
            page.extend(cancel.clone());
            page
        })
        .collect()
}

/// Split text into chunks no longer than `max_len` characters, preferring
/// line breaks. A zero limit disables splitting.
pub fn split_text(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 || text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if line.chars().count() > max_len {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_len) {
                chunks.push(piece.iter().collect());
            }
        } else {
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("hello", 10), vec!["hello".to_string()]);
        assert_eq!(split_text("hello", 0), vec!["hello".to_string()]);
    }

    #[test]
    fn long_text_splits_on_lines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_text(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc".to_string()]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn overlong_line_is_hard_split() {
        let chunks = split_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    fn rows(ids: &[&str]) -> Vec<ListRow> {
        ids.iter()
            .map(|id| ListRow {
                id: id.to_string(),
                title: id.to_uppercase(),
                description: None,
            })
            .collect()
    }

    fn ids(page: &[ListRow]) -> Vec<&str> {
        page.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn short_list_is_one_page() {
        let pages = list_pages(rows(&["a", "b", "cancel"]), 10);
        assert_eq!(pages.len(), 1);
        assert_eq!(ids(&pages[0]), ["a", "b", "cancel"]);
    }

    #[test]
    fn cancel_is_repeated_on_every_page() {
        let pages = list_pages(rows(&["a", "b", "c", "d", "e", "cancel"]), 3);
        let pages: Vec<_> = pages.iter().map(|p| ids(p)).collect();
        assert_eq!(
            pages,
            vec![vec!["a", "b", "cancel"], vec!["c", "d", "cancel"], vec!["e", "cancel"]]
        );
    }

    #[test]
    fn pages_without_cancel_use_the_full_limit() {
        let ids: Vec<String> = (0..11).map(|i| format!("menu:{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let pages = list_pages(rows(&refs), 10);
        assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), [10, 1]);
    }

    #[test]
    fn builders_compose() {
        let reply = Reply::text("hi").with_menu().with_document(Document {
            filename: "a.csv".into(),
            bytes: b"x".to_vec(),
            caption: None,
        });
        assert!(reply.keyboard.is_some());
        assert_eq!(reply.document.unwrap().filename, "a.csv");
    }
}
