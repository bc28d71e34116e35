// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal channel adapter behind `tally shell`.
//!
//! Options offered by the last reply are printed numbered; typing a number
//! taps that option. `/photo <path>` and `/voice <path>` send a local file
//! as a receipt image or voice note.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use colored::Colorize;
use tokio::sync::Mutex;
use tracing::warn;

use tally_core::{
    AdapterType, Button, ChannelAdapter, ChannelCapabilities, ChannelEvent, ChatId, HealthStatus,
    Keyboard, ListSection, MediaPayload, PluginAdapter, TallyError,
};
use tally_telegram::markdown::to_plain;

/// Where rendered replies go.
enum Output {
    Stdout,
    #[cfg_attr(not(test), allow(dead_code))]
    Captured(Mutex<Vec<String>>),
}

pub struct ConsoleChannel {
    chat: ChatId,
    download_dir: PathBuf,
    /// Callback data of the options shown last, in printed order.
    options: Mutex<Vec<String>>,
    output: Output,
}

impl ConsoleChannel {
    pub fn new(chat: ChatId, download_dir: PathBuf) -> Self {
        Self {
            chat,
            download_dir,
            options: Mutex::new(Vec::new()),
            output: Output::Stdout,
        }
    }

    /// Keeps rendered replies in memory instead of printing them.
    #[cfg(test)]
    fn capturing(chat: ChatId, download_dir: PathBuf) -> Self {
        Self {
            output: Output::Captured(Mutex::new(Vec::new())),
            ..Self::new(chat, download_dir)
        }
    }

    #[cfg(test)]
    async fn transcript(&self) -> Vec<String> {
        match &self.output {
            Output::Captured(lines) => lines.lock().await.clone(),
            Output::Stdout => Vec::new(),
        }
    }

    async fn emit(&self, block: String) {
        match &self.output {
            Output::Stdout => println!("{block}"),
            Output::Captured(lines) => lines.lock().await.push(block),
        }
    }

    /// Prints `body` followed by numbered options, remembering their data.
    async fn show(&self, body: &str, options: Vec<(String, String, Option<String>)>) {
        let mut block = to_plain(body);
        let mut offered = Vec::with_capacity(options.len());
        for (n, (label, data, description)) in options.into_iter().enumerate() {
            block.push_str(&format!("\n  {} {label}", format!("[{}]", n + 1).cyan()));
            if let Some(description) = description {
                block.push_str(&format!("  {}", description.dimmed()));
            }
            offered.push(data);
        }
        *self.options.lock().await = offered;
        self.emit(block).await;
    }

    async fn tapped(&self, input: &str) -> Option<String> {
        let n: usize = input.parse().ok()?;
        let options = self.options.lock().await;
        n.checked_sub(1).and_then(|i| options.get(i)).cloned()
    }
}

fn button_options<'a>(buttons: impl Iterator<Item = &'a Button>) -> Vec<(String, String, Option<String>)> {
    buttons
        .map(|b| (b.label.clone(), b.data.clone(), None))
        .collect()
}

/// Reads a local file as media, guessing the mime type from its extension.
async fn read_media(path: &Path) -> Result<MediaPayload, TallyError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TallyError::channel(format!("cannot read {}: {e}", path.display())))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "ogg" | "oga" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    };
    Ok(MediaPayload {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

#[async_trait]
impl PluginAdapter for ConsoleChannel {
    fn name(&self) -> &str {
        "shell"
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
impl ChannelAdapter for ConsoleChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            inline_keyboards: true,
            max_buttons: 100,
            max_list_rows: 100,
            max_message_length: usize::MAX,
            supports_documents: true,
            supports_images: true,
            supports_voice: true,
        }
    }

    fn display_name(&self) -> &str {
        "Shell"
    }

    /// Turns one typed line into an event.
    async fn normalize_inbound(&self, raw: &[u8]) -> Result<Vec<ChannelEvent>, TallyError> {
        let line = String::from_utf8_lossy(raw).trim().to_string();
        if line.is_empty() {
            return Ok(Vec::new());
        }
        let chat_id = self.chat.clone();

        if let Some(path) = line.strip_prefix("/photo ") {
            let (path, caption) = match path.trim().split_once(' ') {
                Some((path, caption)) => (path, Some(caption.trim().to_string())),
                None => (path.trim(), None),
            };
            let media = read_media(Path::new(path)).await?;
            return Ok(vec![ChannelEvent::Image {
                chat_id,
                media,
                caption,
            }]);
        }
        if let Some(path) = line.strip_prefix("/voice ") {
            let media = read_media(Path::new(path.trim())).await?;
            return Ok(vec![ChannelEvent::Voice { chat_id, media }]);
        }

        if let Some(data) = self.tapped(&line).await {
            return Ok(vec![ChannelEvent::Button {
                chat_id,
                callback_id: None,
                data,
            }]);
        }
        Ok(vec![ChannelEvent::Text {
            chat_id,
            text: line,
        }])
    }

    async fn send_text(&self, _chat: &ChatId, text: &str, keyboard: Option<&Keyboard>) -> bool {
        let options = keyboard
            .map(|k| button_options(k.buttons()))
            .unwrap_or_default();
        self.show(text, options).await;
        true
    }

    async fn send_buttons(&self, _chat: &ChatId, body: &str, buttons: &[Button]) -> bool {
        self.show(body, button_options(buttons.iter())).await;
        true
    }

    async fn send_list(
        &self,
        _chat: &ChatId,
        body: &str,
        _button_label: &str,
        sections: &[ListSection],
    ) -> bool {
        let options = sections
            .iter()
            .flat_map(|s| s.rows.iter())
            .map(|r| (r.title.clone(), r.id.clone(), r.description.clone()))
            .collect();
        self.show(body, options).await;
        true
    }

    async fn send_document(
        &self,
        _chat: &ChatId,
        filename: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> bool {
        let path = self.download_dir.join(filename);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            warn!(path = %path.display(), error = %e, "failed to save document");
            return false;
        }
        let mut block = format!("{} {}", "saved".green(), path.display());
        if let Some(caption) = caption {
            block = format!("{}\n{block}", to_plain(caption));
        }
        self.emit(block).await;
        true
    }

    async fn acknowledge_button(&self, _callback_id: &str) -> bool {
        true
    }
}
