// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media download for Telegram messages.
//!
//! Receipts and voice notes arrive as file references; the bytes are fetched
//! here so the dialogue layer only ever sees a [`MediaPayload`].

use tally_core::{MediaPayload, TallyError};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{Document, FileMeta, PhotoSize, Voice};
use tracing::debug;

/// Downloads a file from Telegram servers by its file metadata.
///
/// Uses the Bot API's `getFile` to resolve the file path, then downloads
/// the file content as bytes.
pub async fn download_file(bot: &Bot, file_meta: &FileMeta) -> Result<Vec<u8>, TallyError> {
    let file = bot
        .get_file(file_meta.id.clone())
        .await
        .map_err(|e| TallyError::Channel {
            message: format!("failed to get file info: {e}"),
            source: Some(Box::new(e)),
        })?;

    let mut buf = Vec::new();
    bot.download_file(&file.path, &mut buf)
        .await
        .map_err(|e| TallyError::Channel {
            message: format!("failed to download file: {e}"),
            source: Some(Box::new(e)),
        })?;

    debug!(
        file_id = %file_meta.id,
        size = buf.len(),
        "downloaded file from Telegram"
    );
    Ok(buf)
}

/// Downloads the largest variant of a photo (Telegram lists sizes ascending).
pub async fn photo_payload(bot: &Bot, photos: &[PhotoSize]) -> Result<MediaPayload, TallyError> {
    let largest = photos
        .last()
        .ok_or_else(|| TallyError::channel("photo array is empty"))?;

    Ok(MediaPayload {
        bytes: download_file(bot, &largest.file).await?,
        mime_type: "image/jpeg".to_string(),
    })
}

/// Downloads an image sent as a file (uncompressed photo).
///
/// Returns `None` for documents that are not images.
pub async fn image_document_payload(
    bot: &Bot,
    doc: &Document,
) -> Result<Option<MediaPayload>, TallyError> {
    let Some(mime_type) = doc.mime_type.as_ref().map(|m| m.to_string()) else {
        return Ok(None);
    };
    if !is_image_mime(&mime_type) {
        return Ok(None);
    }

    Ok(Some(MediaPayload {
        bytes: download_file(bot, &doc.file).await?,
        mime_type,
    }))
}

pub async fn voice_payload(bot: &Bot, voice: &Voice) -> Result<MediaPayload, TallyError> {
    let mime_type = voice
        .mime_type
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "audio/ogg".to_string());

    Ok(MediaPayload {
        bytes: download_file(bot, &voice.file).await?,
        mime_type,
    })
}

fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_documents_count_as_receipts() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("image/jpeg"));
        assert!(!is_image_mime("application/pdf"));
        assert!(!is_image_mime("text/csv"));
    }
}
