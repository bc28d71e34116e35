// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media download and upload against the Graph API.
//!
//! Inbound media arrives as an id. Resolving it is two requests: the id
//! yields a short-lived URL, and the URL (which also needs the bearer
//! token) yields the bytes.

use reqwest::multipart::{Form, Part};
use tally_core::{MediaPayload, TallyError};
use tracing::debug;

use crate::types::{MediaInfo, UploadedMedia};

/// Endpoint settings shared by every Graph API call.
#[derive(Clone)]
pub struct GraphApi {
    pub client: reqwest::Client,
    pub base_url: String,
    pub version: String,
    pub access_token: String,
}

impl GraphApi {
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.version,
            path.trim_start_matches('/')
        )
    }
}

/// Downloads inbound media by id.
pub async fn download(api: &GraphApi, media_id: &str) -> Result<MediaPayload, TallyError> {
    let response = api
        .client
        .get(api.url(media_id))
        .bearer_auth(&api.access_token)
        .send()
        .await
        .map_err(|e| channel_error("media lookup failed", e))?;
    let response = ensure_success(response, "media lookup").await?;
    let info: MediaInfo = response
        .json()
        .await
        .map_err(|e| channel_error("malformed media lookup response", e))?;

    let response = api
        .client
        .get(&info.url)
        .bearer_auth(&api.access_token)
        .send()
        .await
        .map_err(|e| channel_error("media download failed", e))?;
    let response = ensure_success(response, "media download").await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| channel_error("media download interrupted", e))?;

    debug!(media_id, size = bytes.len(), "downloaded media from WhatsApp");
    Ok(MediaPayload {
        bytes: bytes.to_vec(),
        mime_type: info
            .mime_type
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    })
}

/// Uploads a file for later sending; returns the media id.
pub async fn upload(
    api: &GraphApi,
    phone_number_id: &str,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<String, TallyError> {
    let mime = mime_for(filename);
    let part = Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str(mime)
        .map_err(|e| channel_error("invalid upload mime type", e))?;
    let form = Form::new()
        .text("messaging_product", "whatsapp")
        .text("type", mime)
        .part("file", part);

    let response = api
        .client
        .post(api.url(&format!("{phone_number_id}/media")))
        .bearer_auth(&api.access_token)
        .multipart(form)
        .send()
        .await
        .map_err(|e| channel_error("media upload failed", e))?;
    let response = ensure_success(response, "media upload").await?;
    let uploaded: UploadedMedia = response
        .json()
        .await
        .map_err(|e| channel_error("malformed media upload response", e))?;
    Ok(uploaded.id)
}

/// Maps a non-2xx response to a channel error carrying Meta's message.
pub async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, TallyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    Err(TallyError::channel(format!(
        "WhatsApp {what} returned {}: {detail}",
        status.as_u16()
    )))
}

fn channel_error(message: &str, err: reqwest::Error) -> TallyError {
    TallyError::Channel {
        message: format!("{message}: {err}"),
        source: Some(Box::new(err)),
    }
}

fn mime_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "csv" => "text/csv",
        Some(ext) if ext == "json" => "application/json",
        Some(ext) if ext == "txt" => "text/plain",
        Some(ext) if ext == "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
