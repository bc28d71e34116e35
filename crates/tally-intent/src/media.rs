// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receipt reading and voice transcription over the OpenAI API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tally_config::model::MediaConfig;
use tally_core::{
    AdapterType, ExpenseDraft, HealthStatus, MediaPayload, MediaReader, PluginAdapter, TallyError,
};
use tracing::{debug, info};

use crate::http;
use crate::openai::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat, bearer_headers};
use crate::parse::parse_json_object;

const RECEIPT_PROMPT: &str = "Read this receipt and reply with a single JSON object:
{\"amount\": total paid as a number, \"description\": merchant or short summary, \"category\": a one-word spending category, \"date\": \"YYYY-MM-DD\" if printed}
Omit any field you cannot read.";

const RECEIPT_MAX_TOKENS: u32 = 300;

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// OpenAI-backed [`MediaReader`]: vision chat completions for receipts,
/// the transcription endpoint for voice notes.
#[derive(Debug, Clone)]
pub struct OpenAiMediaReader {
    client: reqwest::Client,
    base_url: String,
    vision_model: String,
    transcription_model: String,
}

impl OpenAiMediaReader {
    pub fn new(config: &MediaConfig) -> Result<Self, TallyError> {
        let api_key = http::resolve_api_key(config.api_key.as_deref(), "OPENAI_API_KEY")
            .ok_or_else(|| {
                TallyError::Config("media reading needs api_key or OPENAI_API_KEY".to_string())
            })?;

        info!(
            vision_model = %config.vision_model,
            transcription_model = %config.transcription_model,
            "media reader initialized"
        );

        Ok(Self {
            client: http::build_client(bearer_headers(&api_key)?, Duration::from_secs(90))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            vision_model: config.vision_model.clone(),
            transcription_model: config.transcription_model.clone(),
        })
    }
}

/// File name sent with a transcription upload; the API sniffs format from it.
fn audio_file_name(mime_type: &str) -> &'static str {
    match mime_type.split(';').next().unwrap_or_default().trim() {
        "audio/mpeg" | "audio/mp3" => "voice.mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "voice.m4a",
        "audio/wav" | "audio/x-wav" => "voice.wav",
        "audio/webm" => "voice.webm",
        _ => "voice.ogg",
    }
}

#[async_trait]
impl PluginAdapter for OpenAiMediaReader {
    fn name(&self) -> &str {
        "openai-media"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Media
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        Ok(())
    }
}

#[async_trait]
impl MediaReader for OpenAiMediaReader {
    async fn read_receipt(&self, image: &MediaPayload) -> Result<ExpenseDraft, TallyError> {
        let data_url = format!(
            "data:{};base64,{}",
            image.mime_type,
            STANDARD.encode(&image.bytes)
        );
        let body = ChatRequest {
            model: &self.vision_model,
            max_tokens: RECEIPT_MAX_TOKENS,
            messages: vec![ChatMessage {
                role: "user",
                content: serde_json::json!([
                    {"type": "text", "text": RECEIPT_PROMPT},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ]),
            }],
            response_format: Some(ResponseFormat::json_object()),
        };

        let url = format!("{}/chat/completions", self.base_url);
        let raw = http::post_json(&self.client, &url, &body, 1, "OpenAI").await?;
        let (text, _) = ChatResponse::first_text(&raw)?;
        let draft: ExpenseDraft = parse_json_object(&text)?;
        debug!(amount = ?draft.amount, "receipt read");
        Ok(draft)
    }

    async fn transcribe(&self, audio: &MediaPayload) -> Result<String, TallyError> {
        let part = Part::bytes(audio.bytes.clone())
            .file_name(audio_file_name(&audio.mime_type))
            .mime_str(&audio.mime_type)
            .map_err(|e| TallyError::Provider {
                message: format!("invalid audio mime type: {e}"),
                source: Some(Box::new(e)),
            })?;
        let form = Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        let url = format!("{}/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TallyError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TallyError::provider(http::describe_error(
                "OpenAI", status, &text,
            )));
        }

        let parsed: TranscriptionResponse =
            serde_json::from_str(&text).map_err(|e| TallyError::Provider {
                message: format!("failed to parse transcription: {e}"),
                source: Some(Box::new(e)),
            })?;
        let transcript = parsed.text.trim().to_string();
        if transcript.is_empty() {
            return Err(TallyError::provider("transcription was empty"));
        }
        Ok(transcript)
    }
}
