// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted provider and media reader for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured JSON
//! replies so intent extraction runs its real parsing path without any
//! external API calls.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tally_core::{
    AdapterType, CompletionRequest, CompletionResponse, ExpenseDraft, HealthStatus, MediaPayload,
    MediaReader, PluginAdapter, ProviderAdapter, TallyError,
};

/// Reply used when the queue runs dry.
const DEFAULT_REPLY: &str = r#"{"action":"unknown"}"#;

/// A mock LLM provider that returns queued responses.
///
/// Responses are popped from a FIFO queue. `Err` entries surface as
/// provider errors. When the queue is empty an `unknown` intent is returned.
pub struct MockProvider {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    latency: Mutex<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            prompts: Mutex::new(Vec::new()),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a failed completion.
    pub async fn add_failure(&self, message: impl Into<String>) {
        self.responses.lock().await.push_back(Err(message.into()));
    }

    /// Delay every completion by `latency`, like a slow model.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.lock().await = latency;
    }

    /// User prompts received, in order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, TallyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TallyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, TallyError> {
        self.prompts.lock().await.push(request.prompt);
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let next = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()));
        match next {
            Ok(text) => Ok(CompletionResponse {
                text,
                model: "mock-model".to_string(),
            }),
            Err(message) => Err(TallyError::provider(message)),
        }
    }
}

/// A media reader with queued receipt drafts and transcripts.
#[derive(Default)]
pub struct MockMediaReader {
    receipts: Mutex<VecDeque<Result<ExpenseDraft, String>>>,
    transcripts: Mutex<VecDeque<Result<String, String>>>,
    seen: Mutex<Vec<String>>,
}

impl MockMediaReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_receipt(&self, draft: ExpenseDraft) {
        self.receipts.lock().await.push_back(Ok(draft));
    }

    pub async fn add_receipt_failure(&self, message: impl Into<String>) {
        self.receipts.lock().await.push_back(Err(message.into()));
    }

    pub async fn add_transcript(&self, text: impl Into<String>) {
        self.transcripts.lock().await.push_back(Ok(text.into()));
    }

    pub async fn add_transcript_failure(&self, message: impl Into<String>) {
        self.transcripts.lock().await.push_back(Err(message.into()));
    }

    /// MIME types of every payload received.
    pub async fn seen(&self) -> Vec<String> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockMediaReader {
    fn name(&self) -> &str {
        "mock-media"
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
impl MediaReader for MockMediaReader {
    async fn read_receipt(&self, image: &MediaPayload) -> Result<ExpenseDraft, TallyError> {
        self.seen.lock().await.push(image.mime_type.clone());
        match self.receipts.lock().await.pop_front() {
            Some(Ok(draft)) => Ok(draft),
            Some(Err(message)) => Err(TallyError::provider(message)),
            None => Ok(ExpenseDraft::default()),
        }
    }

    async fn transcribe(&self, audio: &MediaPayload) -> Result<String, TallyError> {
        self.seen.lock().await.push(audio.mime_type.clone());
        match self.transcripts.lock().await.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(TallyError::provider(message)),
            None => Ok(String::new()),
        }
    }
}
