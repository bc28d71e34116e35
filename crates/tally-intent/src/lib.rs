// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent extraction for the Tally expense bot.
//!
//! Free text is classified into an [`tally_core::Intent`] by asking a chain
//! of LLM providers in priority order. Receipt photos and voice notes are
//! read through a [`tally_core::MediaReader`].

pub mod anthropic;
pub mod extractor;
mod http;
pub mod media;
pub mod openai;
pub mod parse;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use tally_config::model::{IntentConfig, MediaConfig, ProviderKind};
use tally_core::{MediaReader, ProviderAdapter, TallyError};
use tracing::info;

pub use anthropic::AnthropicProvider;
pub use extractor::IntentExtractor;
pub use media::OpenAiMediaReader;
pub use openai::OpenAiProvider;
pub use prompt::ExtractionContext;

/// Instantiate the enabled providers in configured order.
pub fn build_providers(config: &IntentConfig) -> Result<Vec<Arc<dyn ProviderAdapter>>, TallyError> {
    let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
    for entry in config.providers.iter().filter(|p| p.enabled) {
        let provider: Arc<dyn ProviderAdapter> = match entry.kind {
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
                entry.api_key.as_deref(),
                entry.model.clone(),
                entry.base_url.as_deref(),
            )?),
            ProviderKind::Openai => Arc::new(OpenAiProvider::new(
                entry.api_key.as_deref(),
                entry.model.clone(),
                entry.base_url.as_deref(),
            )?),
        };
        providers.push(provider);
    }
    info!(count = providers.len(), "intent providers configured");
    Ok(providers)
}

/// Build the extractor described by `[intent]`.
pub fn build_extractor(config: &IntentConfig) -> Result<IntentExtractor, TallyError> {
    Ok(IntentExtractor::new(
        build_providers(config)?,
        Duration::from_secs(config.timeout_secs),
    ))
}

/// Build the media reader, or `None` when `[media]` is disabled.
pub fn build_media_reader(config: &MediaConfig) -> Result<Option<Arc<dyn MediaReader>>, TallyError> {
    if !config.enabled {
        return Ok(None);
    }
    Ok(Some(Arc::new(OpenAiMediaReader::new(config)?)))
}
