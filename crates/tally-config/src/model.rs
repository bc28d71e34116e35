// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tally expense bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. Structs that
//! hold credentials implement `Debug` by hand so secrets never reach logs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level Tally configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram bot integration.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// WhatsApp Cloud API integration.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Intent extraction providers.
    #[serde(default)]
    pub intent: IntentConfig,

    /// Receipt and voice note reading.
    #[serde(default)]
    pub media: MediaConfig,

    /// SQLite storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Webhook HTTP server.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation behavior.
    #[serde(default)]
    pub dialogue: DialogueConfig,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "tally".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables Telegram sends.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` webhook header.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Chat ids allowed to talk to the bot. Empty allows everyone.
    #[serde(default)]
    pub allowed_chats: Vec<String>,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("allowed_chats", &self.allowed_chats)
            .finish()
    }
}

/// WhatsApp Cloud API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Graph API access token. Required, with `phone_number_id`, to send.
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Token echoed during the GET verification handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret for `X-Hub-Signature-256` verification. Unset skips the check.
    #[serde(default)]
    pub app_secret: Option<String>,

    #[serde(default = "default_whatsapp_api_version")]
    pub api_version: String,

    #[serde(default = "default_whatsapp_api_base_url")]
    pub api_base_url: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            verify_token: None,
            app_secret: None,
            api_version: default_whatsapp_api_version(),
            api_base_url: default_whatsapp_api_base_url(),
        }
    }
}

impl fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("access_token", &redact(&self.access_token))
            .field("phone_number_id", &self.phone_number_id)
            .field("verify_token", &redact(&self.verify_token))
            .field("app_secret", &redact(&self.app_secret))
            .field("api_version", &self.api_version)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

fn default_whatsapp_api_version() -> String {
    "v21.0".to_string()
}

fn default_whatsapp_api_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

/// Intent extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntentConfig {
    /// Per-provider call timeout. Elapsed counts as a provider failure.
    #[serde(default = "default_intent_timeout_secs")]
    pub timeout_secs: u64,

    /// Providers in priority order. Empty means extraction is unavailable
    /// and every message classifies as `unknown`.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_intent_timeout_secs(),
            providers: Vec::new(),
        }
    }
}

fn default_intent_timeout_secs() -> u64 {
    20
}

/// LLM API flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI-compatible Chat Completions API.
    Openai,
}

/// One entry of `[[intent.providers]]`.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    #[serde(default)]
    pub api_key: Option<String>,

    pub model: String,

    /// Overrides the vendor's default endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("enabled", &self.enabled)
            .finish()
    }
}

fn default_true() -> bool {
    true
}

/// Receipt (vision) and voice (transcription) configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI-compatible endpoint serving chat completions and transcriptions.
    #[serde(default = "default_media_base_url")]
    pub base_url: String,

    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: default_media_base_url(),
            vision_model: default_vision_model(),
            transcription_model: default_transcription_model(),
        }
    }
}

impl fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("vision_model", &self.vision_model)
            .field("transcription_model", &self.transcription_model)
            .finish()
    }
}

fn default_media_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tally").join("tally.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "tally.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Webhook HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

/// Conversation behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialogueConfig {
    /// Guided-flow states older than this are discarded on the next message.
    /// `0` keeps states indefinitely.
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,

    /// Ask for confirmation before resetting a category.
    #[serde(default = "default_true")]
    pub confirm_reset: bool,

    /// Category used when a free-text expense names none.
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Payment method used when a free-text expense names none.
    /// `None` uses the channel's display name ("Telegram", "WhatsApp").
    #[serde(default)]
    pub default_payment_method: Option<String>,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// How many expenses "recent expenses" lists.
    #[serde(default = "default_recent_expenses_limit")]
    pub recent_expenses_limit: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            state_ttl_secs: default_state_ttl_secs(),
            confirm_reset: true,
            default_category: default_category(),
            default_payment_method: None,
            currency_symbol: default_currency_symbol(),
            recent_expenses_limit: default_recent_expenses_limit(),
        }
    }
}

fn default_state_ttl_secs() -> u64 {
    3600
}

fn default_category() -> String {
    "Uncategorized".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_recent_expenses_limit() -> usize {
    10
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = TallyConfig::default();
        config.telegram.bot_token = Some("123:SECRET".into());
        config.whatsapp.app_secret = Some("hush".into());
        config.intent.providers.push(ProviderConfig {
            kind: ProviderKind::Anthropic,
            api_key: Some("sk-ant-SECRET".into()),
            model: "claude-haiku".into(),
            base_url: None,
            enabled: true,
        });
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("SECRET"));
        assert!(!rendered.contains("hush"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("claude-haiku"));
    }

    #[test]
    fn providers_keep_declaration_order() {
        let toml_str = r#"
[[intent.providers]]
kind = "openai"
model = "gpt-4o-mini"

[[intent.providers]]
kind = "anthropic"
model = "claude-haiku"
enabled = false
"#;
        let config: TallyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.intent.providers.len(), 2);
        assert_eq!(config.intent.providers[0].kind, ProviderKind::Openai);
        assert!(config.intent.providers[0].enabled);
        assert!(!config.intent.providers[1].enabled);
    }

    #[test]
    fn unknown_provider_kind_is_rejected() {
        let toml_str = r#"
[[intent.providers]]
kind = "gemini"
model = "x"
"#;
        assert!(toml::from_str::<TallyConfig>(toml_str).is_err());
    }
}
