// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Tally configuration system.

use tally_config::diagnostic::ConfigError;
use tally_config::model::{ProviderKind, TallyConfig};
use tally_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_tally_config() {
    let toml = r#"
[bot]
name = "ledger"
log_level = "debug"

[telegram]
bot_token = "123:ABC"
webhook_secret = "s3cret"
allowed_chats = ["42"]

[whatsapp]
access_token = "EAAG"
phone_number_id = "1055"
verify_token = "verify-me"
app_secret = "appsecret"

[intent]
timeout_secs = 5

[[intent.providers]]
kind = "anthropic"
api_key = "sk-ant-123"
model = "claude-haiku-4-5"

[[intent.providers]]
kind = "openai"
api_key = "sk-123"
model = "gpt-4o-mini"
base_url = "http://localhost:11434/v1"

[media]
enabled = true
api_key = "sk-media"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[gateway]
host = "0.0.0.0"
port = 9000

[dialogue]
state_ttl_secs = 0
confirm_reset = false
default_category = "General"
default_payment_method = "Cash"
currency_symbol = "€"
recent_expenses_limit = 5
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.bot.name, "ledger");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.allowed_chats, vec!["42"]);
    assert_eq!(config.whatsapp.phone_number_id.as_deref(), Some("1055"));
    assert_eq!(config.whatsapp.api_version, "v21.0");
    assert_eq!(config.intent.timeout_secs, 5);
    assert_eq!(config.intent.providers.len(), 2);
    assert_eq!(config.intent.providers[0].kind, ProviderKind::Anthropic);
    assert_eq!(
        config.intent.providers[1].base_url.as_deref(),
        Some("http://localhost:11434/v1")
    );
    assert!(config.media.enabled);
    assert_eq!(config.media.transcription_model, "whisper-1");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.dialogue.state_ttl_secs, 0);
    assert!(!config.dialogue.confirm_reset);
    assert_eq!(config.dialogue.default_payment_method.as_deref(), Some("Cash"));
    assert_eq!(config.dialogue.currency_symbol, "€");
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.bot.name, "tally");
    assert_eq!(config.bot.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.telegram.allowed_chats.is_empty());
    assert!(config.whatsapp.access_token.is_none());
    assert_eq!(config.whatsapp.api_base_url, "https://graph.facebook.com");
    assert_eq!(config.intent.timeout_secs, 20);
    assert!(config.intent.providers.is_empty());
    assert!(!config.media.enabled);
    assert!(config.storage.wal_mode);
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.dialogue.state_ttl_secs, 3600);
    assert!(config.dialogue.confirm_reset);
    assert_eq!(config.dialogue.default_category, "Uncategorized");
    assert!(config.dialogue.default_payment_method.is_none());
    assert_eq!(config.dialogue.recent_expenses_limit, 10);
}

/// Unknown field in [telegram] produces an unknown-key diagnostic with a suggestion.
#[test]
fn unknown_field_in_telegram_suggests_fix() {
    let toml = r#"
[telegram]
bot_tken = "abc"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "bot_tken"
                && suggestion.as_deref() == Some("bot_token")
                && valid_keys.contains("allowed_chats")
        })
    });
    assert!(found, "expected UnknownKey for bot_tken, got: {errors:?}");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[gateway]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port"))),
        "expected InvalidType for gateway.port, got: {errors:?}"
    );
}

/// Validation errors surface through load_and_validate_str.
#[test]
fn validation_rejects_zero_timeout() {
    let toml = r#"
[intent]
timeout_secs = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero timeout should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("timeout_secs"))
    ));
}

/// `TALLY_TELEGRAM_BOT_TOKEN` maps to telegram.bot_token and nested env keys keep underscores.
#[test]
fn env_vars_override_toml() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "tally.toml",
            r#"
[bot]
name = "from-toml"

[dialogue]
state_ttl_secs = 60
"#,
        )?;
        jail.set_env("TALLY_BOT_NAME", "from-env");
        jail.set_env("TALLY_TELEGRAM_BOT_TOKEN", "123:env");
        jail.set_env("TALLY_DIALOGUE_STATE_TTL_SECS", "120");

        let config = tally_config::load_config()?;
        assert_eq!(config.bot.name, "from-env");
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:env"));
        assert_eq!(config.dialogue.state_ttl_secs, 120);
        Ok(())
    });
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_file_path_uses_defaults() {
    let config: TallyConfig =
        tally_config::load_config_from_path(std::path::Path::new("/nonexistent/tally.toml"))
            .expect("missing file should be silently skipped");
    assert_eq!(config.bot.name, "tally");
}

/// ConfigError renders through miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "naem".to_string(),
        section: "bot".to_string(),
        suggestion: Some("name".to_string()),
        valid_keys: "name, log_level".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `name`"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("naem"));
    assert!(buf.contains("[bot]"));
}

/// A misspelled section is named as a section, with the closest real one.
#[test]
fn misspelled_section_suggests_the_real_one() {
    let errors = load_and_validate_str("[telegrm]\nbot_token = \"x\"\n")
        .expect_err("unknown section should be rejected");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownSection { name, suggestion, .. }
                if name == "telegrm" && suggestion.as_deref() == Some("telegram")
        )),
        "got: {errors:?}"
    );
}

/// Errors in a config file point at the offending line.
#[test]
fn file_errors_carry_a_span() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.toml");
    std::fs::write(&path, "[gateway]\nhost = \"0.0.0.0\"\nprot = 8080\n").unwrap();

    let errors = tally_config::load_and_validate_path(&path).expect_err("typo should be rejected");
    let Some(ConfigError::UnknownKey { section, span, .. }) = errors
        .iter()
        .find(|e| matches!(e, ConfigError::UnknownKey { .. }))
    else {
        panic!("expected UnknownKey, got: {errors:?}");
    };
    assert_eq!(section, "gateway");
    let span = span.as_ref().expect("file-backed key should be located");
    assert_eq!(span.offset(), "[gateway]\nhost = \"0.0.0.0\"\n".len());
}
