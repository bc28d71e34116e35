// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the assembled bot.
//!
//! Each test loads a TOML config, points the LLM and messaging APIs at
//! wiremock servers, and drives the gateway router with raw webhook bodies.
//! Assertions look at the SQLite ledger and at what the platform APIs received.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tally_config::TallyConfig;
use tally_core::{ConversationStore, DateRange, LedgerStore};
use tally_dialogue::DialogueController;
use tally_gateway::{GatewayState, router};
use tally_storage::SqliteStore;
use tally_telegram::TelegramChannel;
use tally_whatsapp::WhatsAppChannel;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOT_TOKEN: &str = "123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11";
const SECRET: &str = "hook-secret";

struct Bot {
    state: GatewayState,
    store: Arc<SqliteStore>,
    _dir: tempfile::TempDir,
}

impl Bot {
    async fn start(config: TallyConfig, dir: tempfile::TempDir, telegram_api: &str) -> Self {
        let store = Arc::new(SqliteStore::new(config.storage.clone()));
        store.initialize().await.unwrap();
        let extractor = tally_intent::build_extractor(&config.intent).unwrap();
        let controller = Arc::new(DialogueController::new(
            store.clone(),
            store.clone(),
            Arc::new(extractor),
            config.dialogue.clone(),
        ));

        let telegram = TelegramChannel::new(config.telegram.clone())
            .with_api_url(telegram_api)
            .unwrap();
        let state = GatewayState::new(controller)
            .with_telegram(Arc::new(telegram))
            .with_whatsapp(Arc::new(WhatsAppChannel::new(config.whatsapp.clone())));
        Self {
            state,
            store,
            _dir: dir,
        }
    }

    /// Posts a webhook body and waits for the controller to finish with it.
    async fn post(&self, uri: &str, headers: &[(&str, &str)], body: String) -> StatusCode {
        let mut request = Request::builder().method("POST").uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = router(self.state.clone())
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();

        self.state.tasks.close();
        self.state.tasks.wait().await;
        self.state.tasks.reopen();
        response.status()
    }

    async fn telegram(&self, update: serde_json::Value) -> StatusCode {
        self.post(
            "/telegram/webhook",
            &[("x-telegram-bot-api-secret-token", SECRET)],
            update.to_string(),
        )
        .await
    }

    async fn state_name(&self, key: &str) -> Option<String> {
        self.store
            .get_user_state(key)
            .await
            .unwrap()
            .map(|r| r.state)
    }
}

fn config(dir: &tempfile::TempDir, extra: &str) -> TallyConfig {
    tally_config::load_and_validate_str(&format!(
        r#"
        [storage]
        database_path = "{}"

        [telegram]
        bot_token = "{BOT_TOKEN}"
        webhook_secret = "{SECRET}"

        {extra}
        "#,
        dir.path().join("tally.db").display()
    ))
    .unwrap()
}

fn text_update(id: u64, text: &str) -> serde_json::Value {
    json!({
        "update_id": id,
        "message": {
            "message_id": id,
            "date": 1700000000i64,
            "chat": { "id": 12345i64, "type": "private", "first_name": "Ana" },
            "from": { "id": 12345u64, "is_bot": false, "first_name": "Ana" },
            "text": text,
        }
    })
}

fn tap_update(id: u64, data: &str) -> serde_json::Value {
    json!({
        "update_id": id,
        "callback_query": {
            "id": format!("cb-{id}"),
            "from": { "id": 12345u64, "is_bot": false, "first_name": "Ana" },
            "chat_instance": "-1",
            "data": data,
            "message": {
                "message_id": 1,
                "date": 1700000000i64,
                "chat": { "id": 12345i64, "type": "private", "first_name": "Ana" },
                "text": "menu",
            }
        }
    })
}

async fn telegram_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/bot.+/sendmessage$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {
                "message_id": 99,
                "date": 1700000000i64,
                "chat": { "id": 12345i64, "type": "private", "first_name": "Ana" },
                "text": "ok",
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/bot.+/answercallbackquery$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
        .mount(&server)
        .await;
    server
}

async fn sent_texts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().to_ascii_lowercase().ends_with("/sendmessage"))
        .filter_map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).ok())
        .filter_map(|v| v["text"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn free_text_expense_round_trip_through_llm_and_telegram() {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{
                "type": "text",
                "text": r#"{"action":"add_expense","amount":45,"description":"lunch"}"#,
            }],
            "model": "claude-haiku-4-5",
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        })))
        .mount(&llm)
        .await;
    let api = telegram_api().await;

    let dir = tempfile::tempdir().unwrap();
    let providers = format!(
        r#"
        [[intent.providers]]
        kind = "anthropic"
        api_key = "test-key"
        model = "claude-haiku-4-5"
        base_url = "{}"
        "#,
        llm.uri()
    );
    let bot = Bot::start(config(&dir, &providers), dir, &api.uri()).await;

    assert_eq!(bot.telegram(text_update(1, "spent 45 on lunch")).await, StatusCode::OK);
    assert_eq!(
        bot.state_name("telegram:12345").await.as_deref(),
        Some("awaiting_confirmation")
    );
    assert!(bot.store.list_expenses(DateRange::all()).await.unwrap().is_empty());

    assert_eq!(bot.telegram(tap_update(2, "confirm")).await, StatusCode::OK);

    let expenses = bot.store.list_expenses(DateRange::all()).await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, 45.0);
    assert_eq!(expenses[0].payment_method, "Telegram");
    assert_eq!(bot.state_name("telegram:12345").await, None);

    let texts = sent_texts(&api).await;
    assert!(texts[0].starts_with("Add <b>$45.00</b> to <b>Uncategorized</b>"), "{texts:?}");
    assert!(texts.last().unwrap().contains("$45.00"), "{texts:?}");
}

#[tokio::test]
async fn guided_expense_without_llm() {
    let api = telegram_api().await;
    let dir = tempfile::tempdir().unwrap();
    let bot = Bot::start(config(&dir, ""), dir, &api.uri()).await;

    bot.telegram(tap_update(1, "menu:add_expense")).await;
    assert_eq!(
        bot.state_name("telegram:12345").await.as_deref(),
        Some("add_expense_select_category")
    );

    let category = bot
        .store
        .find_category("Uncategorized")
        .await
        .unwrap()
        .expect("default category is created for the picker");
    bot.telegram(tap_update(2, &format!("cat:{}", category.id)))
        .await;
    assert_eq!(
        bot.state_name("telegram:12345").await.as_deref(),
        Some("add_expense_select_payment")
    );

    let method = bot
        .store
        .find_payment_method("Telegram")
        .await
        .unwrap()
        .expect("channel payment method is created for the picker");
    bot.telegram(tap_update(3, &format!("pm:{}", method.id))).await;
    bot.telegram(text_update(4, "12.50")).await;
    bot.telegram(tap_update(5, "skip")).await;

    assert_eq!(bot.state_name("telegram:12345").await, None);
    let expenses = bot.store.list_expenses(DateRange::all()).await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, 12.5);
    assert_eq!(expenses[0].category, "Uncategorized");
    assert_eq!(expenses[0].description, None);
}

#[tokio::test]
async fn whatsapp_handshake_uses_configured_token() {
    let api = telegram_api().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, "[whatsapp]\nverify_token = \"verify-me\"");
    let bot = Bot::start(config, dir, &api.uri()).await;

    let response = router(bot.state.clone())
        .oneshot(
            Request::get(
                "/whatsapp/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=42",
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_secret_never_reaches_the_ledger() {
    let api = telegram_api().await;
    let dir = tempfile::tempdir().unwrap();
    let bot = Bot::start(config(&dir, ""), dir, &api.uri()).await;

    let status = bot
        .post(
            "/telegram/webhook",
            &[("x-telegram-bot-api-secret-token", "nope")],
            tap_update(1, "menu:add_expense").to_string(),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(bot.state_name("telegram:12345").await, None);
    assert!(sent_texts(&api).await.is_empty());
}
