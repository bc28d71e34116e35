// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tally_config::model::GatewayConfig;
use tally_core::TallyError;
use tally_dialogue::DialogueController;
use tally_telegram::TelegramChannel;
use tally_whatsapp::WhatsAppChannel;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

use crate::auth::{telegram_secret, whatsapp_signature};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub controller: Arc<DialogueController>,
    /// `None` leaves the Telegram routes answering 404.
    pub telegram: Option<Arc<TelegramChannel>>,
    pub whatsapp: Option<Arc<WhatsAppChannel>>,
    /// In-flight webhook handling, awaited on shutdown.
    pub tasks: TaskTracker,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(controller: Arc<DialogueController>) -> Self {
        Self {
            controller,
            telegram: None,
            whatsapp: None,
            tasks: TaskTracker::new(),
            started_at: Instant::now(),
        }
    }

    pub fn with_telegram(mut self, channel: Arc<TelegramChannel>) -> Self {
        self.telegram = Some(channel);
        self
    }

    pub fn with_whatsapp(mut self, channel: Arc<WhatsAppChannel>) -> Self {
        self.whatsapp = Some(channel);
        self
    }
}

/// Builds the router:
/// - GET /health
/// - POST /telegram/webhook (secret header)
/// - GET /whatsapp/webhook (verification handshake)
/// - POST /whatsapp/webhook (payload signature)
pub fn router(state: GatewayState) -> Router {
    let telegram = post(handlers::post_telegram).route_layer(
        axum_middleware::from_fn_with_state(state.clone(), telegram_secret),
    );

    let whatsapp = get(handlers::verify_whatsapp).merge(
        post(handlers::post_whatsapp).route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            whatsapp_signature,
        )),
    );

    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/telegram/webhook", telegram)
        .route("/whatsapp/webhook", whatsapp)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the gateway until `shutdown` resolves, then waits for in-flight
/// webhook handling to finish.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), TallyError> {
    let tasks = state.tasks.clone();
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TallyError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| TallyError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tasks.close();
    tracing::info!(pending = tasks.len(), "waiting for in-flight webhooks");
    tasks.wait().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tally_config::model::{DialogueConfig, StorageConfig, TelegramConfig, WhatsAppConfig};
    use tally_core::ConversationStore;
    use tally_intent::IntentExtractor;
    use tally_storage::SqliteStore;
    use tally_test_utils::MemoryStates;
    use tower::ServiceExt;

    use crate::auth::{TELEGRAM_SECRET_HEADER, WHATSAPP_SIGNATURE_HEADER};

    struct Fixture {
        state: GatewayState,
        states: Arc<MemoryStates>,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(SqliteStore::new(StorageConfig {
                database_path: dir.path().join("gw.db").to_string_lossy().to_string(),
                wal_mode: true,
            }));
            store.initialize().await.unwrap();
            let states = Arc::new(MemoryStates::new());
            let controller = Arc::new(DialogueController::new(
                store,
                states.clone(),
                Arc::new(IntentExtractor::disabled()),
                DialogueConfig::default(),
            ));

            let telegram = TelegramChannel::new(TelegramConfig {
                bot_token: None,
                webhook_secret: Some("s3cret".into()),
                allowed_chats: vec![],
            });
            let whatsapp = WhatsAppChannel::new(WhatsAppConfig {
                verify_token: Some("verify-me".into()),
                app_secret: Some("app-secret".into()),
                ..WhatsAppConfig::default()
            });

            let state = GatewayState::new(controller)
                .with_telegram(Arc::new(telegram))
                .with_whatsapp(Arc::new(whatsapp));
            Self {
                state,
                states,
                _dir: dir,
            }
        }

        async fn call(&self, request: Request<Body>) -> (StatusCode, String) {
            let response = router(self.state.clone()).oneshot(request).await.unwrap();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, String::from_utf8_lossy(&body).to_string())
        }

        /// Waits for spawned webhook handling to finish.
        async fn settle(&self) {
            self.state.tasks.close();
            self.state.tasks.wait().await;
            self.state.tasks.reopen();
        }

        async fn state_name(&self, key: &str) -> Option<String> {
            self.states.get_user_state(key).await.unwrap().map(|r| r.state)
        }
    }

    fn telegram_tap(data: &str) -> String {
        json!({
            "update_id": 1,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 12345u64, "is_bot": false, "first_name": "Ana" },
                "chat_instance": "-1",
                "data": data,
                "message": {
                    "message_id": 5,
                    "date": 1700000000i64,
                    "chat": { "id": 12345i64, "type": "private", "first_name": "Ana" },
                    "text": "menu",
                }
            }
        })
        .to_string()
    }

    fn whatsapp_tap(data: &str) -> String {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{ "id": "WABA", "changes": [{ "field": "messages", "value": {
                "messages": [{
                    "from": "15551234567", "id": "wamid.1", "type": "interactive",
                    "interactive": { "type": "list_reply", "list_reply": { "id": data, "title": "x" } }
                }]
            } }] }]
        })
        .to_string()
    }

    fn post(uri: &str, headers: &[(&str, &str)], body: String) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn health_reports_channels() {
        let fx = Fixture::new().await;
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = fx.call(request).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["telegram"], false);
        assert_eq!(json["whatsapp"], false);
    }

    #[tokio::test]
    async fn telegram_webhook_drives_the_controller() {
        let fx = Fixture::new().await;
        let request = post(
            "/telegram/webhook",
            &[(TELEGRAM_SECRET_HEADER, "s3cret")],
            telegram_tap("menu:add_expense"),
        );

        let (status, _) = fx.call(request).await;
        fx.settle().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fx.state_name("telegram:12345").await.as_deref(),
            Some("add_expense_select_category")
        );
    }

    #[tokio::test]
    async fn telegram_webhook_requires_secret() {
        let fx = Fixture::new().await;
        let missing = post("/telegram/webhook", &[], telegram_tap("menu:add_expense"));
        assert_eq!(fx.call(missing).await.0, StatusCode::UNAUTHORIZED);

        let wrong = post(
            "/telegram/webhook",
            &[(TELEGRAM_SECRET_HEADER, "guess")],
            telegram_tap("menu:add_expense"),
        );
        assert_eq!(fx.call(wrong).await.0, StatusCode::UNAUTHORIZED);

        fx.settle().await;
        assert_eq!(fx.state_name("telegram:12345").await, None);
    }

    #[tokio::test]
    async fn malformed_update_is_acknowledged() {
        let fx = Fixture::new().await;
        let request = post(
            "/telegram/webhook",
            &[(TELEGRAM_SECRET_HEADER, "s3cret")],
            "{not json".into(),
        );
        assert_eq!(fx.call(request).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn unconfigured_channel_routes_are_not_found() {
        let fx = Fixture::new().await;
        let mut state = fx.state.clone();
        state.telegram = None;
        state.whatsapp = None;

        let response = router(state.clone())
            .oneshot(post("/telegram/webhook", &[], telegram_tap("menu")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router(state)
            .oneshot(
                Request::get("/whatsapp/webhook?hub.mode=subscribe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn whatsapp_handshake_echoes_challenge() {
        let fx = Fixture::new().await;
        let request = Request::get(
            "/whatsapp/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=1158201444",
        )
        .body(Body::empty())
        .unwrap();
        let (status, body) = fx.call(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1158201444");
    }

    #[tokio::test]
    async fn whatsapp_handshake_rejects_wrong_token() {
        let fx = Fixture::new().await;
        let request = Request::get(
            "/whatsapp/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1",
        )
        .body(Body::empty())
        .unwrap();
        assert_eq!(fx.call(request).await.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn whatsapp_webhook_checks_signature() {
        let fx = Fixture::new().await;
        let body = whatsapp_tap("menu:add_expense");

        let unsigned = post("/whatsapp/webhook", &[], body.clone());
        assert_eq!(fx.call(unsigned).await.0, StatusCode::UNAUTHORIZED);
        fx.settle().await;
        assert_eq!(fx.state_name("whatsapp:15551234567").await, None);

        let signature = tally_whatsapp::verify::sign("app-secret", body.as_bytes());
        let signed = post(
            "/whatsapp/webhook",
            &[(WHATSAPP_SIGNATURE_HEADER, signature.as_str())],
            body,
        );
        assert_eq!(fx.call(signed).await.0, StatusCode::OK);
        fx.settle().await;
        assert_eq!(
            fx.state_name("whatsapp:15551234567").await.as_deref(),
            Some("add_expense_select_category")
        );
    }
}
