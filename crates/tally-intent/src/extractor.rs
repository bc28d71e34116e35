// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered provider fallback for intent classification.

use std::sync::Arc;
use std::time::Duration;

use tally_core::{Intent, PluginAdapter, ProviderAdapter, TallyError};
use tracing::{debug, warn};

use crate::parse::parse_intent_response;
use crate::prompt::{ExtractionContext, build_request};

/// Classifies free text by asking each configured provider in turn.
///
/// Never fails: a provider error, timeout, or unparseable reply moves on to
/// the next provider, and exhausting the chain yields [`Intent::unknown`].
pub struct IntentExtractor {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    timeout: Duration,
}

impl IntentExtractor {
    pub fn new(providers: Vec<Arc<dyn ProviderAdapter>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// An extractor with no providers; every message classifies as unknown.
    pub fn disabled() -> Self {
        Self::new(Vec::new(), Duration::from_secs(1))
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub async fn extract(&self, text: &str, context: &ExtractionContext) -> Intent {
        if self.providers.is_empty() {
            debug!("no intent providers configured");
            return Intent::unknown();
        }

        let request = build_request(text, context);
        for provider in &self.providers {
            match self.try_provider(provider.as_ref(), request.clone()).await {
                Ok(intent) => {
                    debug!(provider = provider.name(), action = %intent.action, "intent extracted");
                    return intent;
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "intent provider failed, trying next");
                }
            }
        }

        warn!("all intent providers failed");
        Intent::unknown()
    }

    async fn try_provider(
        &self,
        provider: &dyn ProviderAdapter,
        request: tally_core::CompletionRequest,
    ) -> Result<Intent, TallyError> {
        let response = tokio::time::timeout(self.timeout, provider.complete(request))
            .await
            .map_err(|_| TallyError::Timeout {
                duration: self.timeout,
            })??;
        parse_intent_response(&response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tally_core::{ActionTag, AdapterType, CompletionRequest, CompletionResponse, HealthStatus};

    enum Behavior {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct StubProvider {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PluginAdapter for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
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
    impl ProviderAdapter for StubProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, TallyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Reply(text) => Ok(CompletionResponse {
                    text: text.to_string(),
                    model: "stub".into(),
                }),
                Behavior::Fail => Err(TallyError::provider("boom")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(TallyError::provider("unreachable"))
                }
            }
        }
    }

    fn extractor(providers: Vec<Arc<StubProvider>>) -> IntentExtractor {
        IntentExtractor::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn ProviderAdapter>)
                .collect(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn first_success_wins() {
        let first = StubProvider::new(Behavior::Reply(r#"{"action":"view_summary"}"#));
        let second = StubProvider::new(Behavior::Reply(r#"{"action":"help"}"#));
        let intent = extractor(vec![first.clone(), second.clone()])
            .extract("summary", &ExtractionContext::default())
            .await;
        assert_eq!(intent.action, ActionTag::ViewSummary);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_falls_through_to_next_provider() {
        let failing = StubProvider::new(Behavior::Fail);
        let working =
            StubProvider::new(Behavior::Reply(r#"{"action":"add_expense","amount":12}"#));
        let intent = extractor(vec![failing.clone(), working])
            .extract("spent 12", &ExtractionContext::default())
            .await;
        assert_eq!(intent.action, ActionTag::AddExpense);
        assert_eq!(intent.amount, Some(12.0));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn garbage_reply_falls_through() {
        let garbage = StubProvider::new(Behavior::Reply("I think this is an expense"));
        let working = StubProvider::new(Behavior::Reply(r#"{"action":"greeting"}"#));
        let intent = extractor(vec![garbage, working])
            .extract("hello", &ExtractionContext::default())
            .await;
        assert_eq!(intent.action, ActionTag::Greeting);
    }

    #[tokio::test]
    async fn timeout_counts_as_failure() {
        let slow = StubProvider::new(Behavior::Hang);
        let working = StubProvider::new(Behavior::Reply(r#"{"action":"menu"}"#));
        let intent = extractor(vec![slow, working])
            .extract("menu", &ExtractionContext::default())
            .await;
        assert_eq!(intent.action, ActionTag::Menu);
    }

    #[tokio::test]
    async fn exhausted_chain_is_unknown() {
        let intent = extractor(vec![
            StubProvider::new(Behavior::Fail),
            StubProvider::new(Behavior::Reply("nope")),
        ])
        .extract("???", &ExtractionContext::default())
        .await;
        assert_eq!(intent, Intent::unknown());
    }

    #[tokio::test]
    async fn no_providers_is_unknown() {
        let extractor = IntentExtractor::disabled();
        assert_eq!(extractor.provider_count(), 0);
        let intent = extractor
            .extract("spent 5 on tea", &ExtractionContext::default())
            .await;
        assert_eq!(intent.action, ActionTag::Unknown);
    }
}
