//! Turn orchestration: one utterance in, one updated state and reply out.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use sierra_core::config::AppConfig;
use sierra_core::{CatalogIndex, PatternLibrary, ServiceAdapter, ServiceError};

use crate::classifier::{Intent, IntentClassifier};
use crate::compose::{ResponseComposer, Retrieved, FAREWELL, SESSION_ENDED};
use crate::llm::{call_with_retries, LlmClient};
use crate::slots::SlotExtractor;
use crate::state::{is_exit_utterance, ConversationState, Role, SessionStatus};

/// Output of one processed turn.
#[derive(Clone, Debug)]
pub struct ProcessedTurn {
    pub state: ConversationState,
    pub reply: String,
}

pub struct TurnProcessor {
    classifier: IntentClassifier,
    extractor: SlotExtractor,
    composer: ResponseComposer,
    services: Arc<dyn ServiceAdapter>,
    history_window: usize,
    call_timeout: Duration,
    max_retries: u32,
}

impl TurnProcessor {
    pub fn new(
        config: &AppConfig,
        catalog: CatalogIndex,
        services: Arc<dyn ServiceAdapter>,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        let patterns = PatternLibrary::new();
        let classifier = IntentClassifier::new(
            patterns.clone(),
            catalog.clone(),
            llm.clone(),
            config.agent.similarity_threshold,
            config.agent.rule_confidence,
            config.agent.fallback_confidence,
        );
        let extractor =
            SlotExtractor::new(patterns, catalog, config.agent.similarity_threshold);
        let composer = ResponseComposer::new(llm);

        Self {
            classifier,
            extractor,
            composer,
            services,
            history_window: config.agent.history_window,
            call_timeout: Duration::from_secs(config.llm.timeout_secs),
            max_retries: config.llm.max_retries,
        }
    }

    /// Processes one turn. Pure transformation of `(state, utterance)` into
    /// `(new_state, reply)`; a `None` input state begins a new session.
    pub async fn process(
        &self,
        state: Option<ConversationState>,
        utterance: &str,
    ) -> ProcessedTurn {
        let mut state = state.unwrap_or_default();

        // A terminated session never mutates again.
        if state.is_terminated() {
            return ProcessedTurn { state, reply: SESSION_ENDED.to_string() };
        }

        // Exit keywords short-circuit the whole pipeline; no classifier,
        // extractor, adapter, or generation call is issued for this turn.
        if is_exit_utterance(utterance) {
            state.push_turn(Role::User, utterance);
            state.push_turn(Role::Agent, FAREWELL);
            state.status = SessionStatus::Terminated;
            info!(event_name = "turn.terminated", "session ended by exit keyword");
            return ProcessedTurn { state, reply: FAREWELL.to_string() };
        }

        let classification = self
            .classifier
            .classify(utterance, state.recent_history(self.history_window))
            .await;
        let intent = state.retained_intent(classification.intent);
        info!(
            event_name = "turn.classified",
            intent = intent.as_str(),
            confidence = classification.confidence,
            "utterance classified"
        );

        let extraction = self.extractor.extract(utterance, intent);
        state.slots.merge(&extraction.slots);
        state.current_intent = (intent != Intent::Unknown).then_some(intent);

        if let Some(ambiguity) = &extraction.ambiguity {
            state.status = SessionStatus::AwaitingClarification;
            let reply = self.composer.clarify(ambiguity);
            return finish(state, utterance, reply);
        }

        if let Some(slot) = intent.required_slot() {
            if state.slots.get(slot).is_none() {
                state.status = SessionStatus::Active;
                let reply = self.composer.ask_for_slot(intent, slot);
                return finish(state, utterance, reply);
            }
        }

        // A resolved slot exits any pending clarification.
        state.status = SessionStatus::Active;

        let outcome = self.retrieve(intent, &state).await;
        let reply = self.composer.compose(intent, &state.slots, outcome).await;
        finish(state, utterance, reply)
    }

    /// Issues the single backend lookup this intent needs, if any, with
    /// bounded retries for transient failures.
    async fn retrieve(
        &self,
        intent: Intent,
        state: &ConversationState,
    ) -> Result<Retrieved, ServiceError> {
        if !intent.needs_retrieval() {
            return Ok(Retrieved::None);
        }

        match intent {
            Intent::OrderStatus => {
                let order_id = state.slots.order_id.clone().unwrap_or_default();
                call_with_retries(self.max_retries, self.call_timeout, || {
                    let services = Arc::clone(&self.services);
                    let order_id = order_id.clone();
                    async move { services.get_order(&order_id).await }
                })
                .await
                .map(Retrieved::Order)
            }
            Intent::OrderTracking => {
                let tracking_number = state.slots.tracking_number.clone().unwrap_or_default();
                call_with_retries(self.max_retries, self.call_timeout, || {
                    let services = Arc::clone(&self.services);
                    let tracking_number = tracking_number.clone();
                    async move { services.get_tracking(&tracking_number).await }
                })
                .await
                .map(Retrieved::Tracking)
            }
            Intent::ProductQuery => {
                let query = state.slots.product_name.clone().unwrap_or_default();
                call_with_retries(self.max_retries, self.call_timeout, || {
                    let services = Arc::clone(&self.services);
                    let query = query.clone();
                    async move { services.find_products(&query).await }
                })
                .await
                .map(Retrieved::Products)
            }
            Intent::PromotionRequest | Intent::Unknown => Ok(Retrieved::None),
        }
    }
}

fn finish(mut state: ConversationState, utterance: &str, reply: String) -> ProcessedTurn {
    state.push_turn(Role::User, utterance);
    state.push_turn(Role::Agent, reply.clone());
    ProcessedTurn { state, reply }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use sierra_core::config::AppConfig;
    use sierra_core::{CatalogIndex, Order, Product, ServiceAdapter, ServiceError, TrackingStatus};
    use sierra_store::fixtures;

    use super::TurnProcessor;
    use crate::classifier::Intent;
    use crate::compose::{APOLOGY, FAREWELL};
    use crate::state::{Role, SessionStatus};

    /// Adapter over the demo fixtures that counts every call.
    struct CountingAdapter {
        inner: sierra_store::JsonStore,
        calls: AtomicU32,
    }

    impl CountingAdapter {
        fn new() -> Self {
            Self { inner: fixtures::demo_store(), calls: AtomicU32::new(0) }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ServiceAdapter for CountingAdapter {
        async fn find_products(&self, query: &str) -> Result<Vec<Product>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_products(query).await
        }

        async fn get_order(&self, order_id: &str) -> Result<Order, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_order(order_id).await
        }

        async fn get_tracking(
            &self,
            tracking_number: &str,
        ) -> Result<TrackingStatus, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_tracking(tracking_number).await
        }
    }

    /// Adapter whose every call fails transiently.
    struct FlakyAdapter {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ServiceAdapter for FlakyAdapter {
        async fn find_products(&self, _query: &str) -> Result<Vec<Product>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Unavailable("connection refused".to_string()))
        }

        async fn get_order(&self, _order_id: &str) -> Result<Order, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Unavailable("connection refused".to_string()))
        }

        async fn get_tracking(
            &self,
            _tracking_number: &str,
        ) -> Result<TrackingStatus, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Unavailable("connection refused".to_string()))
        }
    }

    fn processor_with(adapter: Arc<dyn ServiceAdapter>) -> TurnProcessor {
        let config = AppConfig::default();
        let catalog = CatalogIndex::new(
            fixtures::demo_products().into_iter().map(|p| p.name).collect(),
        );
        TurnProcessor::new(&config, catalog, adapter, None)
    }

    #[tokio::test]
    async fn order_status_scenario_resolves_order() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "What's the status of order #W001?").await;

        assert_eq!(turn.state.current_intent, Some(Intent::OrderStatus));
        assert_eq!(turn.state.slots.order_id.as_deref(), Some("W001"));
        assert_eq!(adapter.calls(), 1);
        assert!(turn.reply.contains("The order has been delivered"));
        assert_eq!(turn.state.turns().len(), 2);
    }

    #[tokio::test]
    async fn tracking_scenario_resolves_tracking_number() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "Track order TRK123456789").await;

        assert_eq!(turn.state.current_intent, Some(Intent::OrderTracking));
        assert_eq!(turn.state.slots.tracking_number.as_deref(), Some("TRK123456789"));
        assert!(turn.reply.contains("#W001"));
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn gibberish_yields_clarification_without_adapter_call() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "asdfgh").await;

        assert_eq!(turn.state.current_intent, None);
        assert_eq!(adapter.calls(), 0);
        assert!(turn.reply.contains("order status"));
        assert!(turn.reply.contains("tracking"));
    }

    #[tokio::test]
    async fn exit_keyword_terminates_without_any_invocation() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "bye").await;

        assert_eq!(turn.state.status, SessionStatus::Terminated);
        assert_eq!(turn.reply, FAREWELL);
        assert_eq!(adapter.calls(), 0);
        assert_eq!(turn.state.turns().len(), 2);

        // Processing after termination appends nothing.
        let after = processor.process(Some(turn.state.clone()), "hello?").await;
        assert_eq!(after.state.turns().len(), 2);
        assert_eq!(after.state.status, SessionStatus::Terminated);
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn not_found_keeps_slot_and_session_active() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "status of order W777 please").await;

        assert!(turn.reply.contains("W777"));
        assert!(turn.reply.contains("double-check"));
        assert_eq!(turn.state.status, SessionStatus::Active);
        // The slot survives for a follow-up correction.
        assert_eq!(turn.state.slots.order_id.as_deref(), Some("W777"));

        let corrected = processor.process(Some(turn.state), "sorry, it's W001").await;
        assert_eq!(corrected.state.slots.order_id.as_deref(), Some("W001"));
        assert!(corrected.reply.contains("The order has been delivered"));
    }

    #[tokio::test]
    async fn missing_slot_asks_then_follow_up_fills_it() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let first = processor.process(None, "what's my order status?").await;
        assert_eq!(first.state.current_intent, Some(Intent::OrderStatus));
        assert!(first.reply.contains("order number"));
        assert_eq!(adapter.calls(), 0);

        // Bare identifier follow-up: the pattern override classifies it.
        let second = processor.process(Some(first.state), "#W002").await;
        assert_eq!(second.state.slots.order_id.as_deref(), Some("W002"));
        assert!(second.reply.contains("on its way"));
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_follow_up_retains_previous_intent() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let first = processor.process(None, "what's my order status?").await;
        // "hmm let me look" has no pattern, keyword, or catalog hit; the
        // previous intent still misses its slot, so it is retained.
        let second = processor.process(Some(first.state), "hmm let me look").await;
        assert_eq!(second.state.current_intent, Some(Intent::OrderStatus));
        assert!(second.reply.contains("order number"));
    }

    #[tokio::test]
    async fn transient_failures_exhaust_retries_then_apologize() {
        let adapter = Arc::new(FlakyAdapter { calls: AtomicU32::new(0) });
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "status of order W001").await;

        assert_eq!(turn.reply, APOLOGY);
        assert_eq!(turn.state.status, SessionStatus::Active);
        // Default policy: one attempt plus two retries.
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn product_query_lists_matching_products() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "do you have any backpacks?").await;

        assert_eq!(turn.state.current_intent, Some(Intent::ProductQuery));
        assert!(turn.reply.contains("Backcountry Blaze Backpack"));
        assert!(turn.reply.contains("SOBP001"));
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn promotion_request_needs_no_adapter() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "any discounts right now?").await;

        assert_eq!(turn.state.current_intent, Some(Intent::PromotionRequest));
        assert!(turn.reply.contains("EARLYRISERS10"));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn history_grows_by_two_per_turn() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let first = processor.process(None, "any deals?").await;
        assert_eq!(first.state.turns().len(), 2);
        assert_eq!(first.state.turns()[0].role, Role::User);
        assert_eq!(first.state.turns()[1].role, Role::Agent);

        let second = processor.process(Some(first.state), "do you sell skis?").await;
        assert_eq!(second.state.turns().len(), 4);
    }

    #[tokio::test]
    async fn ambiguous_identifiers_await_clarification() {
        let adapter = Arc::new(CountingAdapter::new());
        let processor = processor_with(adapter.clone());

        let turn = processor.process(None, "is it order #W001 or #W002?").await;

        assert_eq!(turn.state.status, SessionStatus::AwaitingClarification);
        assert!(turn.reply.contains("Which one"));
        assert_eq!(adapter.calls(), 0);

        // The follow-up resolves the ambiguity and reactivates the session.
        let resolved = processor.process(Some(turn.state), "W002").await;
        assert_eq!(resolved.state.status, SessionStatus::Active);
        assert!(resolved.reply.contains("on its way"));
    }
}
