//! Offline evaluation harness. Drives the full turn pipeline over a static
//! case table against the demo fixtures, with the LLM fallback disabled so
//! every run is deterministic.

use std::sync::Arc;

use serde::Serialize;

use sierra_agent::{ConversationState, Intent, SlotName, TurnProcessor};
use sierra_core::config::AppConfig;
use sierra_core::{CatalogIndex, ServiceAdapter};
use sierra_store::fixtures;

use super::CommandResult;

struct EvalCase {
    category: &'static str,
    name: &'static str,
    turns: &'static [&'static str],
    expected_intent: Option<Intent>,
    expected_slot: Option<(SlotName, &'static str)>,
}

const CASES: &[EvalCase] = &[
    EvalCase {
        category: "product_search",
        name: "plural_token_finds_product",
        turns: &["do you have any backpacks?"],
        expected_intent: Some(Intent::ProductQuery),
        expected_slot: Some((SlotName::ProductName, "Backcountry Blaze Backpack")),
    },
    EvalCase {
        category: "product_search",
        name: "named_product_lookup",
        turns: &["tell me about the invisibility cloak"],
        expected_intent: Some(Intent::ProductQuery),
        expected_slot: Some((SlotName::ProductName, "Nishita's Invisibility Cloak")),
    },
    EvalCase {
        category: "product_search",
        name: "generic_gear_request_has_no_slot",
        turns: &["can you recommend some gear for skiing?"],
        expected_intent: Some(Intent::ProductQuery),
        expected_slot: None,
    },
    EvalCase {
        category: "order_status",
        name: "status_with_hash_prefixed_id",
        turns: &["What's the status of order #W001?"],
        expected_intent: Some(Intent::OrderStatus),
        expected_slot: Some((SlotName::OrderId, "W001")),
    },
    EvalCase {
        category: "order_status",
        name: "status_with_plain_id",
        turns: &["order W003 status"],
        expected_intent: Some(Intent::OrderStatus),
        expected_slot: Some((SlotName::OrderId, "W003")),
    },
    EvalCase {
        category: "tracking",
        name: "tracking_by_number",
        turns: &["Track order TRK123456789"],
        expected_intent: Some(Intent::OrderTracking),
        expected_slot: Some((SlotName::TrackingNumber, "TRK123456789")),
    },
    EvalCase {
        category: "tracking",
        name: "tracking_without_number",
        turns: &["where is my order?"],
        expected_intent: Some(Intent::OrderTracking),
        expected_slot: None,
    },
    EvalCase {
        category: "promotion",
        name: "discount_inquiry",
        turns: &["any discounts right now?"],
        expected_intent: Some(Intent::PromotionRequest),
        expected_slot: None,
    },
    EvalCase {
        category: "promotion",
        name: "promo_code_request",
        turns: &["do you have a promo code?"],
        expected_intent: Some(Intent::PromotionRequest),
        expected_slot: None,
    },
    EvalCase {
        category: "multi_turn",
        name: "order_status_slot_fill",
        turns: &["what's my order status?", "#W002"],
        expected_intent: Some(Intent::OrderStatus),
        expected_slot: Some((SlotName::OrderId, "W002")),
    },
    EvalCase {
        category: "multi_turn",
        name: "product_search_slot_fill",
        turns: &["I'm looking for gear", "backpacks please"],
        expected_intent: Some(Intent::ProductQuery),
        expected_slot: Some((SlotName::ProductName, "Backcountry Blaze Backpack")),
    },
    EvalCase {
        category: "edge_cases",
        name: "unknown_order_id_is_kept_for_correction",
        turns: &["status of order W999 please"],
        expected_intent: Some(Intent::OrderStatus),
        expected_slot: Some((SlotName::OrderId, "W999")),
    },
    EvalCase {
        category: "edge_cases",
        name: "gibberish_is_unknown",
        turns: &["asdfgh"],
        expected_intent: None,
        expected_slot: None,
    },
    EvalCase {
        category: "edge_cases",
        name: "exit_keyword_short_circuits",
        turns: &["bye"],
        expected_intent: None,
        expected_slot: None,
    },
];

#[derive(Debug, Serialize)]
struct CategoryScore {
    category: String,
    cases: usize,
    intent_correct: usize,
    slot_correct: usize,
}

#[derive(Debug, Serialize)]
struct EvalReport {
    cases: usize,
    intent_accuracy: f32,
    slot_accuracy: f32,
    categories: Vec<CategoryScore>,
    failures: Vec<String>,
}

pub fn run(category: Option<&str>, json_output: bool) -> CommandResult {
    let selected: Vec<&EvalCase> = CASES
        .iter()
        .filter(|case| category.map_or(true, |wanted| case.category == wanted))
        .collect();

    if selected.is_empty() {
        let mut known: Vec<&str> = CASES.iter().map(|case| case.category).collect();
        known.dedup();
        return CommandResult::failure(
            "eval",
            "unknown_category",
            format!(
                "no evaluation cases in category `{}`; known categories: {}",
                category.unwrap_or_default(),
                known.join(", ")
            ),
            2,
        );
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "eval",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let report = runtime.block_on(evaluate(&selected));
    let exit_code = if report.failures.is_empty() { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"error\":\"eval serialization failed: {error}\"}}"))
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

async fn evaluate(cases: &[&EvalCase]) -> EvalReport {
    let store = Arc::new(fixtures::demo_store());
    let catalog = CatalogIndex::new(store.product_names());
    let config = AppConfig::default();
    let services: Arc<dyn ServiceAdapter> = store;
    let processor = TurnProcessor::new(&config, catalog, services, None);

    let mut categories: Vec<CategoryScore> = Vec::new();
    let mut failures = Vec::new();
    let mut intent_total = 0usize;
    let mut slot_total = 0usize;

    for case in cases {
        let mut state: Option<ConversationState> = None;
        for utterance in case.turns {
            let turn = processor.process(state.take(), utterance).await;
            state = Some(turn.state);
        }
        let state = state.unwrap_or_default();

        let intent_ok = state.current_intent == case.expected_intent;
        let slot_ok = case
            .expected_slot
            .map_or(true, |(slot, value)| state.slots.get(slot) == Some(value));

        intent_total += usize::from(intent_ok);
        slot_total += usize::from(slot_ok);
        if !intent_ok || !slot_ok {
            failures.push(format!(
                "{}/{}: intent {}, slot {}",
                case.category,
                case.name,
                if intent_ok { "ok" } else { "mismatch" },
                if slot_ok { "ok" } else { "mismatch" },
            ));
        }

        match categories.iter_mut().find(|score| score.category == case.category) {
            Some(score) => {
                score.cases += 1;
                score.intent_correct += usize::from(intent_ok);
                score.slot_correct += usize::from(slot_ok);
            }
            None => categories.push(CategoryScore {
                category: case.category.to_string(),
                cases: 1,
                intent_correct: usize::from(intent_ok),
                slot_correct: usize::from(slot_ok),
            }),
        }
    }

    let total = cases.len();
    EvalReport {
        cases: total,
        intent_accuracy: intent_total as f32 / total as f32,
        slot_accuracy: slot_total as f32 / total as f32,
        categories,
        failures,
    }
}

fn render_human(report: &EvalReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "eval: {} cases, intent accuracy {:.1}%, slot accuracy {:.1}%",
        report.cases,
        report.intent_accuracy * 100.0,
        report.slot_accuracy * 100.0
    ));

    for score in &report.categories {
        lines.push(format!(
            "- {}: {} cases, {} intent, {} slot",
            score.category, score.cases, score.intent_correct, score.slot_correct
        ));
    }

    if !report.failures.is_empty() {
        lines.push("failures:".to_string());
        for failure in &report.failures {
            lines.push(format!("- {failure}"));
        }
    }

    lines.join("\n")
}
