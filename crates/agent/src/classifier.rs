//! Intent classification: structured-pattern override, then an ordered
//! keyword rule table, then a constrained LLM fallback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sierra_core::{CatalogIndex, PatternLibrary};

use crate::llm::LlmClient;
use crate::slots::SlotName;
use crate::state::Turn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ProductQuery,
    OrderStatus,
    OrderTracking,
    PromotionRequest,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductQuery => "product_query",
            Self::OrderStatus => "order_status",
            Self::OrderTracking => "order_tracking",
            Self::PromotionRequest => "promotion_request",
            Self::Unknown => "unknown",
        }
    }

    /// The slot that must be resolved before this intent can act.
    pub fn required_slot(&self) -> Option<SlotName> {
        match self {
            Self::OrderStatus => Some(SlotName::OrderId),
            Self::OrderTracking => Some(SlotName::TrackingNumber),
            Self::ProductQuery => Some(SlotName::ProductName),
            Self::PromotionRequest | Self::Unknown => None,
        }
    }

    /// Whether acting on this intent requires a backend lookup.
    pub fn needs_retrieval(&self) -> bool {
        matches!(self, Self::ProductQuery | Self::OrderStatus | Self::OrderTracking)
    }

    /// Maps a backend-produced label onto the whitelist. Anything else is
    /// treated as unparseable.
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "product_query" => Some(Self::ProductQuery),
            "order_status" => Some(Self::OrderStatus),
            "order_tracking" => Some(Self::OrderTracking),
            "promotion_request" => Some(Self::PromotionRequest),
            "unknown" | "none" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
}

struct IntentRule {
    intent: Intent,
    words: &'static [&'static str],
    phrases: &'static [&'static str],
}

/// Fixed-order rule table; first match wins. Tracking outranks order status
/// so "track my order" lands on the tracking intent, and promotions outrank
/// the generic product rule so "any discount codes?" is not a product query.
const RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::OrderTracking,
        words: &["track", "tracking", "shipment", "package"],
        phrases: &["where is my order", "where's my order"],
    },
    IntentRule {
        intent: Intent::OrderStatus,
        words: &["order", "status", "delivery", "delivered", "shipped"],
        phrases: &[],
    },
    IntentRule {
        intent: Intent::PromotionRequest,
        words: &[
            "discount",
            "discounts",
            "promo",
            "promotion",
            "promotions",
            "coupon",
            "coupons",
            "sale",
            "sales",
            "deal",
            "deals",
        ],
        phrases: &["promo code", "discount code"],
    },
    IntentRule {
        intent: Intent::ProductQuery,
        words: &["product", "products", "recommend", "recommendation", "recommendations", "sell", "buy", "gear", "stock", "catalog", "inventory"],
        phrases: &["looking for", "do you have", "do you carry"],
    },
];

pub struct IntentClassifier {
    patterns: PatternLibrary,
    catalog: CatalogIndex,
    llm: Option<Arc<dyn LlmClient>>,
    similarity_threshold: f32,
    rule_confidence: f32,
    fallback_confidence: f32,
}

impl IntentClassifier {
    pub fn new(
        patterns: PatternLibrary,
        catalog: CatalogIndex,
        llm: Option<Arc<dyn LlmClient>>,
        similarity_threshold: f32,
        rule_confidence: f32,
        fallback_confidence: f32,
    ) -> Self {
        Self { patterns, catalog, llm, similarity_threshold, rule_confidence, fallback_confidence }
    }

    /// Classifies one utterance. Pure given identical inputs: the rule stages
    /// touch no state, and the fallback prompt is a function of the utterance
    /// and the recent history alone.
    pub async fn classify(&self, utterance: &str, recent_history: &[Turn]) -> Classification {
        // Stage 1: structured-pattern override. A tracking number is checked
        // first since it is the more specific token.
        if !self.patterns.find_tracking_numbers(utterance).is_empty() {
            return Classification { intent: Intent::OrderTracking, confidence: 1.0 };
        }
        if !self.patterns.find_order_ids(utterance).is_empty() {
            return Classification { intent: Intent::OrderStatus, confidence: 1.0 };
        }

        // Stage 2: keyword rule table, then catalog product nouns.
        let normalized = normalize(utterance);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        for rule in RULES {
            let word_hit = rule.words.iter().any(|word| tokens.contains(word));
            let phrase_hit = rule.phrases.iter().any(|phrase| normalized.contains(phrase));
            if word_hit || phrase_hit {
                return Classification { intent: rule.intent, confidence: self.rule_confidence };
            }
        }
        if !self.catalog.best_matches(utterance, self.similarity_threshold).is_empty() {
            return Classification {
                intent: Intent::ProductQuery,
                confidence: self.rule_confidence,
            };
        }

        // Stage 3: constrained LLM fallback.
        if let Some(llm) = &self.llm {
            let prompt = fallback_prompt(utterance, recent_history);
            match llm.complete(&prompt).await {
                Ok(label) => {
                    if let Some(intent) = Intent::parse_label(&label) {
                        let confidence =
                            if intent == Intent::Unknown { 0.0 } else { self.fallback_confidence };
                        return Classification { intent, confidence };
                    }
                    debug!(event_name = "classifier.unparseable_label", label, "fallback label rejected");
                }
                Err(error) => {
                    debug!(event_name = "classifier.fallback_failed", error = %error, "fallback unavailable");
                }
            }
        }

        // Stage 4: nothing fired.
        Classification { intent: Intent::Unknown, confidence: 0.0 }
    }
}

fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() || character == '\'' {
            normalized.extend(character.to_lowercase());
        } else {
            normalized.push(' ');
        }
    }
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fallback_prompt(utterance: &str, recent_history: &[Turn]) -> String {
    let mut transcript = String::new();
    for turn in recent_history {
        transcript.push_str(turn.role.as_str());
        transcript.push_str(": ");
        transcript.push_str(&turn.text);
        transcript.push('\n');
    }

    format!(
        "Classify the customer's most recent message into exactly one label:\n\
         - product_query: questions about products or recommendations\n\
         - order_status: questions about the status of an order\n\
         - order_tracking: questions about tracking a shipment\n\
         - promotion_request: questions about sales, discounts, or promotions\n\
         - unknown: anything else\n\
         \n\
         Conversation so far:\n{transcript}\n\
         Customer: {utterance}\n\
         \n\
         Return only the label, with no additional explanation."
    )
}
