//! Response composition. Every reply starts from a fixed template filled
//! with retrieved fields; the generation backend may only append advisory
//! flavor text, never supply facts.

use std::sync::Arc;

use tracing::debug;

use sierra_core::{Order, Product, ServiceError, TrackingStatus};

use crate::classifier::Intent;
use crate::llm::LlmClient;
use crate::slots::{SlotAmbiguity, SlotMap, SlotName};

pub const FAREWELL: &str =
    "Thanks for chatting with Sierra Outfitters. Goodbye, and happy trails!";
pub const SESSION_ENDED: &str =
    "This session has ended. Start a new conversation and I'll be glad to help.";
pub const APOLOGY: &str = "I'm sorry - I'm having trouble reaching our systems right now. \
     Please try again in a moment.";
pub const CAPABILITIES: &str = "I can help with product questions, order status, package \
     tracking, and current promotions. What would you like to do?";

const PROMOTION_REPLY: &str = "Good news! Our Early Risers promotion is on: 10% off \
     everything, every morning from 8:00 to 10:00 AM Pacific, with code EARLYRISERS10. \
     Anything else I can help with?";

/// Data pulled back by the service adapter for one turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Retrieved {
    None,
    Order(Order),
    Tracking(TrackingStatus),
    Products(Vec<Product>),
}

pub struct ResponseComposer {
    llm: Option<Arc<dyn LlmClient>>,
}

impl ResponseComposer {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    pub async fn compose(
        &self,
        intent: Intent,
        slots: &SlotMap,
        outcome: Result<Retrieved, ServiceError>,
    ) -> String {
        let skeleton = match outcome {
            Err(ServiceError::Unavailable(_)) => return APOLOGY.to_string(),
            Err(ServiceError::NotFound { kind, id }) => {
                return format!(
                    "I couldn't find a matching {kind} for `{id}`. Please double-check it \
                     and try again."
                );
            }
            Ok(Retrieved::Order(order)) => order_summary(&order),
            Ok(Retrieved::Tracking(tracking)) => tracking_summary(&tracking),
            Ok(Retrieved::Products(products)) => {
                if products.is_empty() {
                    return no_product_match(slots);
                }
                product_listing(&products)
            }
            Ok(Retrieved::None) => match intent {
                Intent::PromotionRequest => PROMOTION_REPLY.to_string(),
                _ => CAPABILITIES.to_string(),
            },
        };

        self.elaborate(skeleton).await
    }

    pub fn clarify(&self, ambiguity: &SlotAmbiguity) -> String {
        let candidates = ambiguity.candidates.join(", ");
        match ambiguity.slot {
            SlotName::OrderId => {
                format!("I see more than one order number ({candidates}). Which one did you mean?")
            }
            SlotName::TrackingNumber => format!(
                "I see more than one tracking number ({candidates}). Which one should I look up?"
            ),
            SlotName::ProductName => format!(
                "A few products could match: {candidates}. Which one are you interested in?"
            ),
        }
    }

    pub fn ask_for_slot(&self, intent: Intent, slot: SlotName) -> String {
        match (intent, slot) {
            (_, SlotName::OrderId) => "To check your order status, I'll need your order \
                 number - it starts with a letter, like W001. Could you share it?"
                .to_string(),
            (_, SlotName::TrackingNumber) => "To track your package, I'll need the tracking \
                 number - it starts with TRK. Could you share it?"
                .to_string(),
            (_, SlotName::ProductName) => "I can help you find gear. What specific items or \
                 categories are you interested in?"
                .to_string(),
        }
    }

    /// Appends one advisory closing line from the generation backend. The
    /// skeleton is returned verbatim on any failure, and the backend's text
    /// never replaces template content.
    async fn elaborate(&self, skeleton: String) -> String {
        let Some(llm) = &self.llm else {
            return skeleton;
        };

        let prompt = format!(
            "You are a cheerful customer-service agent for an outdoor gear company. \
             Write exactly one short, enthusiastic closing sentence with an outdoors \
             reference to append to the reply below. Do not repeat, change, or add any \
             facts, numbers, or product details.\n\nReply:\n{skeleton}"
        );

        match llm.complete(&prompt).await {
            Ok(flourish) if !flourish.trim().is_empty() => {
                format!("{skeleton}\n\n{}", flourish.trim())
            }
            Ok(_) => skeleton,
            Err(error) => {
                debug!(event_name = "compose.elaboration_failed", error = %error, "skipping flourish");
                skeleton
            }
        }
    }
}

fn order_summary(order: &Order) -> String {
    let products = order.products_ordered.join(", ");
    let tracking_info = match (&order.tracking_number, order.tracking_url()) {
        (Some(number), Some(url)) => {
            format!("Tracking Number: {number}\nTracking Link: {url}")
        }
        _ => "No tracking number available".to_string(),
    };

    format!(
        "Here's the information for order {number}. {status}.\n\n\
         Order: {number}\n\
         Customer: {customer} ({email})\n\
         Status: {status_raw}\n\
         Products Ordered: {products}\n\
         {tracking_info}\n\n\
         Can I help you with anything else?",
        number = order.order_number,
        status = order.status.readable(),
        customer = order.customer_name,
        email = order.email,
        status_raw = order.status.as_str().to_uppercase(),
    )
}

fn tracking_summary(tracking: &TrackingStatus) -> String {
    format!(
        "Tracking number {number} belongs to order {order}. {status}.\n\
         You can follow the package here: {url}\n\n\
         Can I help you with anything else?",
        number = tracking.tracking_number,
        order = tracking.order_number,
        status = tracking.status.readable(),
        url = tracking.tracking_url,
    )
}

fn product_listing(products: &[Product]) -> String {
    let mut reply = String::from("Here's what I found in our catalog:\n");
    for product in products {
        reply.push_str(&format!(
            "\n- {name} (SKU {sku}, {inventory} in stock): {description}",
            name = product.name,
            sku = product.sku,
            inventory = product.inventory,
            description = product.description,
        ));
    }
    reply.push_str("\n\nWould you like more detail on any of these?");
    reply
}

fn no_product_match(slots: &SlotMap) -> String {
    match slots.get(SlotName::ProductName) {
        Some(name) => format!(
            "I couldn't find anything matching \"{name}\" in our catalog. Could you tell me \
             more about what you're looking for?"
        ),
        None => "I couldn't find any products matching that. Could you share the type of \
             activity, features, or categories you care about?"
            .to_string(),
    }
}
