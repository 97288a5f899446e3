//! Dialogue core - intent classification and turn orchestration
//!
//! This crate is the "brain" of the sierra system - everything between a raw
//! user utterance and a composed reply:
//! - Classifies utterances into intents (`classifier`)
//! - Pulls structured slot values out of them (`slots`)
//! - Carries conversation state across turns (`state`)
//! - Composes the reply from templates plus retrieved data (`compose`)
//! - Orchestrates the whole turn (`processor`)
//!
//! # Architecture
//!
//! Each turn follows a fixed pipeline:
//! 1. **Intent Classification** (`classifier`) - pattern override, then
//!    keyword rules, then a constrained LLM fallback
//! 2. **Slot Extraction** (`slots`) - identifier patterns and fuzzy catalog
//!    matching for the classified intent
//! 3. **Data Retrieval** - a single `ServiceAdapter` call when the intent
//!    needs one, with bounded retries
//! 4. **Response Composition** (`compose`) - templated reply, optionally
//!    elaborated by the generation backend
//!
//! # Safety Principle
//!
//! The LLM is advisory only. Intent labels it suggests are validated against
//! a whitelist, and factual reply content (order status, tracking links,
//! inventory) is always template-inserted verbatim - the backend never gets
//! to invent facts.

pub mod classifier;
pub mod compose;
pub mod llm;
pub mod processor;
pub mod slots;
pub mod state;

pub use classifier::{Classification, Intent, IntentClassifier};
pub use compose::{ResponseComposer, Retrieved};
pub use llm::{LlmClient, OpenAiCompatClient};
pub use processor::{ProcessedTurn, TurnProcessor};
pub use slots::{Extraction, SlotAmbiguity, SlotExtractor, SlotMap, SlotName};
pub use state::{ConversationState, Role, SessionStatus, Turn};
