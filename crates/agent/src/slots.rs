//! Slot extraction: structured identifiers plus fuzzy product resolution.

use serde::{Deserialize, Serialize};

use sierra_core::{CatalogIndex, PatternLibrary};

use crate::classifier::Intent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    OrderId,
    TrackingNumber,
    ProductName,
}

impl SlotName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderId => "order_id",
            Self::TrackingNumber => "tracking_number",
            Self::ProductName => "product_name",
        }
    }
}

/// Accumulated slot values for a session. Absent slots stay absent - there
/// are no null placeholders - and values are only replaced by a newer
/// extraction, never cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMap {
    pub order_id: Option<String>,
    pub tracking_number: Option<String>,
    pub product_name: Option<String>,
}

impl SlotMap {
    pub fn get(&self, slot: SlotName) -> Option<&str> {
        match slot {
            SlotName::OrderId => self.order_id.as_deref(),
            SlotName::TrackingNumber => self.tracking_number.as_deref(),
            SlotName::ProductName => self.product_name.as_deref(),
        }
    }

    pub fn set(&mut self, slot: SlotName, value: String) {
        match slot {
            SlotName::OrderId => self.order_id = Some(value),
            SlotName::TrackingNumber => self.tracking_number = Some(value),
            SlotName::ProductName => self.product_name = Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() && self.tracking_number.is_none() && self.product_name.is_none()
    }

    /// Overlays the newer extraction: present values overwrite, absent values
    /// leave the older ones untouched.
    pub fn merge(&mut self, newer: &SlotMap) {
        if let Some(order_id) = &newer.order_id {
            self.order_id = Some(order_id.clone());
        }
        if let Some(tracking_number) = &newer.tracking_number {
            self.tracking_number = Some(tracking_number.clone());
        }
        if let Some(product_name) = &newer.product_name {
            self.product_name = Some(product_name.clone());
        }
    }
}

/// Multiple equally valid candidates for one slot. Surfaced to the user as a
/// disambiguation question rather than guessed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotAmbiguity {
    pub slot: SlotName,
    pub candidates: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub slots: SlotMap,
    pub ambiguity: Option<SlotAmbiguity>,
}

pub struct SlotExtractor {
    patterns: PatternLibrary,
    catalog: CatalogIndex,
    similarity_threshold: f32,
}

impl SlotExtractor {
    pub fn new(patterns: PatternLibrary, catalog: CatalogIndex, similarity_threshold: f32) -> Self {
        Self { patterns, catalog, similarity_threshold }
    }

    /// Pure function of `(utterance, intent)`.
    pub fn extract(&self, utterance: &str, intent: Intent) -> Extraction {
        match intent {
            Intent::OrderStatus => {
                identifier_extraction(self.patterns.find_order_ids(utterance), SlotName::OrderId)
            }
            Intent::OrderTracking => identifier_extraction(
                self.patterns.find_tracking_numbers(utterance),
                SlotName::TrackingNumber,
            ),
            Intent::ProductQuery => self.product_extraction(utterance),
            Intent::PromotionRequest | Intent::Unknown => Extraction::default(),
        }
    }

    fn product_extraction(&self, utterance: &str) -> Extraction {
        let matches = self.catalog.best_matches(utterance, self.similarity_threshold);
        let Some(best) = matches.first() else {
            return Extraction::default();
        };

        let tied: Vec<String> = matches
            .iter()
            .take_while(|candidate| candidate.score >= best.score)
            .map(|candidate| candidate.name.clone())
            .collect();

        if tied.len() > 1 {
            // Equally strong distinct names: ask instead of guessing.
            return Extraction {
                slots: SlotMap::default(),
                ambiguity: Some(SlotAmbiguity { slot: SlotName::ProductName, candidates: tied }),
            };
        }

        let mut slots = SlotMap::default();
        slots.set(SlotName::ProductName, best.name.clone());
        Extraction { slots, ambiguity: None }
    }
}

/// First candidate by position wins; distinct alternates of the same type
/// flag the extraction as ambiguous.
fn identifier_extraction(candidates: Vec<String>, slot: SlotName) -> Extraction {
    let mut distinct: Vec<String> = Vec::new();
    for candidate in candidates {
        if !distinct.contains(&candidate) {
            distinct.push(candidate);
        }
    }

    let Some(first) = distinct.first().cloned() else {
        return Extraction::default();
    };

    let mut slots = SlotMap::default();
    slots.set(slot, first);

    let ambiguity = (distinct.len() > 1)
        .then(|| SlotAmbiguity { slot, candidates: distinct });

    Extraction { slots, ambiguity }
}
