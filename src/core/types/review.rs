//! Structured enrichment output

use serde::{Deserialize, Serialize};

use super::records::ItemId;

/// Classification and review for a single item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemReview {
    pub item_id: ItemId,
    pub classification: String,
    pub review: String,
}

/// The structured document the completion service must return for a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichmentResponse {
    pub reviews: Vec<ItemReview>,
}

impl EnrichmentResponse {
    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}
