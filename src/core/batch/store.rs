//! Shared result store

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::core::types::{EnrichmentResponse, ItemId, ItemReview};

/// Successful responses keyed by batch index
///
/// Written concurrently by batch tasks; each write is a single lock
/// acquisition and a key is written at most once per run.
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: Mutex<BTreeMap<usize, EnrichmentResponse>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the response of `batch_index`, returning any previous entry
    pub fn insert(&self, batch_index: usize, response: EnrichmentResponse) -> Option<EnrichmentResponse> {
        self.entries.lock().insert(batch_index, response)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, batch_index: usize) -> bool {
        self.entries.lock().contains_key(&batch_index)
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> EnrichmentResults {
        EnrichmentResults {
            entries: self.entries.lock().clone(),
        }
    }

    pub fn into_results(self) -> EnrichmentResults {
        EnrichmentResults {
            entries: self.entries.into_inner(),
        }
    }
}

/// Final, read-only view of a run's responses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentResults {
    entries: BTreeMap<usize, EnrichmentResponse>,
}

impl EnrichmentResults {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, batch_index: usize) -> Option<&EnrichmentResponse> {
        self.entries.get(&batch_index)
    }

    /// Batch indices in ascending order
    pub fn batch_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &EnrichmentResponse)> {
        self.entries.iter().map(|(index, response)| (*index, response))
    }

    pub fn review_count(&self) -> usize {
        self.entries.values().map(EnrichmentResponse::len).sum()
    }

    /// Every review keyed by item id
    pub fn reviews_by_item(&self) -> BTreeMap<ItemId, ItemReview> {
        self.entries
            .values()
            .flat_map(|response| response.reviews.iter().cloned())
            .map(|review| (review.item_id, review))
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<usize, EnrichmentResponse> {
        self.entries
    }
}
