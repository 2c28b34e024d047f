//! Custom test assertions

use enrichment_rs::{EnrichmentResults, ItemId, MergedRecord};

/// Assert that `results` review exactly the ids in `expected`, each once
pub fn assert_reviews_cover(results: &EnrichmentResults, expected: impl IntoIterator<Item = ItemId>) {
    let mut reviewed: Vec<ItemId> = results
        .iter()
        .flat_map(|(_, response)| response.reviews.iter().map(|review| review.item_id))
        .collect();
    reviewed.sort_unstable();

    let mut expected: Vec<ItemId> = expected.into_iter().collect();
    expected.sort_unstable();

    assert_eq!(reviewed, expected, "reviewed ids do not match");
}

/// Assert merged records carry consecutive item ids starting at 1
pub fn assert_consecutive_ids(records: &[MergedRecord]) {
    for (position, record) in records.iter().enumerate() {
        assert_eq!(record.item_id, position as ItemId + 1, "gap at position {}", position);
    }
}
