//! Fixed-size batching

use crate::core::types::{Batch, Item};
use crate::utils::error::{EnrichmentError, Result};

/// Split `data` into consecutive chunks of at most `size` elements
///
/// Order is preserved and only the last chunk may be shorter. `size` must be
/// greater than zero; callers validate it first.
pub fn chunked<T>(data: Vec<T>, size: usize) -> Vec<Vec<T>> {
    debug_assert!(size > 0, "chunk size must be positive");
    let size = size.max(1);

    let mut chunks = Vec::with_capacity(data.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(data.len()));

    for element in data {
        current.push(element);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Partition items into indexed batches of `batch_size`
pub fn split(items: Vec<Item>, batch_size: usize) -> Result<Vec<Batch>> {
    if batch_size == 0 {
        return Err(EnrichmentError::validation(
            "batch size must be greater than 0",
        ));
    }

    Ok(chunked(items, batch_size)
        .into_iter()
        .enumerate()
        .map(|(index, items)| Batch::new(index, items))
        .collect())
}
