//! Merging and loading enriched records

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::extract::SourceFile;
use crate::config::StorageConfig;
use crate::core::batch::chunked;
use crate::core::types::{ItemId, ItemReview, MergedRecord, Product};
use crate::storage::{ObjectStore, join_path};
use crate::utils::error::Result;

/// Products joined with their reviews
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<MergedRecord>,
    /// Products without a review, left out of `records`
    pub missing: usize,
}

/// Join product `item_id` with its review
pub fn merge_record(item_id: ItemId, product: &Product, review: &ItemReview) -> MergedRecord {
    MergedRecord {
        product_name: product.product_name.clone(),
        price: product.price,
        quantity: product.quantity,
        category: product.category.clone(),
        description: product.description.clone(),
        availability: product.availability,
        discount_percentage: product.discount_percentage,
        date: product.date.clone(),
        item_id,
        classification: review.classification.clone(),
        review: review.review.clone(),
        user_id: product.user_id.clone(),
        shop_id: product.shop_id.clone(),
    }
}

/// Attach reviews to products by 1-based position
pub fn merge(products: &[Product], reviews: &BTreeMap<ItemId, ItemReview>) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (position, product) in products.iter().enumerate() {
        let item_id = position as ItemId + 1;
        match reviews.get(&item_id) {
            Some(review) => outcome.records.push(merge_record(item_id, product, review)),
            None => outcome.missing += 1,
        }
    }

    outcome
}

/// Result of uploading merged output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub uploaded: Vec<String>,
    pub failed: Vec<String>,
    pub records: usize,
}

/// Result of moving processed source files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub moved: Vec<String>,
    /// Files with unreviewed products, left for the next run
    pub kept: Vec<String>,
    pub failed: Vec<String>,
}

/// Uploads merged output and archives processed sources
pub struct Loader {
    store: Arc<dyn ObjectStore>,
    output_prefix: String,
    processed_prefix: String,
    chunk_size: usize,
    upload_wave: usize,
}

impl Loader {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            output_prefix: config.output_prefix.clone(),
            processed_prefix: config.processed_prefix.clone(),
            chunk_size: config.output_chunk_size.max(1),
            upload_wave: config.upload_wave.max(1),
        }
    }

    /// Object path of output part `part` written at `timestamp`
    pub fn output_path(&self, timestamp: i64, part: usize) -> String {
        join_path(
            &self.output_prefix,
            &format!("processed_data_{}_{}.json", timestamp, part),
        )
    }

    /// Upload `records` in chunks, several uploads at a time
    ///
    /// Failed uploads are logged and reported; they do not stop the others.
    pub async fn load(&self, records: &[MergedRecord]) -> Result<LoadReport> {
        let mut report = LoadReport {
            records: records.len(),
            ..LoadReport::default()
        };
        if records.is_empty() {
            info!("No merged records to upload");
            return Ok(report);
        }

        let timestamp = chrono::Utc::now().timestamp();
        let mut parts = Vec::new();
        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            let body = serde_json::to_vec(chunk)?;
            parts.push((self.output_path(timestamp, index + 1), body, chunk.len()));
        }

        for wave in chunked(parts, self.upload_wave) {
            let uploads = wave.into_iter().map(|(path, body, count)| async move {
                let result = self
                    .store
                    .upload(&path, body, "application/json", false)
                    .await;
                (path, count, result)
            });

            for (path, count, result) in join_all(uploads).await {
                match result {
                    Ok(()) => {
                        debug!(path = %path, records = count, "Uploaded output chunk");
                        report.uploaded.push(path);
                    }
                    Err(e) => {
                        warn!(path = %path, records = count, error = %e, "Failed to upload output chunk");
                        report.failed.push(path);
                    }
                }
            }
        }

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            records = report.records,
            "Load finished"
        );
        Ok(report)
    }

    /// Move every source file whose products were all reviewed
    pub async fn archive_processed(
        &self,
        files: &[SourceFile],
        reviews: &BTreeMap<ItemId, ItemReview>,
    ) -> ArchiveReport {
        let mut report = ArchiveReport::default();

        for file in files {
            let complete = file.item_ids.clone().all(|id| reviews.contains_key(&id));
            if !complete {
                debug!(file = %file.path, "Source file has unreviewed products, keeping it");
                report.kept.push(file.path.clone());
                continue;
            }

            let destination = join_path(&self.processed_prefix, &file.name);
            match self.store.move_object(&file.path, &destination).await {
                Ok(()) => report.moved.push(file.path.clone()),
                Err(e) => {
                    warn!(file = %file.path, error = %e, "Failed to archive source file");
                    report.failed.push(file.path.clone());
                }
            }
        }

        info!(
            moved = report.moved.len(),
            kept = report.kept.len(),
            failed = report.failed.len(),
            "Archived processed source files"
        );
        report
    }
}
