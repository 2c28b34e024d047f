//! Extraction of raw product files

use std::ops::Range;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::core::types::{Item, ItemId, Product};
use crate::storage::{ObjectEntry, ObjectStore};
use crate::utils::error::Result;

/// A downloaded source file and the item ids its products received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub name: String,
    pub item_ids: Range<ItemId>,
}

impl SourceFile {
    pub fn product_count(&self) -> usize {
        (self.item_ids.end - self.item_ids.start) as usize
    }
}

/// Everything pulled from the source prefix in one run
#[derive(Debug, Clone, Default)]
pub struct ExtractedData {
    /// Products in listing order, then file order
    pub products: Vec<Product>,
    pub files: Vec<SourceFile>,
    /// Files that could not be downloaded or parsed
    pub skipped: Vec<String>,
}

impl ExtractedData {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn items(&self) -> Vec<Item> {
        flatten(&self.products)
    }
}

/// Turn products into items with 1-based positional ids
pub fn flatten(products: &[Product]) -> Vec<Item> {
    products
        .iter()
        .enumerate()
        .map(|(position, product)| Item::new(position as ItemId + 1, product.description.clone()))
        .collect()
}

/// Parse one source file
pub fn parse_products(bytes: &[u8]) -> serde_json::Result<Vec<Product>> {
    serde_json::from_slice(bytes)
}

/// Lists and downloads new source files
pub struct Extractor {
    store: Arc<dyn ObjectStore>,
    source_prefix: String,
    download_wave: usize,
}

impl Extractor {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            source_prefix: config.source_prefix.clone(),
            download_wave: config.download_wave.max(1),
        }
    }

    /// Download and parse every file under the source prefix
    ///
    /// A failing listing aborts the run. Individual files that fail to
    /// download or parse are logged and skipped.
    pub async fn extract(&self) -> Result<ExtractedData> {
        let entries = self.store.list(&self.source_prefix).await?;
        info!(prefix = %self.source_prefix, files = entries.len(), "Listed source files");

        let mut data = ExtractedData::default();

        for (wave, chunk) in entries.chunks(self.download_wave).enumerate() {
            debug!(wave, files = chunk.len(), "Downloading wave");
            let downloads = join_all(chunk.iter().map(|entry| self.fetch(entry))).await;

            for (entry, result) in chunk.iter().zip(downloads) {
                match result {
                    Some(products) => {
                        let start = data.products.len() as ItemId + 1;
                        let end = start + products.len() as ItemId;
                        data.files.push(SourceFile {
                            path: entry.path.clone(),
                            name: entry.name.clone(),
                            item_ids: start..end,
                        });
                        data.products.extend(products);
                    }
                    None => data.skipped.push(entry.path.clone()),
                }
            }
        }

        info!(
            files = data.files.len(),
            skipped = data.skipped.len(),
            products = data.products.len(),
            "Extraction finished"
        );
        Ok(data)
    }

    async fn fetch(&self, entry: &ObjectEntry) -> Option<Vec<Product>> {
        let bytes = match self.store.download(&entry.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %entry.path, error = %e, "Failed to download source file, skipping");
                return None;
            }
        };

        match parse_products(&bytes) {
            Ok(products) => {
                debug!(file = %entry.path, products = products.len(), "Parsed source file");
                Some(products)
            }
            Err(e) => {
                warn!(file = %entry.path, error = %e, "Failed to parse source file, skipping");
                None
            }
        }
    }
}
