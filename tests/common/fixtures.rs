//! Test fixtures and data factories
//!
//! Provides factory methods for creating test data with sensible defaults.

use enrichment_rs::config::{
    CompletionConfig, EnrichmentConfig, PipelineConfig, StorageBackend, StorageConfig,
};
use enrichment_rs::{Item, Product};
use serde_json::{Value, json};
use std::path::Path;

/// Factory for raw product records
pub struct ProductFactory;

impl ProductFactory {
    /// Product number `n` as it appears in a source file
    pub fn json(n: usize) -> Value {
        json!({
            "product_name": format!("Product {}", n),
            "price": 9.99,
            "quantity": n,
            "category": "groceries",
            "description": format!("Handmade item number {} with a long shelf life", n),
            "availability": n % 2 == 0,
            "discount_percentage": 5.0,
            "date": "2025-03-14",
            "id": format!("user-{}", n),
            "shop_id": format!("shop-{}", n % 3)
        })
    }

    /// Products `start..start + count` as one source file body
    pub fn file(start: usize, count: usize) -> Vec<u8> {
        let products: Vec<Value> = (start..start + count).map(Self::json).collect();
        serde_json::to_vec(&products).expect("serialize products")
    }

    pub fn product(n: usize) -> Product {
        serde_json::from_value(Self::json(n)).expect("valid product")
    }

    /// Items with ids `1..=count`
    pub fn items(count: u64) -> Vec<Item> {
        (1..=count)
            .map(|id| Item::new(id, format!("Description of item {}", id)))
            .collect()
    }
}

/// Configuration for a local-storage run against `base_url`
pub fn test_config(root: &Path, base_url: &str) -> PipelineConfig {
    PipelineConfig {
        completion: CompletionConfig {
            base_url: base_url.to_string(),
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            temperature: 0.0,
            ..CompletionConfig::default()
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            local_root: Some(root.to_string_lossy().into_owned()),
            ..StorageConfig::default()
        },
        enrichment: EnrichmentConfig {
            request_timeout_secs: 10,
            retry_backoff_ms: 10,
            ..EnrichmentConfig::default()
        },
    }
}
