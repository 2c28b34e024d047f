//! Product and item records

use serde::{Deserialize, Deserializer, Serialize};

/// Caller-assigned item identifier, 1-based position in the run
pub type ItemId = u64;

/// Raw product record as crawled into the source bucket
///
/// Crawled files are ragged: missing fields and explicit nulls both decode
/// to the field's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(deserialize_with = "null_as_default")]
    pub product_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub price: f32,
    #[serde(deserialize_with = "null_as_default")]
    pub quantity: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub availability: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub discount_percentage: f32,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    /// Opaque user identifier
    #[serde(rename = "id", deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub shop_id: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The unit sent for enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub description: String,
}

impl Item {
    pub fn new(item_id: ItemId, description: impl Into<String>) -> Self {
        Self {
            item_id,
            description: description.into(),
        }
    }
}

/// An ordered group of items sent as one completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    index: usize,
    items: Vec<Item>,
}

impl Batch {
    pub fn new(index: usize, items: Vec<Item>) -> Self {
        Self { index, items }
    }

    /// Position of the batch in the run, also its result key
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().map(|item| item.item_id)
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}

/// Product joined with its review, the shape uploaded to the output prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub product_name: String,
    pub price: f32,
    pub quantity: i64,
    pub category: String,
    pub description: String,
    pub availability: bool,
    pub discount_percentage: f32,
    pub date: String,
    pub item_id: ItemId,
    pub classification: String,
    pub review: String,
    #[serde(rename = "id")]
    pub user_id: String,
    pub shop_id: String,
}
