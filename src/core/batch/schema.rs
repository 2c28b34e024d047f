//! Structured output schema and response validation
//!
//! The same JSON Schema is sent to the completion service as a strict
//! `json_schema` response format and enforced locally on whatever comes back,
//! since OpenAI-compatible servers differ in how faithfully they honour it.

use std::collections::{BTreeSet, HashSet};

use jsonschema::{Draft, JSONSchema};
use serde_json::{Value, json};
use thiserror::Error;

use crate::core::types::{Batch, EnrichmentResponse, ItemId, JsonSchemaFormat, ResponseFormat};

/// Name of the response format sent with every request
pub const SCHEMA_NAME: &str = "item_reviews";

/// Reasons a completion's content is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseValidationError {
    #[error("Response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Response violates schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Response could not be deserialized: {0}")]
    Deserialize(String),

    #[error("Response references items outside the batch: {0:?}")]
    UnknownItemIds(Vec<ItemId>),

    #[error("Response reviews items more than once: {0:?}")]
    DuplicateItemIds(Vec<ItemId>),

    #[error("Invalid response schema: {0}")]
    InvalidSchema(String),
}

/// JSON Schema for a batch of `expected_len` items
pub fn review_schema(expected_len: usize) -> Value {
    json!({
        "type": "object",
        "properties": {
            "reviews": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "item_id": { "type": "integer" },
                        "classification": { "type": "string" },
                        "review": { "type": "string" }
                    },
                    "required": ["item_id", "classification", "review"],
                    "additionalProperties": false
                },
                "minItems": expected_len,
                "maxItems": expected_len
            }
        },
        "required": ["reviews"],
        "additionalProperties": false
    })
}

/// Strict `json_schema` response format for a batch of `expected_len` items
pub fn response_format(expected_len: usize) -> ResponseFormat {
    ResponseFormat::json_schema(JsonSchemaFormat {
        name: SCHEMA_NAME.to_string(),
        description: Some("Classification and review for every item in the batch".to_string()),
        schema: review_schema(expected_len),
        strict: true,
    })
}

/// Validates completion content against the schema of one batch
pub struct ResponseValidator {
    schema: JSONSchema,
    expected_ids: HashSet<ItemId>,
    expected_len: usize,
}

impl std::fmt::Debug for ResponseValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseValidator")
            .field("expected_len", &self.expected_len)
            .finish_non_exhaustive()
    }
}

impl ResponseValidator {
    pub fn for_batch(batch: &Batch) -> Result<Self, ResponseValidationError> {
        let schema_value = review_schema(batch.len());
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_value)
            .map_err(|e| ResponseValidationError::InvalidSchema(e.to_string()))?;

        Ok(Self {
            schema,
            expected_ids: batch.item_ids().collect(),
            expected_len: batch.len(),
        })
    }

    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Parse and check completion content
    ///
    /// Content must be JSON, conform to the schema, deserialize, and review
    /// each item of the batch exactly once.
    pub fn parse(&self, content: &str) -> Result<EnrichmentResponse, ResponseValidationError> {
        let value: Value = serde_json::from_str(content.trim())
            .map_err(|e| ResponseValidationError::MalformedJson(e.to_string()))?;

        if let Err(errors) = self.schema.validate(&value) {
            let violations: Vec<String> = errors
                .map(|e| {
                    format!(
                        "Property '{}': {}",
                        e.instance_path,
                        e.to_string().replace('\n', " ")
                    )
                })
                .collect();
            return Err(ResponseValidationError::SchemaViolation(violations));
        }

        let response: EnrichmentResponse = serde_json::from_value(value)
            .map_err(|e| ResponseValidationError::Deserialize(e.to_string()))?;

        self.check_ids(&response)?;
        Ok(response)
    }

    fn check_ids(&self, response: &EnrichmentResponse) -> Result<(), ResponseValidationError> {
        let unknown: BTreeSet<ItemId> = response
            .reviews
            .iter()
            .map(|review| review.item_id)
            .filter(|id| !self.expected_ids.contains(id))
            .collect();
        if !unknown.is_empty() {
            return Err(ResponseValidationError::UnknownItemIds(
                unknown.into_iter().collect(),
            ));
        }

        let mut seen = HashSet::with_capacity(response.len());
        let duplicates: BTreeSet<ItemId> = response
            .reviews
            .iter()
            .map(|review| review.item_id)
            .filter(|id| !seen.insert(*id))
            .collect();
        if !duplicates.is_empty() {
            return Err(ResponseValidationError::DuplicateItemIds(
                duplicates.into_iter().collect(),
            ));
        }

        Ok(())
    }
}
