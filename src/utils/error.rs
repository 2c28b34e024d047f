//! Error handling for the enrichment pipeline
//!
//! This module defines the crate-wide error type. Completion-adapter failures
//! have their own [`ProviderError`](crate::core::providers::ProviderError),
//! which converts into [`EnrichmentError`] when it has to cross a phase
//! boundary. Failed batch attempts never surface here; they end up in the
//! run statistics.

use crate::core::providers::ProviderError;
use thiserror::Error;

/// Result type alias for the pipeline
pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied invalid input (zero batch size, bad ids, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Requested object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Completion provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EnrichmentError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Whether the error happened before any work started and should stop the process
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Yaml(_))
    }
}
