//! Configuration models

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chat-completion service
    pub completion: CompletionConfig,
    /// Object storage holding source and output files
    pub storage: StorageConfig,
    /// Batching, concurrency and retry settings
    pub enrichment: EnrichmentConfig,
}

/// Chat-completion service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL up to and including the API version, e.g. `http://localhost:8000/v1`
    pub base_url: String,
    /// Bearer token; local servers usually accept none
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 1.0,
            connect_timeout_secs: 10,
        }
    }
}

/// Object storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Supabase-style storage REST API
    #[default]
    Supabase,
    /// Directory on the local filesystem
    Local,
}

/// Object storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Storage API endpoint, e.g. `https://<project>.supabase.co/storage/v1`
    pub url: String,
    /// Service key used as bearer token and `apikey` header
    pub api_key: Option<String>,
    pub bucket: String,
    /// Root directory for the local backend
    pub local_root: Option<String>,
    /// Prefix listing new raw files
    pub source_prefix: String,
    /// Prefix raw files are moved to once fully processed
    pub processed_prefix: String,
    /// Prefix merged output is uploaded to
    pub output_prefix: String,
    /// Prefix KPI tables are uploaded to
    pub analytics_prefix: String,
    /// Files downloaded concurrently per wave
    pub download_wave: usize,
    /// Chunks uploaded concurrently per wave
    pub upload_wave: usize,
    /// Merged records per uploaded file
    pub output_chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Supabase,
            url: String::new(),
            api_key: None,
            bucket: "datalake".to_string(),
            local_root: None,
            source_prefix: "bronze/new".to_string(),
            processed_prefix: "bronze/processed".to_string(),
            output_prefix: "silver".to_string(),
            analytics_prefix: "gold".to_string(),
            download_wave: 10,
            upload_wave: 5,
            output_chunk_size: 50_000,
        }
    }
}

/// Backoff strategy between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay after every failure
    #[default]
    Fixed,
    /// Delay doubles after every failure, capped at `max_backoff_ms`
    Exponential,
}

/// Batching, concurrency and retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Items per completion request
    pub batch_size: usize,
    /// Requests in flight per wave
    pub concurrency: usize,
    /// Deadline for one batch, covering all of its attempts
    pub request_timeout_secs: u64,
    /// Attempts per batch, including the first one
    pub max_retries: u32,
    /// Delay after a failed attempt
    pub retry_backoff_ms: u64,
    pub backoff: BackoffKind,
    /// Upper bound for exponential backoff
    pub max_backoff_ms: u64,
    /// Add +/-10% jitter to exponential backoff
    pub backoff_jitter: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            concurrency: 4,
            request_timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 3_000,
            backoff: BackoffKind::Fixed,
            max_backoff_ms: 30_000,
            backoff_jitter: false,
        }
    }
}

impl EnrichmentConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}
