//! # enrichment-rs
//!
//! Batch enrichment of product records through an OpenAI-compatible
//! chat-completion service.
//!
//! A run lists new product files in object storage, splits their
//! descriptions into fixed-size batches, asks the completion service for a
//! schema-constrained classification and review of every item, and uploads
//! the products merged with their reviews.
//!
//! ## Features
//!
//! - **Schema-constrained output**: every response is validated against a
//!   strict JSON Schema sized to its batch
//! - **Bounded concurrency**: batches run in joined waves of a fixed width
//! - **Retry with backoff**: fixed or exponential, bounded by a per-batch deadline
//! - **Pluggable storage**: Supabase storage REST API or a local directory
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use enrichment_rs::{Pipeline, PipelineConfig, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::load(None).await?;
//!     let report = Pipeline::from_config(config)?
//!         .run(RunOptions::default())
//!         .await?;
//!
//!     println!("Merged {} records", report.merged);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod pipeline;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::{PipelineConfig, Validate};
pub use utils::error::{EnrichmentError, Result};

pub use core::batch::{
    BackoffStrategy, EnrichmentOrchestrator, EnrichmentResults, EnrichmentRun, ExecutionOutcome,
    ExecutionStatus, PromptBuilder, RequestContext, RequestExecutor, ResponseValidationError,
    RetryPolicy, RunStats, WaveScheduler,
};
pub use core::providers::{CompletionProvider, OpenAICompatibleProvider, ProviderError};
pub use core::types::{Batch, EnrichmentResponse, Item, ItemId, ItemReview, MergedRecord, Product};
pub use pipeline::{Pipeline, RunOptions, RunReport};
pub use storage::{LocalStorage, ObjectStore, SupabaseStorage};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
