//! Batch enrichment: batching, prompting, retrying and wave scheduling
//!
//! Items are split into fixed-size batches, each batch becomes one
//! schema-constrained completion request, and batches run in joined waves of
//! bounded concurrency. Successful responses land in a shared store keyed by
//! batch index.

mod batcher;
mod context;
mod executor;
mod orchestrator;
mod prompt;
mod retry;
mod scheduler;
mod schema;
mod store;


pub use batcher::{chunked, split};
pub use context::{ContextError, RequestContext};
pub use executor::{AttemptError, ExecutionOutcome, ExecutionStatus, RequestExecutor};
pub use orchestrator::EnrichmentOrchestrator;
pub use prompt::{Prompt, PromptBuilder, SYSTEM_INSTRUCTION};
pub use retry::{BackoffStrategy, RetryPolicy, RetryState};
pub use scheduler::{BatchReport, BatchStatus, EnrichmentRun, RunStats, WaveScheduler};
pub use schema::{
    ResponseValidationError, ResponseValidator, SCHEMA_NAME, response_format, review_schema,
};
pub use store::{EnrichmentResults, ResultStore};
