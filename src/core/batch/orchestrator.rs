//! Item-level entry point for enrichment

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::batcher::split;
use super::executor::RequestExecutor;
use super::prompt::PromptBuilder;
use super::scheduler::{EnrichmentRun, WaveScheduler};
use crate::config::{CompletionConfig, EnrichmentConfig};
use crate::core::providers::CompletionProvider;
use crate::core::types::Item;
use crate::utils::error::Result;

/// Batches items and runs them through the wave scheduler
#[derive(Debug, Clone)]
pub struct EnrichmentOrchestrator {
    scheduler: WaveScheduler,
    batch_size: usize,
    max_batches: Option<usize>,
}

impl EnrichmentOrchestrator {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        completion: &CompletionConfig,
        enrichment: &EnrichmentConfig,
    ) -> Self {
        let executor = Arc::new(RequestExecutor::from_config(provider, completion, enrichment));
        Self::with_scheduler(WaveScheduler::from_config(executor, enrichment), enrichment.batch_size)
    }

    pub fn with_scheduler(scheduler: WaveScheduler, batch_size: usize) -> Self {
        Self {
            scheduler,
            batch_size,
            max_batches: None,
        }
    }

    /// Only dispatch the first `max_batches` batches
    pub fn with_max_batches(mut self, max_batches: Option<usize>) -> Self {
        self.max_batches = max_batches;
        self
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.scheduler = self.scheduler.with_prompt_builder(prompts);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.scheduler = self.scheduler.with_cancellation(token);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn enrich(&self, items: Vec<Item>) -> Result<EnrichmentRun> {
        let mut batches = split(items, self.batch_size)?;

        if let Some(limit) = self.max_batches {
            if batches.len() > limit {
                info!(total = batches.len(), limit, "Limiting run to the first batches");
                batches.truncate(limit);
            }
        }

        Ok(self.scheduler.run(batches).await)
    }
}
