//! End-to-end enrichment run
//!
//! One run extracts new product files, enriches their descriptions in
//! batches, uploads the merged records and, when asked, publishes KPI tables
//! and archives the source files whose products were all reviewed.

pub mod analytics;
pub mod extract;
pub mod load;

pub use analytics::{AnalyticsReport, KpiDimension, KpiPublisher, KpiRow, compute_kpis};
pub use extract::{ExtractedData, Extractor, SourceFile, flatten};
pub use load::{ArchiveReport, LoadReport, Loader, MergeOutcome, merge};

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::core::batch::EnrichmentOrchestrator;
use crate::core::providers::{CompletionProvider, OpenAICompatibleProvider};
use crate::storage::{ObjectStore, build_store};
use crate::utils::error::{EnrichmentError, Result};
use crate::utils::format_duration;

/// Per-run switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Move fully reviewed source files to the processed prefix
    pub cleanup: bool,
    /// Only enrich the first N batches
    pub max_batches: Option<usize>,
    /// Upload per-shop, per-user and per-date KPI tables
    pub analytics: bool,
}

/// Wall-clock time spent in each phase
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseTimings {
    pub extract: Duration,
    pub enrich: Duration,
    pub load: Duration,
    pub analytics: Duration,
    pub cleanup: Duration,
}

/// Summary of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Identifier attached to every log line of the run
    pub run_id: Uuid,
    pub files: usize,
    pub files_skipped: usize,
    pub products: usize,
    pub items: usize,
    pub batches_total: usize,
    pub batches_succeeded: usize,
    pub batches_lost: usize,
    pub items_lost: usize,
    pub reviews: usize,
    pub merged: usize,
    pub missing_reviews: usize,
    pub chunks_uploaded: usize,
    pub chunks_failed: usize,
    pub kpi_tables_uploaded: usize,
    pub kpi_tables_failed: usize,
    pub archived: usize,
    pub timings: PhaseTimings,
}

impl RunReport {
    /// Whether every batch and every upload succeeded
    pub fn is_complete(&self) -> bool {
        self.batches_lost == 0 && self.chunks_failed == 0 && self.kpi_tables_failed == 0
    }
}

/// Extract, enrich, load and clean up
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn ObjectStore>,
    provider: Arc<dyn CompletionProvider>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ObjectStore>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
            cancel: CancellationToken::new(),
        }
    }

    /// Build storage and completion clients from configuration
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let store = build_store(&config.storage)?;
        let provider = OpenAICompatibleProvider::new(&config.completion).map_err(EnrichmentError::from)?;
        Ok(Self::new(config, store, Arc::new(provider)))
    }

    /// Cancel in-flight and pending batches when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("enrichment_run", run_id = %run_id);
        self.run_phases(run_id, options).instrument(span).await
    }

    async fn run_phases(&self, run_id: Uuid, options: RunOptions) -> Result<RunReport> {
        let mut report = RunReport {
            run_id,
            ..RunReport::default()
        };
        info!(
            cleanup = options.cleanup,
            analytics = options.analytics,
            max_batches = ?options.max_batches,
            "Run started"
        );

        let phase = Instant::now();
        let extracted = Extractor::new(Arc::clone(&self.store), &self.config.storage)
            .extract()
            .await?;
        report.timings.extract = phase.elapsed();
        report.files = extracted.files.len();
        report.files_skipped = extracted.skipped.len();
        report.products = extracted.products.len();

        if extracted.is_empty() {
            info!("No new products to enrich");
            return Ok(report);
        }

        let phase = Instant::now();
        let items = extracted.items();
        report.items = items.len();

        let orchestrator = EnrichmentOrchestrator::new(
            Arc::clone(&self.provider),
            &self.config.completion,
            &self.config.enrichment,
        )
        .with_max_batches(options.max_batches)
        .with_cancellation(self.cancel.clone());

        let run = orchestrator.enrich(items).await?;
        report.timings.enrich = phase.elapsed();
        report.batches_total = run.stats.batches_total;
        report.batches_succeeded = run.stats.batches_succeeded;
        report.batches_lost = run.stats.batches_lost;
        report.items_lost = run.stats.items_lost;
        report.reviews = run.results.review_count();

        let phase = Instant::now();
        let reviews = run.results.reviews_by_item();
        let merged = merge(&extracted.products, &reviews);
        report.merged = merged.records.len();
        report.missing_reviews = merged.missing;

        let loader = Loader::new(Arc::clone(&self.store), &self.config.storage);
        let load = loader.load(&merged.records).await?;
        report.timings.load = phase.elapsed();
        report.chunks_uploaded = load.uploaded.len();
        report.chunks_failed = load.failed.len();

        if options.analytics {
            let phase = Instant::now();
            let kpis = KpiPublisher::new(Arc::clone(&self.store), &self.config.storage)
                .publish(&merged.records)
                .await?;
            report.timings.analytics = phase.elapsed();
            report.kpi_tables_uploaded = kpis.uploaded.len();
            report.kpi_tables_failed = kpis.failed.len();
        }

        if options.cleanup {
            let phase = Instant::now();
            if load.failed.is_empty() {
                let archive = loader.archive_processed(&extracted.files, &reviews).await;
                report.archived = archive.moved.len();
            } else {
                info!("Skipping cleanup because some output chunks failed to upload");
            }
            report.timings.cleanup = phase.elapsed();
        }

        info!(
            files = report.files,
            products = report.products,
            batches = report.batches_total,
            lost = report.batches_lost,
            merged = report.merged,
            uploaded = report.chunks_uploaded,
            kpi_tables = report.kpi_tables_uploaded,
            archived = report.archived,
            extract = %format_duration(report.timings.extract.as_millis() as u64),
            enrich = %format_duration(report.timings.enrich.as_millis() as u64),
            load = %format_duration(report.timings.load.as_millis() as u64),
            "Run finished"
        );

        Ok(report)
    }
}
