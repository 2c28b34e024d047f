//! Wave-based concurrency scheduling
//!
//! Batches are dispatched in waves of at most `concurrency` tasks. A wave is
//! joined completely before the next one starts, so one slow batch holds up
//! its whole wave. Lost batches never abort the run.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::context::RequestContext;
use super::executor::{ExecutionStatus, RequestExecutor};
use super::prompt::PromptBuilder;
use super::store::{EnrichmentResults, ResultStore};
use crate::config::EnrichmentConfig;
use crate::core::types::Batch;

/// How a batch left the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Succeeded,
    Exhausted,
    Cancelled,
    /// Task panicked or was never dispatched
    Aborted,
}

/// Per-batch summary kept for the run report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub index: usize,
    pub items: usize,
    pub attempts: u32,
    pub wave: usize,
    pub status: BatchStatus,
}

/// Aggregate counters for one scheduler run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub batches_total: usize,
    pub batches_succeeded: usize,
    pub batches_lost: usize,
    pub items_lost: usize,
    pub waves: usize,
    pub attempts: u64,
    pub lost_batches: Vec<usize>,
    /// Wall-clock time of each dispatched wave
    pub wave_timings: Vec<Duration>,
    pub elapsed: Duration,
}

impl RunStats {
    fn record(&mut self, report: &BatchReport) {
        self.attempts += u64::from(report.attempts);
        if report.status == BatchStatus::Succeeded {
            self.batches_succeeded += 1;
        } else {
            self.batches_lost += 1;
            self.items_lost += report.items;
            self.lost_batches.push(report.index);
        }
    }
}

/// Output of a scheduler run
#[derive(Debug, Clone, Default)]
pub struct EnrichmentRun {
    pub results: EnrichmentResults,
    pub stats: RunStats,
    pub reports: Vec<BatchReport>,
}

/// Dispatches batches in joined waves
#[derive(Debug, Clone)]
pub struct WaveScheduler {
    executor: Arc<RequestExecutor>,
    prompts: Arc<PromptBuilder>,
    concurrency: usize,
    request_timeout: Duration,
    cancel: CancellationToken,
}

impl WaveScheduler {
    pub fn new(executor: Arc<RequestExecutor>, concurrency: usize, request_timeout: Duration) -> Self {
        Self {
            executor,
            prompts: Arc::new(PromptBuilder::new()),
            concurrency: concurrency.max(1),
            request_timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(executor: Arc<RequestExecutor>, config: &EnrichmentConfig) -> Self {
        Self::new(executor, config.concurrency, config.request_timeout())
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Tie every request context to `token`
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every batch and collect the successful responses
    pub async fn run(&self, batches: Vec<Batch>) -> EnrichmentRun {
        if batches.is_empty() {
            debug!("No batches to schedule");
            return EnrichmentRun::default();
        }

        let started = Instant::now();
        let store = Arc::new(ResultStore::new());
        let mut stats = RunStats {
            batches_total: batches.len(),
            ..RunStats::default()
        };
        let mut reports = Vec::with_capacity(batches.len());

        let total_waves = batches.len().div_ceil(self.concurrency);
        info!(
            batches = batches.len(),
            waves = total_waves,
            concurrency = self.concurrency,
            "Starting enrichment"
        );

        let mut remaining = batches.into_iter().peekable();
        let mut wave = 0;

        while remaining.peek().is_some() {
            let wave_batches: Vec<Batch> = remaining.by_ref().take(self.concurrency).collect();

            if self.cancel.is_cancelled() {
                for batch in wave_batches.into_iter().chain(remaining.by_ref()) {
                    let report = BatchReport {
                        index: batch.index(),
                        items: batch.len(),
                        attempts: 0,
                        wave,
                        status: BatchStatus::Aborted,
                    };
                    warn!(
                        batch = report.index,
                        items = report.items,
                        attempts = 0,
                        "Run cancelled before dispatch, batch lost"
                    );
                    stats.record(&report);
                    reports.push(report);
                }
                break;
            }

            stats.waves += 1;
            let wave_started = Instant::now();
            let wave_reports = self.run_wave(wave, wave_batches, &store).await;
            let wave_elapsed = wave_started.elapsed();
            debug!(
                wave,
                succeeded = wave_reports
                    .iter()
                    .filter(|r| r.status == BatchStatus::Succeeded)
                    .count(),
                elapsed_ms = wave_elapsed.as_millis() as u64,
                "Wave joined"
            );
            stats.wave_timings.push(wave_elapsed);
            for report in wave_reports {
                stats.record(&report);
                reports.push(report);
            }
            wave += 1;
        }

        stats.elapsed = started.elapsed();
        let results = match Arc::try_unwrap(store) {
            Ok(store) => store.into_results(),
            Err(shared) => shared.snapshot(),
        };

        info!(
            succeeded = stats.batches_succeeded,
            lost = stats.batches_lost,
            reviews = results.review_count(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Enrichment finished"
        );

        EnrichmentRun {
            results,
            stats,
            reports,
        }
    }

    async fn run_wave(&self, wave: usize, batches: Vec<Batch>, store: &Arc<ResultStore>) -> Vec<BatchReport> {
        debug!(wave, batches = batches.len(), "Dispatching wave");

        let mut meta = Vec::with_capacity(batches.len());
        let mut handles = Vec::with_capacity(batches.len());

        for batch in batches {
            meta.push((batch.index(), batch.len()));

            let executor = Arc::clone(&self.executor);
            let prompts = Arc::clone(&self.prompts);
            let store = Arc::clone(store);
            let ctx = RequestContext::child_of(&self.cancel, self.request_timeout);

            handles.push(tokio::spawn(async move {
                let prompt = prompts.build(&batch);
                let outcome = executor.execute(&ctx, &batch, &prompt).await;
                let attempts = outcome.attempts;

                let status = match outcome.status {
                    ExecutionStatus::Succeeded(response) => {
                        store.insert(batch.index(), response);
                        BatchStatus::Succeeded
                    }
                    ExecutionStatus::Exhausted { last_error } => {
                        warn!(
                            batch = batch.index(),
                            items = batch.len(),
                            attempts,
                            error = %last_error,
                            "Retries exhausted, batch lost"
                        );
                        BatchStatus::Exhausted
                    }
                    ExecutionStatus::Cancelled { reason } => {
                        warn!(
                            batch = batch.index(),
                            items = batch.len(),
                            attempts,
                            reason = %reason,
                            "Batch cancelled, batch lost"
                        );
                        BatchStatus::Cancelled
                    }
                };

                (attempts, status)
            }));
        }

        let joined = join_all(handles).await;

        meta
            .into_iter()
            .zip(joined)
            .map(|((index, items), joined)| match joined {
                Ok((attempts, status)) => BatchReport {
                    index,
                    items,
                    attempts,
                    wave,
                    status,
                },
                Err(e) => {
                    error!(batch = index, items, error = %e, "Batch task failed, batch lost");
                    BatchReport {
                        index,
                        items,
                        attempts: 0,
                        wave,
                        status: BatchStatus::Aborted,
                    }
                }
            })
            .collect()
    }
}
