//! E2E tests against a live OpenAI-compatible server
//!
//! The server must support `response_format` with `json_schema`.

#[cfg(test)]
mod tests {
    use crate::common::{ProductFactory, test_config};
    use crate::skip_without_env;
    use enrichment_rs::config::PipelineConfig;
    use enrichment_rs::storage::{LocalStorage, ObjectStore};
    use enrichment_rs::{EnrichmentOrchestrator, OpenAICompatibleProvider, Pipeline, RunOptions};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn live_config(dir: &TempDir) -> PipelineConfig {
        let base_url = std::env::var("COMPLETION_BASE_URL").unwrap_or_default();
        let mut config = test_config(dir.path(), &base_url);
        config.completion.api_key = None;
        config.enrichment.request_timeout_secs = 120;
        config.enrichment.retry_backoff_ms = 1_000;
        config.apply_env().unwrap();
        config
    }

    /// E2E test enriching one small batch directly
    #[tokio::test]
    #[ignore]
    async fn test_enrich_single_batch() {
        skip_without_env!("COMPLETION_BASE_URL");

        let dir = TempDir::new().unwrap();
        let config = live_config(&dir);
        let provider = Arc::new(OpenAICompatibleProvider::new(&config.completion).unwrap());

        let orchestrator =
            EnrichmentOrchestrator::new(provider, &config.completion, &config.enrichment);
        let run = orchestrator.enrich(ProductFactory::items(5)).await.unwrap();

        assert_eq!(run.stats.batches_succeeded, 1, "batch lost: {:?}", run.reports);
        let reviews = run.results.reviews_by_item();
        assert_eq!(reviews.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert!(reviews.values().all(|r| !r.review.trim().is_empty()));
    }

    /// E2E test running the whole pipeline over a local bucket
    #[tokio::test]
    #[ignore]
    async fn test_pipeline_run() {
        skip_without_env!("COMPLETION_BASE_URL");

        let dir = TempDir::new().unwrap();
        let config = live_config(&dir);
        let store = LocalStorage::new(dir.path(), &config.storage.bucket);
        store
            .upload("bronze/new/a.json", ProductFactory::file(1, 30), "application/json", false)
            .await
            .unwrap();

        let report = Pipeline::from_config(config)
            .unwrap()
            .run(RunOptions {
                cleanup: true,
                max_batches: None,
                analytics: false,
            })
            .await
            .unwrap();

        assert_eq!(report.products, 30);
        assert_eq!(report.batches_total, 2);
        if report.is_complete() {
            assert_eq!(report.archived, 1);
        }
    }
}
