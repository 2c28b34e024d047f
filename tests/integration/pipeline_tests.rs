//! Pipeline integration tests
//!
//! Full runs over a temporary local bucket, with the completion service
//! played by a wiremock server or an in-process stub.

#[cfg(test)]
mod tests {
    use crate::common::assertions::assert_consecutive_ids;
    use crate::common::storage::{MockStore, entry};
    use crate::common::{EchoResponder, ProductFactory, StubProvider, test_config};
    use enrichment_rs::config::PipelineConfig;
    use enrichment_rs::pipeline::KpiRow;
    use enrichment_rs::storage::{LocalStorage, ObjectStore};
    use enrichment_rs::{EnrichmentError, MergedRecord, Pipeline, RunOptions};
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Temporary bucket seeded with one source file per entry of `sizes`
    async fn seeded_bucket(sizes: &[usize]) -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path(), "datalake");

        let mut next = 1;
        for (index, count) in sizes.iter().enumerate() {
            let name = format!("bronze/new/{}.json", (b'a' + index as u8) as char);
            store
                .upload(&name, ProductFactory::file(next, *count), "application/json", false)
                .await
                .unwrap();
            next += count;
        }

        (dir, store)
    }

    async fn echo_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(EchoResponder)
            .mount(&server)
            .await;
        server
    }

    fn config_for(dir: &TempDir, server: &MockServer) -> PipelineConfig {
        test_config(dir.path(), &format!("{}/v1", server.uri()))
    }

    async fn output_records(store: &LocalStorage) -> Vec<MergedRecord> {
        let mut records = Vec::new();
        for object in store.list("silver").await.unwrap() {
            let bytes = store.download(&object.path).await.unwrap();
            let chunk: Vec<MergedRecord> = serde_json::from_slice(&bytes).unwrap();
            records.extend(chunk);
        }
        records.sort_by_key(|record| record.item_id);
        records
    }

    // ==================== Complete Runs ====================

    /// Test a run that enriches, uploads and archives everything
    #[tokio::test]
    async fn test_full_run_with_cleanup() {
        let (dir, store) = seeded_bucket(&[10, 30, 7]).await;
        let server = echo_server().await;

        let pipeline = Pipeline::from_config(config_for(&dir, &server)).unwrap();
        let report = pipeline
            .run(RunOptions {
                cleanup: true,
                max_batches: None,
                analytics: false,
            })
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.files, 3);
        assert_eq!(report.products, 47);
        assert_eq!(report.batches_total, 2);
        assert_eq!(report.batches_succeeded, 2);
        assert_eq!(report.reviews, 47);
        assert_eq!(report.merged, 47);
        assert_eq!(report.missing_reviews, 0);
        assert_eq!(report.chunks_uploaded, 1);
        assert_eq!(report.archived, 3);

        let records = output_records(&store).await;
        assert_eq!(records.len(), 47);
        assert_consecutive_ids(&records);
        assert!(records.iter().all(|r| r.classification == "groceries"));

        assert!(store.list("bronze/new").await.unwrap().is_empty());
        assert_eq!(store.list("bronze/processed").await.unwrap().len(), 3);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert!(store.list("gold").await.unwrap().is_empty());
    }

    /// Test that KPI tables are published under the analytics prefix
    #[tokio::test]
    async fn test_run_with_analytics() {
        let (dir, store) = seeded_bucket(&[10, 5]).await;
        let server = echo_server().await;

        let report = Pipeline::from_config(config_for(&dir, &server))
            .unwrap()
            .run(RunOptions {
                analytics: true,
                ..RunOptions::default()
            })
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.merged, 15);
        assert_eq!(report.kpi_tables_uploaded, 3);
        assert_eq!(report.kpi_tables_failed, 0);

        let tables = store.list("gold").await.unwrap();
        assert_eq!(tables.len(), 3);

        let table = |prefix: &str| {
            tables
                .iter()
                .find(|t| t.name.starts_with(prefix))
                .map(|t| t.path.clone())
                .unwrap()
        };
        let shops: Vec<KpiRow> =
            serde_json::from_slice(&store.download(&table("shop_kpis_")).await.unwrap()).unwrap();
        let users: Vec<KpiRow> =
            serde_json::from_slice(&store.download(&table("user_kpis_")).await.unwrap()).unwrap();
        let dates: Vec<KpiRow> =
            serde_json::from_slice(&store.download(&table("date_kpis_")).await.unwrap()).unwrap();

        assert_eq!(shops.len(), 3);
        assert_eq!(shops.iter().map(|row| row.records).sum::<usize>(), 15);
        assert_eq!(users.len(), 15);
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].key, "2025-03-14");
        assert_eq!(dates[0].total_quantity, (1..=15).sum::<i64>());
        assert_eq!(dates[0].top_classification, "groceries");
    }

    /// Test that output is split into several chunks
    #[tokio::test]
    async fn test_output_chunking() {
        let (dir, store) = seeded_bucket(&[12]).await;
        let server = echo_server().await;

        let mut config = config_for(&dir, &server);
        config.enrichment.batch_size = 5;
        config.storage.output_chunk_size = 5;

        let report = Pipeline::from_config(config)
            .unwrap()
            .run(RunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.batches_total, 3);
        assert_eq!(report.chunks_uploaded, 3);
        assert_eq!(report.archived, 0);
        assert_eq!(output_records(&store).await.len(), 12);
        assert_eq!(store.list("bronze/new").await.unwrap().len(), 1);
    }

    /// Test that limiting batches keeps partially reviewed files in place
    #[tokio::test]
    async fn test_max_batches_keeps_unreviewed_files() {
        let (dir, store) = seeded_bucket(&[10, 30]).await;
        let server = echo_server().await;

        let report = Pipeline::from_config(config_for(&dir, &server))
            .unwrap()
            .run(RunOptions {
                cleanup: true,
                max_batches: Some(1),
                analytics: false,
            })
            .await
            .unwrap();

        assert_eq!(report.batches_total, 1);
        assert_eq!(report.merged, 25);
        assert_eq!(report.missing_reviews, 15);
        assert_eq!(report.archived, 1);

        let remaining = store.list("bronze/new").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "b.json");
    }

    /// Test that an empty source prefix is a successful no-op
    #[tokio::test]
    async fn test_empty_source() {
        let (dir, _store) = seeded_bucket(&[]).await;
        let server = echo_server().await;

        let report = Pipeline::from_config(config_for(&dir, &server))
            .unwrap()
            .run(RunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.files, 0);
        assert_eq!(report.batches_total, 0);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    // ==================== Failures ====================

    /// Test that a failing completion service loses batches without failing the run
    #[tokio::test]
    async fn test_lost_batches_are_reported() {
        let (dir, store) = seeded_bucket(&[8]).await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let mut config = config_for(&dir, &server);
        config.enrichment.max_retries = 2;

        let report = Pipeline::from_config(config)
            .unwrap()
            .run(RunOptions {
                cleanup: true,
                max_batches: None,
                analytics: false,
            })
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.batches_lost, 1);
        assert_eq!(report.items_lost, 8);
        assert_eq!(report.merged, 0);
        assert_eq!(report.chunks_uploaded, 0);
        assert_eq!(report.archived, 0);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert_eq!(store.list("bronze/new").await.unwrap().len(), 1);
    }

    /// Test that a malformed source file is skipped
    #[tokio::test]
    async fn test_malformed_source_file_skipped() {
        let (dir, store) = seeded_bucket(&[3]).await;
        store
            .upload("bronze/new/broken.json", b"{not json".to_vec(), "application/json", false)
            .await
            .unwrap();
        let server = echo_server().await;

        let report = Pipeline::from_config(config_for(&dir, &server))
            .unwrap()
            .run(RunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.merged, 3);
    }

    /// Test that a listing failure aborts the run
    #[tokio::test]
    async fn test_list_failure_is_fatal() {
        let mut store = MockStore::new();
        store.expect_name().return_const("mock");
        store
            .expect_list()
            .returning(|_| Err(EnrichmentError::storage("connection reset")));
        store.expect_download().never();

        let provider = Arc::new(StubProvider::echo());
        let pipeline = Pipeline::new(
            test_config(std::path::Path::new("/unused"), "http://localhost:1/v1"),
            Arc::new(store),
            provider.clone(),
        );

        let err = pipeline.run(RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, EnrichmentError::Storage(_)));
        assert_eq!(provider.calls(), 0);
    }

    /// Test that a failed upload skips cleanup
    #[tokio::test]
    async fn test_upload_failure_skips_cleanup() {
        let mut store = MockStore::new();
        store.expect_name().return_const("mock");
        store
            .expect_list()
            .returning(|_| Ok(vec![entry("a.json")]));
        store
            .expect_download()
            .returning(|_| Ok(ProductFactory::file(1, 3)));
        store
            .expect_upload()
            .times(1)
            .returning(|_, _, _, _| Err(EnrichmentError::storage("bucket is read-only")));
        store.expect_move_object().never();

        let pipeline = Pipeline::new(
            test_config(std::path::Path::new("/unused"), "http://localhost:1/v1"),
            Arc::new(store),
            Arc::new(StubProvider::echo()),
        );

        let report = pipeline
            .run(RunOptions {
                cleanup: true,
                max_batches: None,
                analytics: false,
            })
            .await
            .unwrap();

        assert_eq!(report.merged, 3);
        assert_eq!(report.chunks_failed, 1);
        assert_eq!(report.archived, 0);
        assert!(!report.is_complete());
    }

    /// Test that a failed KPI upload is reported without failing the run
    #[tokio::test]
    async fn test_kpi_upload_failure_is_reported() {
        let mut store = MockStore::new();
        store.expect_name().return_const("mock");
        store
            .expect_list()
            .returning(|_| Ok(vec![entry("a.json")]));
        store
            .expect_download()
            .returning(|_| Ok(ProductFactory::file(1, 4)));
        store
            .expect_upload()
            .times(4)
            .returning(|path, _, _, upsert| {
                assert!(!upsert);
                if path.starts_with("gold/shop_kpis_") {
                    Err(EnrichmentError::storage("quota exceeded"))
                } else {
                    Ok(())
                }
            });
        store.expect_move_object().times(1).returning(|_, _| Ok(()));

        let pipeline = Pipeline::new(
            test_config(std::path::Path::new("/unused"), "http://localhost:1/v1"),
            Arc::new(store),
            Arc::new(StubProvider::echo()),
        );

        let report = pipeline
            .run(RunOptions {
                cleanup: true,
                max_batches: None,
                analytics: true,
            })
            .await
            .unwrap();

        assert_eq!(report.chunks_uploaded, 1);
        assert_eq!(report.kpi_tables_uploaded, 2);
        assert_eq!(report.kpi_tables_failed, 1);
        assert_eq!(report.archived, 1);
        assert!(!report.is_complete());
    }
}
