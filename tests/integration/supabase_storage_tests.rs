//! Supabase storage client integration tests
//!
//! The REST client is exercised against a wiremock server standing in for
//! `/storage/v1`.

#[cfg(test)]
mod tests {
    use enrichment_rs::storage::{ObjectStore, SupabaseStorage};
    use enrichment_rs::EnrichmentError;
    use reqwest::Client;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> SupabaseStorage {
        SupabaseStorage::with_client(
            Client::new(),
            format!("{}/storage/v1", server.uri()),
            "datalake",
            "service-key",
        )
    }

    fn listed(name: &str, id: Option<&str>) -> Value {
        json!({
            "name": name,
            "id": id,
            "created_at": "2025-03-14T09:00:00Z",
            "metadata": {}
        })
    }

    // ==================== Listing ====================

    /// Test the list body and the filtering of folders and placeholders
    #[tokio::test]
    async fn test_list_filters_folders_and_placeholders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/datalake"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .and(body_partial_json(json!({
                "prefix": "bronze/new",
                "offset": 0,
                "sortBy": {"column": "created_at", "order": "asc"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                listed(".emptyFolderPlaceholder", Some("p")),
                listed("archive", None),
                listed("a.json", Some("1")),
                listed("b.json", Some("2")),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let entries = store(&server).list("bronze/new/").await.unwrap();

        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["bronze/new/a.json", "bronze/new/b.json"]);
        assert_eq!(entries[0].created_at.as_deref(), Some("2025-03-14T09:00:00Z"));
    }

    /// Test that a full page triggers a request for the next one
    #[tokio::test]
    async fn test_list_pages_through_results() {
        let server = MockServer::start().await;
        let first: Vec<Value> = (0..100)
            .map(|n| listed(&format!("f{:03}.json", n), Some("id")))
            .collect();

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/datalake"))
            .and(body_partial_json(json!({"offset": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(first)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/datalake"))
            .and(body_partial_json(json!({"offset": 100})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([listed("last.json", Some("id"))])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let entries = store(&server).list("bronze/new").await.unwrap();
        assert_eq!(entries.len(), 101);
        assert_eq!(entries[100].name, "last.json");
    }

    /// Test that a listing failure surfaces as a storage error
    #[tokio::test]
    async fn test_list_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"message": "database unavailable"})),
            )
            .mount(&server)
            .await;

        let err = store(&server).list("bronze/new").await.unwrap_err();
        assert!(matches!(err, EnrichmentError::Storage(_)));
        assert!(err.to_string().contains("database unavailable"));
    }

    // ==================== Objects ====================

    /// Test downloading an object and a missing one
    #[tokio::test]
    async fn test_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/datalake/bronze/new/a.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/datalake/bronze/new/gone.json"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": "not_found", "message": "Object not found"})),
            )
            .mount(&server)
            .await;

        let store = store(&server);
        assert_eq!(store.download("bronze/new/a.json").await.unwrap(), b"[]");

        let err = store.download("bronze/new/gone.json").await.unwrap_err();
        assert!(matches!(err, EnrichmentError::NotFound(_)));
    }

    /// Test that uploads send the content type and the upsert flag
    #[tokio::test]
    async fn test_upload_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/datalake/silver/out_1.json"))
            .and(header("content-type", "application/json"))
            .and(header("x-upsert", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "datalake/silver/out_1.json"})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .upload("silver/out_1.json", b"[]".to_vec(), "application/json", false)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].body, b"[]");
    }

    /// Test that an upload conflict is reported as a storage error
    #[tokio::test]
    async fn test_upload_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"error": "Duplicate", "message": "The resource already exists"})),
            )
            .mount(&server)
            .await;

        let err = store(&server)
            .upload("silver/out_1.json", b"[]".to_vec(), "application/json", false)
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichmentError::Storage(_)));
    }

    /// Test the move request body
    #[tokio::test]
    async fn test_move_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/move"))
            .and(body_json(json!({
                "bucketId": "datalake",
                "sourceKey": "bronze/new/a.json",
                "destinationKey": "bronze/processed/a.json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Successfully moved"})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .move_object("bronze/new/a.json", "bronze/processed/a.json")
            .await
            .unwrap();
    }

    /// Test that paths escaping the bucket never reach the server
    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let server = MockServer::start().await;
        let err = store(&server).download("../other/a.json").await.unwrap_err();

        assert!(matches!(err, EnrichmentError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
