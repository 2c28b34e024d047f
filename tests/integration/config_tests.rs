//! Configuration integration tests
//!
//! Tests for the shipped example configuration and the environment overlay.

#[cfg(test)]
mod tests {
    use enrichment_rs::config::{BackoffKind, PipelineConfig, StorageBackend};
    use enrichment_rs::{EnrichmentError, Validate};
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EXAMPLE: &str = include_str!("../../config/enrich.yaml.example");

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ==================== Example File ====================

    /// Test that the example file matches the built-in defaults
    #[test]
    fn test_example_matches_defaults() {
        let config = PipelineConfig::from_yaml(EXAMPLE).unwrap();
        let defaults = PipelineConfig::default();

        assert_eq!(config.enrichment, defaults.enrichment);
        assert_eq!(config.completion.model, defaults.completion.model);
        assert_eq!(config.storage.backend, StorageBackend::Supabase);
        assert_eq!(config.storage.source_prefix, defaults.storage.source_prefix);
        assert_eq!(config.storage.output_chunk_size, defaults.storage.output_chunk_size);
    }

    /// Test that the example only needs the storage key to validate
    #[test]
    fn test_example_needs_storage_key() {
        let mut config = PipelineConfig::from_yaml(EXAMPLE).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EnrichmentError::Config(_)));

        config
            .apply_env_from(env(&[("STORAGE_KEY", "service-key")]))
            .unwrap();
        assert!(Validate::validate(&config).is_ok());
    }

    // ==================== Environment Overlay ====================

    /// Test that environment values win over the file
    #[tokio::test]
    async fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let mut config = PipelineConfig::from_file(file.path()).await.unwrap();
        config
            .apply_env_from(env(&[
                ("COMPLETION_BASE_URL", "http://127.0.0.1:8080/v1"),
                ("COMPLETION_MODEL", "qwen2.5-7b-instruct"),
                ("ENRICH_BATCH_SIZE", "10"),
                ("ENRICH_MAX_RETRIES", "5"),
                ("ENRICH_BACKOFF", "exponential"),
            ]))
            .unwrap();

        assert_eq!(config.completion.base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(config.completion.model, "qwen2.5-7b-instruct");
        assert_eq!(config.enrichment.batch_size, 10);
        assert_eq!(config.enrichment.max_retries, 5);
        assert_eq!(config.enrichment.backoff, BackoffKind::Exponential);
        assert_eq!(config.enrichment.concurrency, 4);
    }

    /// Test that a bad environment value is reported by name
    #[test]
    fn test_invalid_env_value() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_env_from(env(&[("ENRICH_BACKOFF", "linear")]))
            .unwrap_err();
        assert!(err.to_string().contains("ENRICH_BACKOFF"));
    }

    /// Test that zero concurrency fails validation
    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = PipelineConfig::from_yaml(EXAMPLE).unwrap();
        config
            .apply_env_from(env(&[("STORAGE_KEY", "k"), ("ENRICH_CONCURRENCY", "0")]))
            .unwrap();
        assert!(config.validate().is_err());
    }
}
