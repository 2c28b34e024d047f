//! Configuration validation
//!
//! Every configuration section implements [`Validate`]. Validation runs once
//! at startup, before any storage or completion traffic.

use super::models::*;
use tracing::debug;
use url::Url;

/// Validation trait for configuration structures
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn validate_http_url(value: &str, context: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must be set", context));
    }

    let url = Url::parse(value).map_err(|e| format!("{} has invalid URL format: {}", context, e))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(format!(
                "{} must use http:// or https:// scheme, got: {}",
                context, scheme
            ));
        }
    }

    if url.host_str().is_none() {
        return Err(format!("{} URL must have a valid host", context));
    }

    Ok(())
}

impl Validate for PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating pipeline configuration");

        self.completion.validate()?;
        self.storage.validate()?;
        self.enrichment.validate()?;

        debug!("Pipeline configuration validation completed");
        Ok(())
    }
}

impl Validate for CompletionConfig {
    fn validate(&self) -> Result<(), String> {
        validate_http_url(&self.base_url, "Completion base URL")?;

        if self.model.trim().is_empty() {
            return Err("Completion model cannot be empty".to_string());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Completion temperature must be between 0 and 2, got {}",
                self.temperature
            ));
        }

        Ok(())
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<(), String> {
        match self.backend {
            StorageBackend::Supabase => {
                validate_http_url(&self.url, "Storage URL")?;
                if self.api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
                    return Err("Storage API key must be set".to_string());
                }
            }
            StorageBackend::Local => {
                if self.local_root.as_deref().is_none_or(|root| root.trim().is_empty()) {
                    return Err("Local storage root must be set for the local backend".to_string());
                }
            }
        }

        if self.bucket.trim().is_empty() {
            return Err("Storage bucket cannot be empty".to_string());
        }

        if self.source_prefix.trim_matches('/') == self.processed_prefix.trim_matches('/') {
            return Err("Source and processed prefixes must differ".to_string());
        }

        let source = self.source_prefix.trim_matches('/');
        if [&self.output_prefix, &self.analytics_prefix]
            .iter()
            .any(|prefix| prefix.trim_matches('/') == source)
        {
            return Err("Output and analytics prefixes must differ from the source prefix".to_string());
        }

        if self.download_wave == 0 || self.upload_wave == 0 {
            return Err("Download and upload wave sizes must be greater than 0".to_string());
        }

        if self.output_chunk_size == 0 {
            return Err("Output chunk size must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Validate for EnrichmentConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be greater than 0".to_string());
        }

        if self.concurrency == 0 {
            return Err("Concurrency must be greater than 0".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if self.max_retries == 0 {
            return Err("Max retries must allow at least one attempt".to_string());
        }

        if self.backoff == BackoffKind::Exponential && self.max_backoff_ms < self.retry_backoff_ms {
            return Err("Max backoff must not be smaller than the base retry backoff".to_string());
        }

        Ok(())
    }
}
