//! Configuration loading from environment variables
//!
//! Every setting can be overridden through the environment. Values are read
//! through a lookup function so the overlay can be exercised without touching
//! the process environment.

use super::models::*;
use crate::utils::error::{EnrichmentError, Result};
use std::str::FromStr;
use tracing::debug;

pub const COMPLETION_BASE_URL: &str = "COMPLETION_BASE_URL";
pub const COMPLETION_API_KEY: &str = "COMPLETION_API_KEY";
pub const COMPLETION_MODEL: &str = "COMPLETION_MODEL";
pub const COMPLETION_TEMPERATURE: &str = "COMPLETION_TEMPERATURE";
pub const STORAGE_URL: &str = "STORAGE_URL";
pub const STORAGE_KEY: &str = "STORAGE_KEY";
pub const STORAGE_BUCKET: &str = "STORAGE_BUCKET";
pub const ENRICH_BATCH_SIZE: &str = "ENRICH_BATCH_SIZE";
pub const ENRICH_CONCURRENCY: &str = "ENRICH_CONCURRENCY";
pub const ENRICH_REQUEST_TIMEOUT_SECS: &str = "ENRICH_REQUEST_TIMEOUT_SECS";
pub const ENRICH_MAX_RETRIES: &str = "ENRICH_MAX_RETRIES";
pub const ENRICH_RETRY_BACKOFF_MS: &str = "ENRICH_RETRY_BACKOFF_MS";
pub const ENRICH_BACKOFF: &str = "ENRICH_BACKOFF";

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EnrichmentError::config(format!("Invalid {}: {}", name, e))),
        _ => Ok(None),
    }
}

fn string_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

impl FromStr for BackoffKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!(
                "unknown backoff '{}', expected fixed or exponential",
                other
            )),
        }
    }
}

impl PipelineConfig {
    /// Overlay settings found through `lookup` onto this configuration
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = string_var(&lookup, COMPLETION_BASE_URL) {
            self.completion.base_url = base_url;
        }
        if let Some(api_key) = string_var(&lookup, COMPLETION_API_KEY) {
            self.completion.api_key = Some(api_key);
        }
        if let Some(model) = string_var(&lookup, COMPLETION_MODEL) {
            self.completion.model = model;
        }
        if let Some(temperature) = parse_var(&lookup, COMPLETION_TEMPERATURE)? {
            self.completion.temperature = temperature;
        }

        if let Some(url) = string_var(&lookup, STORAGE_URL) {
            self.storage.url = url;
        }
        if let Some(key) = string_var(&lookup, STORAGE_KEY) {
            self.storage.api_key = Some(key);
        }
        if let Some(bucket) = string_var(&lookup, STORAGE_BUCKET) {
            self.storage.bucket = bucket;
        }

        if let Some(batch_size) = parse_var(&lookup, ENRICH_BATCH_SIZE)? {
            self.enrichment.batch_size = batch_size;
        }
        if let Some(concurrency) = parse_var(&lookup, ENRICH_CONCURRENCY)? {
            self.enrichment.concurrency = concurrency;
        }
        if let Some(timeout) = parse_var(&lookup, ENRICH_REQUEST_TIMEOUT_SECS)? {
            self.enrichment.request_timeout_secs = timeout;
        }
        if let Some(max_retries) = parse_var(&lookup, ENRICH_MAX_RETRIES)? {
            self.enrichment.max_retries = max_retries;
        }
        if let Some(backoff_ms) = parse_var(&lookup, ENRICH_RETRY_BACKOFF_MS)? {
            self.enrichment.retry_backoff_ms = backoff_ms;
        }
        if let Some(backoff) = parse_var(&lookup, ENRICH_BACKOFF)? {
            self.enrichment.backoff = backoff;
        }

        debug!("Environment overrides applied");
        Ok(())
    }

    /// Overlay the process environment onto this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }
}
