//! Configuration management for the pipeline
//!
//! Configuration comes from an optional YAML file, then a `.env` file, then
//! the process environment, later sources taking precedence. The merged
//! result is validated before anything else runs.

pub mod loader;
pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{EnrichmentError, Result};
use std::path::Path;
use tracing::{debug, info};

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EnrichmentError::config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| EnrichmentError::config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load the optional file, overlay `.env` and the environment, and validate
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::load_unvalidated(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// Same as [`load`](Self::load) without the final validation, for callers
    /// that apply their own overrides first
    pub async fn load_unvalidated(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };

        match dotenvy::dotenv() {
            Ok(env_path) => debug!("Loaded environment from {:?}", env_path),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => return Err(EnrichmentError::config(format!("Failed to read .env: {}", e))),
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(EnrichmentError::Config)
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(EnrichmentError::from)
    }
}
