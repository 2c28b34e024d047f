//! Object storage for source and output files
//!
//! Raw product files are listed and downloaded from a source prefix, merged
//! output is uploaded to an output prefix, and processed sources are moved
//! aside. Two backends implement [`ObjectStore`]: a Supabase-style storage
//! REST API and a directory on the local filesystem.

pub mod local;
pub mod supabase;

pub use local::LocalStorage;
pub use supabase::SupabaseStorage;

use crate::config::{StorageBackend, StorageConfig};
use crate::utils::error::{EnrichmentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Name of the marker object storage UIs create in empty folders
pub const PLACEHOLDER_OBJECT: &str = ".emptyFolderPlaceholder";

/// One listed object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// File name relative to the listed prefix
    pub name: String,
    /// Full object path inside the bucket
    pub path: String,
    /// Creation timestamp as reported by the backend
    pub created_at: Option<String>,
}

impl ObjectEntry {
    pub fn new(prefix: &str, name: impl Into<String>, created_at: Option<String>) -> Self {
        let name = name.into();
        Self {
            path: join_path(prefix, &name),
            name,
            created_at,
        }
    }
}

/// Object storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Files directly under `prefix`, oldest first, placeholders excluded
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>>;

    /// Full contents of the object at `path`
    async fn download(&self, path: &str) -> Result<Vec<u8>>;

    /// Write `bytes` to `path`, replacing an existing object only when `upsert` is set
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str, upsert: bool) -> Result<()>;

    /// Move an object within the bucket
    async fn move_object(&self, from: &str, to: &str) -> Result<()>;
}

/// Join a prefix and a name with exactly one separator
pub fn join_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Reject object paths that could escape the bucket
pub fn validate_object_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(EnrichmentError::validation("object path cannot be empty"));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(EnrichmentError::validation(format!(
            "object path must not contain '..': {}",
            path
        )));
    }
    Ok(())
}

/// Build the backend selected in `config`
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::Supabase => Arc::new(SupabaseStorage::new(config)?),
        StorageBackend::Local => {
            let root = config
                .local_root
                .as_deref()
                .ok_or_else(|| EnrichmentError::config("local storage root is not set"))?;
            Arc::new(LocalStorage::new(root, &config.bucket))
        }
    };

    info!(backend = store.name(), bucket = %config.bucket, "Object storage ready");
    Ok(store)
}
