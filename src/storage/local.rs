//! Local file system storage implementation

use super::{ObjectEntry, ObjectStore, PLACEHOLDER_OBJECT, validate_object_path};
use crate::utils::error::{EnrichmentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// Bucket stored as `<root>/<bucket>/` on disk
///
/// ```
/// use enrichment_rs::storage::{LocalStorage, ObjectStore};
/// # tokio_test::block_on(async {
/// let dir = tempfile::tempdir().unwrap();
/// let store = LocalStorage::new(dir.path(), "datalake");
///
/// store
///     .upload("bronze/new/a.json", b"[]".to_vec(), "application/json", false)
///     .await
///     .unwrap();
/// assert_eq!(store.list("bronze/new").await.unwrap()[0].path, "bronze/new/a.json");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct LocalStorage {
    bucket_path: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Self {
        Self {
            bucket_path: root.as_ref().join(bucket),
        }
    }

    pub fn bucket_path(&self) -> &Path {
        &self.bucket_path
    }

    fn object_path(&self, path: &str) -> Result<PathBuf> {
        validate_object_path(path)?;
        Ok(self.bucket_path.join(path.trim_start_matches('/')))
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                EnrichmentError::storage(format!("Failed to create directory: {}", e))
            })?;
        }
        Ok(())
    }
}

fn not_found_or(e: std::io::Error, path: &str, action: &str) -> EnrichmentError {
    if e.kind() == ErrorKind::NotFound {
        EnrichmentError::NotFound(format!("Object not found: {}", path))
    } else {
        EnrichmentError::storage(format!("Failed to {} {}: {}", action, path, e))
    }
}

#[async_trait]
impl ObjectStore for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let dir = if prefix.trim_matches('/').is_empty() {
            self.bucket_path.clone()
        } else {
            self.object_path(prefix.trim_matches('/'))?
        };

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(EnrichmentError::storage(format!(
                    "Failed to read directory {}: {}",
                    dir.display(),
                    e
                )));
            }
        };

        let mut files: Vec<(SystemTime, String)> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| EnrichmentError::storage(format!("Failed to read directory entry: {}", e)))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| EnrichmentError::storage(format!("Failed to stat entry: {}", e)))?;
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name == PLACEHOLDER_OBJECT {
                continue;
            }

            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((created, name));
        }

        files.sort();
        debug!(prefix, count = files.len(), "Listed local objects");

        Ok(files
            .into_iter()
            .map(|(created, name)| {
                let created_at = DateTime::<Utc>::from(created).to_rfc3339();
                ObjectEntry::new(prefix, name, Some(created_at))
            })
            .collect())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let file_path = self.object_path(path)?;
        fs::read(&file_path)
            .await
            .map_err(|e| not_found_or(e, path, "read"))
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str, upsert: bool) -> Result<()> {
        let file_path = self.object_path(path)?;

        if !upsert && fs::try_exists(&file_path).await.unwrap_or(false) {
            return Err(EnrichmentError::storage(format!(
                "Object already exists: {}",
                path
            )));
        }

        Self::ensure_parent(&file_path).await?;
        fs::write(&file_path, bytes)
            .await
            .map_err(|e| EnrichmentError::storage(format!("Failed to write {}: {}", path, e)))?;

        debug!(path, "Object stored");
        Ok(())
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<()> {
        let source = self.object_path(from)?;
        let destination = self.object_path(to)?;

        if !fs::try_exists(&source).await.unwrap_or(false) {
            return Err(EnrichmentError::NotFound(format!("Object not found: {}", from)));
        }

        Self::ensure_parent(&destination).await?;
        fs::rename(&source, &destination)
            .await
            .map_err(|e| not_found_or(e, from, "move"))?;

        debug!(from, to, "Object moved");
        Ok(())
    }
}
