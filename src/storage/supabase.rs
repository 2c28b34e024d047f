//! Supabase storage REST backend

use super::{ObjectEntry, ObjectStore, PLACEHOLDER_OBJECT, validate_object_path};
use crate::config::StorageConfig;
use crate::utils::error::{EnrichmentError, Result};
use crate::utils::truncate_string;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Objects requested per list call
const LIST_PAGE_SIZE: usize = 100;

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: usize,
    offset: usize,
    #[serde(rename = "sortBy")]
    sort_by: SortBy,
}

#[derive(Debug, Serialize)]
struct SortBy {
    column: &'static str,
    order: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    /// Folders are listed with a null id
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct MoveRequest<'a> {
    #[serde(rename = "bucketId")]
    bucket_id: &'a str,
    #[serde(rename = "sourceKey")]
    source_key: &'a str,
    #[serde(rename = "destinationKey")]
    destination_key: &'a str,
}

/// Client for a Supabase-style `/storage/v1` API
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl SupabaseStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| EnrichmentError::config("storage API key is not set"))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self::with_client(client, &config.url, &config.bucket, api_key))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_key: api_key.into(),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    async fn list_page(&self, prefix: &str, offset: usize) -> Result<Vec<ListedObject>> {
        let url = format!("{}/object/list/{}", self.base_url, self.bucket);
        let body = ListRequest {
            prefix,
            limit: LIST_PAGE_SIZE,
            offset,
            sort_by: SortBy {
                column: "created_at",
                order: "asc",
            },
        };

        let response = self.authorized(self.client.post(&url)).json(&body).send().await?;
        let response = check_status(response, prefix).await?;
        Ok(response.json().await?)
    }
}

/// Map a non-success response to an error, keeping part of the body
async fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| truncate_string(&body, 256));

    if status == StatusCode::NOT_FOUND || message.contains("not_found") || message.contains("Object not found") {
        Err(EnrichmentError::NotFound(format!("{}: {}", path, message)))
    } else {
        Err(EnrichmentError::storage(format!(
            "{} failed with {}: {}",
            path, status, message
        )))
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let prefix = prefix.trim_matches('/');
        let mut entries = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_page(prefix, offset).await?;
            let fetched = page.len();

            entries.extend(
                page.into_iter()
                    .filter(|object| object.id.is_some() && object.name != PLACEHOLDER_OBJECT)
                    .map(|object| ObjectEntry::new(prefix, object.name, object.created_at)),
            );

            if fetched < LIST_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        debug!(prefix, count = entries.len(), "Listed storage objects");
        Ok(entries)
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        validate_object_path(path)?;
        let response = self
            .authorized(self.client.get(self.object_url(path)))
            .send()
            .await?;
        let response = check_status(response, path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str, upsert: bool) -> Result<()> {
        validate_object_path(path)?;
        let size = bytes.len();
        let response = self
            .authorized(self.client.post(self.object_url(path)))
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes)
            .send()
            .await?;
        check_status(response, path).await?;

        debug!(path, bytes = size, "Object uploaded");
        Ok(())
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<()> {
        validate_object_path(from)?;
        validate_object_path(to)?;

        let url = format!("{}/object/move", self.base_url);
        let body = MoveRequest {
            bucket_id: &self.bucket,
            source_key: from,
            destination_key: to,
        };

        let response = self.authorized(self.client.post(&url)).json(&body).send().await?;
        check_status(response, from).await?;

        debug!(from, to, "Object moved");
        Ok(())
    }
}
