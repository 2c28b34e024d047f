//! KPI tables over merged records
//!
//! Records are grouped by shop, by user and by date. Each group gets one
//! row of sales figures and its most frequent classification. Tables are
//! uploaded as JSON arrays under the analytics prefix, one object per
//! dimension per run.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::core::types::MergedRecord;
use crate::storage::{ObjectStore, join_path};
use crate::utils::error::Result;

/// Grouping key of a KPI table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KpiDimension {
    Shop,
    User,
    Date,
}

impl KpiDimension {
    pub const ALL: [KpiDimension; 3] = [KpiDimension::Shop, KpiDimension::User, KpiDimension::Date];

    pub fn name(self) -> &'static str {
        match self {
            KpiDimension::Shop => "shop",
            KpiDimension::User => "user",
            KpiDimension::Date => "date",
        }
    }

    fn key(self, record: &MergedRecord) -> &str {
        match self {
            KpiDimension::Shop => &record.shop_id,
            KpiDimension::User => &record.user_id,
            KpiDimension::Date => &record.date,
        }
    }
}

/// Aggregates of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRow {
    /// Shop id, user id or date; empty for records without one
    pub key: String,
    pub records: usize,
    pub average_price: f64,
    pub total_quantity: i64,
    pub average_discount: f64,
    /// Share of records marked available, in `[0, 1]`
    pub availability_rate: f64,
    /// Most frequent classification, ties go to the alphabetically first
    pub top_classification: String,
}

#[derive(Default)]
struct Accumulator<'a> {
    records: usize,
    price: f64,
    quantity: i64,
    discount: f64,
    available: usize,
    classifications: BTreeMap<&'a str, usize>,
}

impl<'a> Accumulator<'a> {
    fn add(&mut self, record: &'a MergedRecord) {
        self.records += 1;
        self.price += f64::from(record.price);
        self.quantity += record.quantity;
        self.discount += f64::from(record.discount_percentage);
        if record.availability {
            self.available += 1;
        }
        *self.classifications.entry(record.classification.as_str()).or_default() += 1;
    }

    fn into_row(self, key: &str) -> KpiRow {
        let count = self.records as f64;
        let top_classification = self
            .classifications
            .iter()
            .max_by(|(a_name, a_count), (b_name, b_count)| a_count.cmp(b_count).then(b_name.cmp(a_name)))
            .map(|(name, _)| name.to_string())
            .unwrap_or_default();

        KpiRow {
            key: key.to_string(),
            records: self.records,
            average_price: self.price / count,
            total_quantity: self.quantity,
            average_discount: self.discount / count,
            availability_rate: self.available as f64 / count,
            top_classification,
        }
    }
}

/// One row per distinct key of `dimension`, ordered by key
pub fn compute_kpis(records: &[MergedRecord], dimension: KpiDimension) -> Vec<KpiRow> {
    let mut groups: BTreeMap<&str, Accumulator<'_>> = BTreeMap::new();
    for record in records {
        groups.entry(dimension.key(record)).or_default().add(record);
    }

    groups
        .into_iter()
        .map(|(key, accumulator)| accumulator.into_row(key))
        .collect()
}

/// Result of uploading KPI tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsReport {
    pub uploaded: Vec<String>,
    pub failed: Vec<String>,
}

/// Computes and uploads the KPI tables of a run
pub struct KpiPublisher {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl KpiPublisher {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            prefix: config.analytics_prefix.clone(),
        }
    }

    /// Object path of the `dimension` table written at `timestamp`
    pub fn table_path(&self, dimension: KpiDimension, timestamp: i64) -> String {
        join_path(&self.prefix, &format!("{}_kpis_{}.json", dimension.name(), timestamp))
    }

    /// Upload one table per dimension
    ///
    /// Tables are never overwritten. A failed upload is logged and reported
    /// without stopping the other tables.
    pub async fn publish(&self, records: &[MergedRecord]) -> Result<AnalyticsReport> {
        let mut report = AnalyticsReport::default();
        if records.is_empty() {
            info!("No merged records, skipping KPI tables");
            return Ok(report);
        }

        let timestamp = chrono::Utc::now().timestamp();
        let mut tables = Vec::with_capacity(KpiDimension::ALL.len());
        for dimension in KpiDimension::ALL {
            let rows = compute_kpis(records, dimension);
            let body = serde_json::to_vec(&rows)?;
            tables.push((self.table_path(dimension, timestamp), body, rows.len()));
        }

        let uploads = tables.into_iter().map(|(path, body, rows)| async move {
            let result = self.store.upload(&path, body, "application/json", false).await;
            (path, rows, result)
        });

        for (path, rows, result) in join_all(uploads).await {
            match result {
                Ok(()) => {
                    debug!(path = %path, rows, "Uploaded KPI table");
                    report.uploaded.push(path);
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to upload KPI table");
                    report.failed.push(path);
                }
            }
        }

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            "KPI tables published"
        );
        Ok(report)
    }
}
