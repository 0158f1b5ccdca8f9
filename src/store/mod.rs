//! # Metric stores
//!
//! The aggregator never reaches for data itself: a [`MetricStore`] is opened at
//! startup, shared through the router state, and closed on shutdown.
//!
//! Backends:
//! - [`CsvStore`]: the categorized CSV export (`categorized_data_0_1.csv`).
//! - [`JsonStore`]: a JSON array of the same rows.
//! - [`MemoryStore`]: fixed records, for tests and embedding.
//!
//! Every `fetch_all` returns the complete record set; nothing is paged or
//! filtered, and failures are not retried.

mod csv_file;
mod json_file;

pub use csv_file::CsvStore;
pub use json_file::JsonStore;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{StoreConfig, StoreKind};
use crate::record::MetricRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data file not found: {0}")]
    NotFound(PathBuf),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("store is closed")]
    Closed,
    #[error("store task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Every record currently stored, unordered.
    async fn fetch_all(&self) -> Result<Vec<MetricRecord>, StoreError>;

    /// Release the store; later fetches fail with [`StoreError::Closed`].
    async fn close(&self) -> Result<(), StoreError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Open/closed flag shared by the backends.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    closed: AtomicBool,
}

impl Lifecycle {
    pub(crate) fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Records held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<MetricRecord>,
    state: Lifecycle,
}

impl MemoryStore {
    pub fn new(records: Vec<MetricRecord>) -> Self {
        Self {
            records,
            state: Lifecycle::default(),
        }
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<MetricRecord>, StoreError> {
        self.state.ensure_open()?;
        Ok(self.records.clone())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.state.close();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory ({} records)", self.records.len())
    }
}

/// Open the backend named by the config.
pub fn open_store(cfg: &StoreConfig) -> Result<Arc<dyn MetricStore>, StoreError> {
    let store: Arc<dyn MetricStore> = match cfg.kind {
        StoreKind::Csv => Arc::new(CsvStore::open(&cfg.path)?),
        StoreKind::Json => Arc::new(JsonStore::open(&cfg.path)?),
    };
    info!(store = %store.describe(), "metric store opened");
    Ok(store)
}

pub(crate) fn ensure_exists(path: &std::path::Path) -> Result<(), StoreError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StoreError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryValues;
    use crate::record::PeriodLabel;

    #[tokio::test]
    async fn memory_store_returns_records_until_closed() {
        let store = MemoryStore::new(vec![MetricRecord::new(
            "A",
            PeriodLabel::Year(2020),
            CategoryValues::complete([0.5; 7]),
        )]);
        assert_eq!(store.fetch_all().await.unwrap().len(), 1);
        store.close().await.unwrap();
        assert!(matches!(store.fetch_all().await, Err(StoreError::Closed)));
    }

    #[test]
    fn open_store_reports_missing_file() {
        let cfg = StoreConfig {
            kind: StoreKind::Csv,
            path: PathBuf::from("definitely/not/here.csv"),
        };
        assert!(matches!(open_store(&cfg), Err(StoreError::NotFound(_))));
    }
}
