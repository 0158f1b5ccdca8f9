use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ensure_exists, Lifecycle, MetricStore, StoreError};
use crate::record::MetricRecord;

/// JSON array of flat row objects, read on every fetch.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    state: Lifecycle,
}

impl JsonStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        ensure_exists(&path)?;
        Ok(Self {
            path,
            state: Lifecycle::default(),
        })
    }
}

/// Parse a JSON document holding an array of row objects.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<MetricRecord>, StoreError> {
    let doc: Value = serde_json::from_slice(bytes)?;
    let rows = doc
        .as_array()
        .ok_or_else(|| StoreError::Malformed("top-level JSON must be an array".into()))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let obj = row
                .as_object()
                .ok_or_else(|| StoreError::Malformed(format!("row {i}: not an object")))?;
            MetricRecord::from_json_object(obj)
                .map_err(|e| StoreError::Malformed(format!("row {i}: {e}")))
        })
        .collect()
}

#[async_trait]
impl MetricStore for JsonStore {
    async fn fetch_all(&self) -> Result<Vec<MetricRecord>, StoreError> {
        self.state.ensure_open()?;
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        let rows = parse_records(&bytes)?;
        debug!(path = %self.path.display(), rows = rows.len(), "json store read");
        Ok(rows)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.state.close();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
