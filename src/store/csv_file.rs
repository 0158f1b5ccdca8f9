use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ensure_exists, Lifecycle, MetricStore, StoreError};
use crate::category::{parse_cell, Category, CategoryValues};
use crate::record::{MetricRecord, PeriodLabel, CITY_FIELD, PERIOD_FIELD};

/// Column layout of the categorized export. Unknown columns are ignored;
/// absent category columns read as missing values.
#[derive(Debug, Deserialize)]
struct CsvRow {
    geo_label_citystate: String,
    date_label: String,
    #[serde(rename = "Housing", default)]
    housing: Option<String>,
    #[serde(rename = "Transportation", default)]
    transportation: Option<String>,
    #[serde(rename = "Environment", default)]
    environment: Option<String>,
    #[serde(rename = "Health", default)]
    health: Option<String>,
    #[serde(rename = "Neighborhood", default)]
    neighborhood: Option<String>,
    #[serde(rename = "Engagement", default)]
    engagement: Option<String>,
    #[serde(rename = "Opportunity", default)]
    opportunity: Option<String>,
    #[serde(default)]
    strata_race_label: Option<String>,
    #[serde(default)]
    strata_sex_label: Option<String>,
}

impl CsvRow {
    fn into_record(self, line: usize) -> Result<MetricRecord, StoreError> {
        let city = self.geo_label_citystate.trim();
        if city.is_empty() {
            return Err(StoreError::Malformed(format!("line {line}: empty city")));
        }
        if self.date_label.trim().is_empty() {
            return Err(StoreError::Malformed(format!(
                "line {line}: empty period for '{city}'"
            )));
        }

        let cell = |c: &Option<String>| c.as_deref().and_then(parse_cell);
        let mut values = CategoryValues::default();
        for (c, raw) in [
            (Category::Housing, &self.housing),
            (Category::Transportation, &self.transportation),
            (Category::Environment, &self.environment),
            (Category::Health, &self.health),
            (Category::Neighborhood, &self.neighborhood),
            (Category::Engagement, &self.engagement),
            (Category::Opportunity, &self.opportunity),
        ] {
            values.set(c, cell(raw));
        }

        let label = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(MetricRecord {
            city: city.to_string(),
            period: PeriodLabel::parse(&self.date_label),
            values,
            race: label(self.strata_race_label),
            sex: label(self.strata_sex_label),
        })
    }
}

/// Reads the whole CSV file on every fetch, so edits show up without a restart.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    state: Lifecycle,
}

impl CsvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        ensure_exists(&path)?;
        Ok(Self {
            path,
            state: Lifecycle::default(),
        })
    }
}

/// Parse every row of a categorized CSV file.
pub fn read_csv(path: &Path) -> Result<Vec<MetricRecord>, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = rdr.headers()?;
    for required in [CITY_FIELD, PERIOD_FIELD] {
        if !headers.iter().any(|h| h == required) {
            return Err(StoreError::Malformed(format!(
                "{}: missing '{required}' column",
                path.display()
            )));
        }
    }

    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let row: CsvRow = result?;
        // header is line 1
        rows.push(row.into_record(i + 2)?);
    }
    Ok(rows)
}

#[async_trait]
impl MetricStore for CsvStore {
    async fn fetch_all(&self) -> Result<Vec<MetricRecord>, StoreError> {
        self.state.ensure_open()?;
        let path = self.path.clone();
        let rows = tokio::task::spawn_blocking(move || read_csv(&path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;
        debug!(path = %self.path.display(), rows = rows.len(), "csv store read");
        Ok(rows)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.state.close();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}
