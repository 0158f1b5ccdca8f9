//! Score aggregation: one weighted livability score per (city, period).
//!
//! ```text
//! score = Σ_c value_c * weight_c + offset
//! ```
//!
//! Records are grouped by composite key (`city_period`). Output keeps the
//! order in which keys were first seen. What happens to duplicate keys and to
//! records with missing category values is an explicit policy, see
//! [`DuplicatePolicy`] and [`MissingValuePolicy`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::category::Category;
use crate::record::{MetricRecord, PeriodLabel};
use crate::weights::WeightVector;

/// How several records sharing one composite key are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the first record seen for a key; later ones are dropped.
    #[default]
    #[serde(alias = "first_wins")]
    First,
    /// Mean of the per-record scores of the key.
    Average,
    /// A second record for a key is an error.
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_wins" => Ok(Self::First),
            "average" | "mean" => Ok(Self::Average),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown duplicate policy '{other}'")),
        }
    }
}

/// What a missing or non-numeric category value turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Fail the aggregation with [`AggregateError::MissingCategory`].
    #[default]
    Reject,
    /// Count the category as `0.0`.
    Zero,
}

impl FromStr for MissingValuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "zero" => Ok(Self::Zero),
            other => Err(format!("unknown missing-value policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AggregateOptions {
    pub duplicates: DuplicatePolicy,
    pub missing_values: MissingValuePolicy,
    /// Constant added to every score.
    pub score_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("record '{key}' has no numeric value for {category}")]
    MissingCategory { key: String, category: Category },
    #[error("more than one record for '{key}'")]
    DuplicateKey { key: String },
}

/// Output row, serialized with the field names the map client consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedScore {
    #[serde(rename = "geo_label_citystate")]
    pub city: String,
    #[serde(rename = "date_label")]
    pub period: PeriodLabel,
    #[serde(rename = "Average_General_Score")]
    pub score: f64,
}

/// Weighted sum of one record's categories.
pub fn score_record(
    record: &MetricRecord,
    weights: &WeightVector,
    missing: MissingValuePolicy,
) -> Result<f64, AggregateError> {
    let mut total = 0.0;
    for c in Category::ALL {
        let v = match (record.values.get(c), missing) {
            (Some(v), _) => v,
            (None, MissingValuePolicy::Zero) => 0.0,
            (None, MissingValuePolicy::Reject) => {
                return Err(AggregateError::MissingCategory {
                    key: record.key(),
                    category: c,
                })
            }
        };
        total += v * weights.get(c);
    }
    Ok(total)
}

struct Group<'a> {
    first: &'a MetricRecord,
    sum: f64,
    count: usize,
}

/// One aggregated score per distinct composite key, in first-seen order.
pub fn compute_scores(
    records: &[MetricRecord],
    weights: &WeightVector,
    opts: AggregateOptions,
) -> Result<Vec<AggregatedScore>, AggregateError> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut groups: Vec<Group<'_>> = Vec::new();
    let mut dropped = 0usize;

    for r in records {
        let key = r.key();
        match index.get(&key) {
            Some(&i) => match opts.duplicates {
                DuplicatePolicy::First => dropped += 1,
                DuplicatePolicy::Reject => return Err(AggregateError::DuplicateKey { key }),
                DuplicatePolicy::Average => {
                    let s = score_record(r, weights, opts.missing_values)?;
                    let g = &mut groups[i];
                    g.sum += s;
                    g.count += 1;
                }
            },
            None => {
                let s = score_record(r, weights, opts.missing_values)?;
                index.insert(key, groups.len());
                groups.push(Group {
                    first: r,
                    sum: s,
                    count: 1,
                });
            }
        }
    }

    debug!(
        records = records.len(),
        keys = groups.len(),
        dropped,
        policy = ?opts.duplicates,
        "aggregated city scores"
    );

    Ok(groups
        .into_iter()
        .map(|g| AggregatedScore {
            city: g.first.city.clone(),
            period: g.first.period.clone(),
            score: g.sum / g.count as f64 + opts.score_offset,
        })
        .collect())
}
