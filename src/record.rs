//! Category metric records as stored per city and period.
//!
//! Wire names follow the source data: `geo_label_citystate`, `date_label`,
//! the seven category columns and the optional strata labels.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::category::{parse_cell, Category, CategoryValues};

pub const CITY_FIELD: &str = "geo_label_citystate";
pub const PERIOD_FIELD: &str = "date_label";
pub const RACE_FIELD: &str = "strata_race_label";
pub const SEX_FIELD: &str = "strata_sex_label";

/// Period identifier. Years stay numeric on the wire, anything else is text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodLabel {
    Year(i64),
    Label(String),
}

impl PeriodLabel {
    pub fn parse(raw: &str) -> Self {
        let t = raw.trim();
        if let Ok(y) = t.parse::<i64>() {
            return PeriodLabel::Year(y);
        }
        // "2022.0" from spreadsheet exports
        if let Ok(f) = t.parse::<f64>() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                return PeriodLabel::Year(f as i64);
            }
        }
        PeriodLabel::Label(t.to_string())
    }

    pub(crate) fn from_json(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(PeriodLabel::Year(i))
                } else {
                    n.as_f64().map(|f| PeriodLabel::parse(&f.to_string()))
                }
            }
            // JSON already carries the type: text stays text
            Value::String(s) if !s.trim().is_empty() => {
                Some(PeriodLabel::Label(s.trim().to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodLabel::Year(y) => write!(f, "{y}"),
            PeriodLabel::Label(s) => f.write_str(s),
        }
    }
}

impl Serialize for PeriodLabel {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            PeriodLabel::Year(y) => s.serialize_i64(*y),
            PeriodLabel::Label(l) => s.serialize_str(l),
        }
    }
}

impl<'de> Deserialize<'de> for PeriodLabel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        PeriodLabel::from_json(&v)
            .ok_or_else(|| serde::de::Error::custom("period must be a number or a non-empty string"))
    }
}

/// Composite identity of an aggregation group: `city + "_" + period`.
pub fn composite_key(city: &str, period: &PeriodLabel) -> String {
    format!("{city}_{period}")
}

/// One stored row: a city, a period and its seven category metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub city: String,
    pub period: PeriodLabel,
    pub values: CategoryValues,
    pub race: Option<String>,
    pub sex: Option<String>,
}

impl MetricRecord {
    pub fn new(city: impl Into<String>, period: PeriodLabel, values: CategoryValues) -> Self {
        Self {
            city: city.into(),
            period,
            values,
            race: None,
            sex: None,
        }
    }

    pub fn key(&self) -> String {
        composite_key(&self.city, &self.period)
    }

    /// Build from a flat JSON object. City and period are required; category
    /// values that are absent or not numbers become `None`.
    pub fn from_json_object(obj: &Map<String, Value>) -> Result<Self, String> {
        let city = obj
            .get(CITY_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("missing or empty '{CITY_FIELD}'"))?;
        let period = obj
            .get(PERIOD_FIELD)
            .and_then(PeriodLabel::from_json)
            .ok_or_else(|| format!("missing or invalid '{PERIOD_FIELD}' for '{city}'"))?;

        let mut values = CategoryValues::default();
        for c in Category::ALL {
            let v = match obj.get(c.name()) {
                Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
                Some(Value::String(s)) => parse_cell(s),
                _ => None,
            };
            values.set(c, v);
        }

        let label = |k: &str| {
            obj.get(k)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Ok(Self {
            city: city.to_string(),
            period,
            values,
            race: label(RACE_FIELD),
            sex: label(SEX_FIELD),
        })
    }
}

impl Serialize for MetricRecord {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut m = s.serialize_map(None)?;
        m.serialize_entry(CITY_FIELD, &self.city)?;
        m.serialize_entry(PERIOD_FIELD, &self.period)?;
        for (c, v) in self.values.iter() {
            m.serialize_entry(c.name(), &v)?;
        }
        if let Some(r) = &self.race {
            m.serialize_entry(RACE_FIELD, r)?;
        }
        if let Some(x) = &self.sex {
            m.serialize_entry(SEX_FIELD, x)?;
        }
        m.end()
    }
}
