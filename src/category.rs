//! # Categories
//!
//! The seven fixed quality-of-life dimensions every city/period is scored on,
//! plus a fixed-size value holder indexed by category.
//!
//! Field names match the source data columns (`Housing`, `Transportation`, ...),
//! so the same names are used on the wire for weight maps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the seven livability categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Housing,
    Transportation,
    Environment,
    Health,
    Neighborhood,
    Engagement,
    Opportunity,
}

impl Category {
    /// All categories in their canonical (column) order.
    pub const ALL: [Category; 7] = [
        Category::Housing,
        Category::Transportation,
        Category::Environment,
        Category::Health,
        Category::Neighborhood,
        Category::Engagement,
        Category::Opportunity,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn name(self) -> &'static str {
        match self {
            Category::Housing => "Housing",
            Category::Transportation => "Transportation",
            Category::Environment => "Environment",
            Category::Health => "Health",
            Category::Neighborhood => "Neighborhood",
            Category::Engagement => "Engagement",
            Category::Opportunity => "Opportunity",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Exact column name first, then a case-insensitive match.
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == trimmed)
            .or_else(|| {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|c| c.name().eq_ignore_ascii_case(trimmed))
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-category values of one record. `None` means the source cell was
/// missing or not a number.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryValues([Option<f64>; Category::COUNT]);

impl CategoryValues {
    /// All seven categories present.
    pub fn complete(values: [f64; Category::COUNT]) -> Self {
        Self(values.map(Some))
    }

    pub fn get(&self, c: Category) -> Option<f64> {
        self.0[c.index()]
    }

    pub fn set(&mut self, c: Category, v: Option<f64>) {
        self.0[c.index()] = v;
    }

    /// First category without a usable value, if any.
    pub fn first_missing(&self) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| self.get(*c).is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, Option<f64>)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

/// Parse a numeric cell; blanks and non-finite or non-numeric text count as missing.
pub(crate) fn parse_cell(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}
