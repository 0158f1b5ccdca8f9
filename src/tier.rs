//! Score → color tier bucketing, independent of any rendering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

fn default_high() -> f64 {
    0.64
}
fn default_medium() -> f64 {
    0.31
}

/// Inclusive lower bounds of the `High` and `Medium` tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
        }
    }
}

impl TierThresholds {
    /// Clamp to `[0, 1]` and keep `medium <= high`.
    pub fn sanitized(mut self) -> Self {
        if !self.high.is_finite() {
            self.high = default_high();
        }
        if !self.medium.is_finite() {
            self.medium = default_medium();
        }
        self.high = self.high.clamp(0.0, 1.0);
        self.medium = self.medium.clamp(0.0, 1.0);
        if self.medium > self.high {
            std::mem::swap(&mut self.medium, &mut self.high);
        }
        self
    }

    pub fn tier(&self, score: f64) -> Tier {
        if score >= self.high {
            Tier::High
        } else if score >= self.medium {
            Tier::Medium
        } else {
            // NaN lands here too
            Tier::Low
        }
    }
}

/// Tier with the default cut points (0.64 / 0.31).
pub fn score_to_tier(score: f64) -> Tier {
    TierThresholds::default().tier(score)
}
