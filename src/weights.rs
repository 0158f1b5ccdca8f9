//! # Weight vectors
//!
//! Importance coefficients over the seven categories.
//!
//! - Built from a flat JSON map (`{"Housing": 0.2, ...}`); keys are matched
//!   exactly, then case-insensitively.
//! - Categories absent from the map weigh `0.0`. Unknown keys are ignored.
//! - Nothing is normalised or rejected here: a vector that does not sum to 1.0
//!   still produces a linear combination. [`WeightReport`] describes what is off.
//! - [`HotReloadDefaultWeights`] lets operators override the server default
//!   from `config/weights.json` without a restart.

use serde::{Deserialize, Serialize, Serializer};
use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
    time::SystemTime,
};
use tracing::{info, warn};

use crate::category::Category;

pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 0.01;
pub const DEFAULT_WEIGHTS_PATH: &str = "config/weights.json";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, f64>")]
pub struct WeightVector([f64; Category::COUNT]);

impl Default for WeightVector {
    fn default() -> Self {
        Self::from_pairs(&[
            (Category::Housing, 0.2),
            (Category::Transportation, 0.15),
            (Category::Environment, 0.15),
            (Category::Health, 0.2),
            (Category::Neighborhood, 0.1),
            (Category::Engagement, 0.1),
            (Category::Opportunity, 0.1),
        ])
    }
}

impl WeightVector {
    /// All-zero vector; set entries with [`WeightVector::with`].
    pub fn zero() -> Self {
        Self([0.0; Category::COUNT])
    }

    pub fn from_pairs(pairs: &[(Category, f64)]) -> Self {
        let mut w = Self::zero();
        for (c, v) in pairs {
            w.0[c.index()] = *v;
        }
        w
    }

    pub fn with(mut self, c: Category, v: f64) -> Self {
        self.0[c.index()] = v;
        self
    }

    /// Keys naming the same category are resolved independently of map order:
    /// the exact column name wins, then a padded exact name, then the
    /// lexicographically smallest case-folded key.
    pub fn from_map(map: &HashMap<String, f64>) -> Self {
        let mut chosen: [Option<(u8, &str, f64)>; Category::COUNT] = [None; Category::COUNT];
        for (k, v) in map {
            let Some(c) = Category::from_name(k) else {
                continue;
            };
            let rank = if k == c.name() {
                0
            } else if k.trim() == c.name() {
                1
            } else {
                2
            };
            let slot = &mut chosen[c.index()];
            let better = match slot {
                None => true,
                Some((r, key, _)) => (rank, k.as_str()) < (*r, *key),
            };
            if better {
                *slot = Some((rank, k.as_str(), *v));
            }
        }

        let mut w = Self::zero();
        for c in Category::ALL {
            if let Some((_, _, v)) = chosen[c.index()] {
                w.0[c.index()] = v;
            }
        }
        w
    }

    /// Categories named by more than one key of `map`.
    pub fn colliding_keys(map: &HashMap<String, f64>) -> Vec<Category> {
        let mut seen = [0usize; Category::COUNT];
        for k in map.keys() {
            if let Some(c) = Category::from_name(k) {
                seen[c.index()] += 1;
            }
        }
        Category::ALL
            .iter()
            .copied()
            .filter(|c| seen[c.index()] > 1)
            .collect()
    }

    pub fn get(&self, c: Category) -> f64 {
        self.0[c.index()]
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Report on a vector that is already resolved (no unknown/missing keys to speak of).
    pub fn validate(&self, tolerance: f64) -> WeightReport {
        WeightReport::build(self, Vec::new(), Vec::new(), Vec::new(), tolerance)
    }
}

impl From<HashMap<String, f64>> for WeightVector {
    fn from(map: HashMap<String, f64>) -> Self {
        Self::from_map(&map)
    }
}

impl Serialize for WeightVector {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let m: BTreeMap<&'static str, f64> =
            Category::ALL.iter().map(|c| (c.name(), self.get(*c))).collect();
        m.serialize(s)
    }
}

/// What a caller-supplied weight map gets wrong, if anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightReport {
    pub weights: WeightVector,
    pub sum: f64,
    pub tolerance: f64,
    pub sums_to_one: bool,
    pub negative: Vec<Category>,
    pub above_one: Vec<Category>,
    pub missing: Vec<Category>,
    pub unknown_keys: Vec<String>,
    /// Categories named by several keys (e.g. `housing` and `HOUSING`).
    pub colliding: Vec<Category>,
    pub valid: bool,
}

impl WeightReport {
    pub fn for_map(map: &HashMap<String, f64>, tolerance: f64) -> Self {
        let weights = WeightVector::from_map(map);
        let missing = Category::ALL
            .iter()
            .copied()
            .filter(|c| !map.keys().any(|k| Category::from_name(k) == Some(*c)))
            .collect();
        let mut unknown_keys: Vec<String> = map
            .keys()
            .filter(|k| Category::from_name(k).is_none())
            .cloned()
            .collect();
        unknown_keys.sort();
        let colliding = WeightVector::colliding_keys(map);
        Self::build(&weights, missing, unknown_keys, colliding, tolerance)
    }

    fn build(
        weights: &WeightVector,
        missing: Vec<Category>,
        unknown_keys: Vec<String>,
        colliding: Vec<Category>,
        tolerance: f64,
    ) -> Self {
        let tolerance = if tolerance.is_finite() && tolerance >= 0.0 {
            tolerance
        } else {
            DEFAULT_WEIGHT_TOLERANCE
        };
        let sum = weights.sum();
        let sums_to_one = (sum - 1.0).abs() <= tolerance + f64::EPSILON;
        let negative: Vec<Category> = Category::ALL
            .iter()
            .copied()
            .filter(|c| weights.get(*c) < 0.0)
            .collect();
        let above_one: Vec<Category> = Category::ALL
            .iter()
            .copied()
            .filter(|c| weights.get(*c) > 1.0)
            .collect();
        let valid = sums_to_one
            && negative.is_empty()
            && above_one.is_empty()
            && missing.is_empty()
            && unknown_keys.is_empty()
            && colliding.is_empty();
        Self {
            weights: *weights,
            sum,
            tolerance,
            sums_to_one,
            negative,
            above_one,
            missing,
            unknown_keys,
            colliding,
            valid,
        }
    }

    /// Short human-readable list of problems, for logs.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.sums_to_one {
            out.push(format!("sum {:.4} is not within {} of 1.0", self.sum, self.tolerance));
        }
        if !self.negative.is_empty() {
            out.push(format!("negative: {:?}", self.negative));
        }
        if !self.above_one.is_empty() {
            out.push(format!("above 1.0: {:?}", self.above_one));
        }
        if !self.missing.is_empty() {
            out.push(format!("missing (treated as 0): {:?}", self.missing));
        }
        if !self.unknown_keys.is_empty() {
            out.push(format!("unknown keys: {:?}", self.unknown_keys));
        }
        if !self.colliding.is_empty() {
            out.push(format!("several keys for: {:?}", self.colliding));
        }
        out
    }
}

/// Server default weights with hot-reload from a JSON weight map.
///
/// On each `current()` call the file's mtime is checked; a changed file is
/// reloaded. A missing or unparsable file leaves the built-in default in place.
#[derive(Debug)]
pub struct HotReloadDefaultWeights {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    weights: WeightVector,
    last_modified: Option<SystemTime>,
}

impl HotReloadDefaultWeights {
    /// Create with a path (defaults to "config/weights.json" if `None`).
    pub fn new(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WEIGHTS_PATH));
        Self {
            path,
            inner: RwLock::new(State {
                weights: WeightVector::default(),
                last_modified: None,
            }),
        }
    }

    /// Latest default weights, reloading if the file changed.
    pub fn current(&self) -> WeightVector {
        let mtime = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        {
            let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
            if guard.last_modified == mtime {
                return guard.weights;
            }
        }

        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match mtime {
            None => {
                // file removed since last load
                info!(path = %self.path.display(), "default weights file gone, using built-in");
                guard.weights = WeightVector::default();
                guard.last_modified = None;
            }
            Some(m) if guard.last_modified != Some(m) => match load_weights_file(&self.path) {
                Ok(w) => {
                    info!(path = %self.path.display(), sum = w.sum(), "default weights reloaded");
                    let report = w.validate(DEFAULT_WEIGHT_TOLERANCE);
                    if !report.valid {
                        warn!(path = %self.path.display(), problems = ?report.problems(), "default weights file is not a proper weighting");
                    }
                    guard.weights = w;
                    guard.last_modified = Some(m);
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "default weights file unreadable, keeping previous");
                    guard.last_modified = Some(m);
                }
            },
            Some(_) => {}
        }
        guard.weights
    }
}

/// Load a weight map file directly (no caching).
pub fn load_weights_file(path: &Path) -> io::Result<WeightVector> {
    let bytes = fs::read(path)?;
    let map: HashMap<String, f64> = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(WeightVector::from_map(&map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Write, thread, time::Duration};

    fn map(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn default_sums_to_one() {
        let w = WeightVector::default();
        assert!((w.sum() - 1.0).abs() < 1e-12);
        assert!((w.get(Category::Health) - 0.2).abs() < 1e-12);
        assert!(w.validate(DEFAULT_WEIGHT_TOLERANCE).valid);
    }

    #[test]
    fn missing_keys_weigh_zero() {
        let w = WeightVector::from_map(&map(&[("Housing", 0.5), ("Health", 0.5)]));
        assert_eq!(w.get(Category::Housing), 0.5);
        assert_eq!(w.get(Category::Opportunity), 0.0);
    }

    #[test]
    fn exact_key_wins_over_case_folded() {
        let w = WeightVector::from_map(&map(&[("housing", 0.9), ("Housing", 0.1)]));
        assert_eq!(w.get(Category::Housing), 0.1);
    }

    #[test]
    fn case_folded_collisions_resolve_the_same_every_time() {
        for _ in 0..200 {
            // fresh maps get fresh hash seeds, so iteration order varies
            let m = map(&[("housing", 0.9), ("HOUSING", 0.3)]);
            assert_eq!(WeightVector::from_map(&m).get(Category::Housing), 0.3);
        }
        for _ in 0..50 {
            let m = map(&[(" Housing ", 0.4), ("housing", 0.9), ("HOUSING", 0.3)]);
            assert_eq!(WeightVector::from_map(&m).get(Category::Housing), 0.4);
        }
    }

    #[test]
    fn report_lists_colliding_categories() {
        let r = WeightReport::for_map(
            &map(&[("housing", 0.5), ("HOUSING", 0.5), ("Health", 0.5)]),
            DEFAULT_WEIGHT_TOLERANCE,
        );
        assert_eq!(r.colliding, vec![Category::Housing]);
        assert!(!r.valid);
        assert!(r.problems().iter().any(|p| p.contains("several keys")));
    }

    #[test]
    fn report_flags_everything() {
        let r = WeightReport::for_map(
            &map(&[("Housing", -0.2), ("Health", 1.5), ("Education", 0.3)]),
            DEFAULT_WEIGHT_TOLERANCE,
        );
        assert!(!r.valid);
        assert!(!r.sums_to_one);
        assert_eq!(r.negative, vec![Category::Housing]);
        assert_eq!(r.above_one, vec![Category::Health]);
        assert_eq!(r.unknown_keys, vec!["Education".to_string()]);
        assert_eq!(r.missing.len(), 5);
        assert!(!r.problems().is_empty());
    }

    #[test]
    fn report_accepts_sum_within_tolerance() {
        let r = WeightReport::for_map(
            &map(&[
                ("Housing", 0.2),
                ("Transportation", 0.15),
                ("Environment", 0.15),
                ("Health", 0.2),
                ("Neighborhood", 0.1),
                ("Engagement", 0.1),
                ("Opportunity", 0.105),
            ]),
            DEFAULT_WEIGHT_TOLERANCE,
        );
        assert!(r.sums_to_one);
        assert!(r.valid, "{:?}", r.problems());
    }

    #[test]
    fn deserializes_from_flat_map() {
        let w: WeightVector = serde_json::from_str(r#"{"Housing":1.0}"#).unwrap();
        assert_eq!(w, WeightVector::zero().with(Category::Housing, 1.0));
    }

    #[test]
    fn hot_reload_falls_back_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");

        let hot = HotReloadDefaultWeights::new(Some(&path));
        assert_eq!(hot.current(), WeightVector::default());

        {
            let mut f = fs::File::create(&path).unwrap();
            write!(f, r#"{{"Housing":1.0}}"#).unwrap();
            f.sync_all().unwrap();
        }
        assert_eq!(hot.current().get(Category::Housing), 1.0);

        // Ensure different mtime (coarse filesystem granularity).
        thread::sleep(Duration::from_millis(1100));
        {
            let mut f = fs::File::create(&path).unwrap();
            write!(f, r#"{{"Health":1.0}}"#).unwrap();
            f.sync_all().unwrap();
        }
        let w = hot.current();
        assert_eq!(w.get(Category::Health), 1.0);
        assert_eq!(w.get(Category::Housing), 0.0);

        fs::remove_file(&path).unwrap();
        assert_eq!(hot.current(), WeightVector::default());
    }
}
