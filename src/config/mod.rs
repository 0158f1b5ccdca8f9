//! Service configuration.
//!
//! Loaded from TOML (`config/livability.toml`, or `$LIVABILITY_CONFIG_PATH`),
//! then selected env vars override single fields. Every section has defaults,
//! so running without a config file works.
//!
//! ```toml
//! [server]
//! port = 5000
//! cors_origins = ["http://localhost:5173"]
//!
//! [store]
//! kind = "csv"
//! path = "data/categorized_data_0_1.csv"
//!
//! [scoring]
//! duplicates = "first"
//! missing_values = "reject"
//!
//! [tiers]
//! high = 0.64
//! medium = 0.31
//! ```

pub mod logging;

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::aggregate::{AggregateOptions, DuplicatePolicy, MissingValuePolicy};
use crate::tier::TierThresholds;
use crate::weights::{DEFAULT_WEIGHTS_PATH, DEFAULT_WEIGHT_TOLERANCE};

pub use logging::{init_tracing, LogFormat, LoggingConfig};

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/livability.toml";
pub const DEFAULT_STORE_PATH: &str = "data/categorized_data_0_1.csv";

pub const ENV_CONFIG_PATH: &str = "LIVABILITY_CONFIG_PATH";
pub const ENV_HOST: &str = "LIVABILITY_HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_STORE_PATH: &str = "LIVABILITY_STORE_PATH";
pub const ENV_STORE_KIND: &str = "LIVABILITY_STORE_KIND";
pub const ENV_LOG_FORMAT: &str = "LIVABILITY_LOG_FORMAT";
pub const ENV_METRICS: &str = "LIVABILITY_METRICS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{name}: {msg}")]
    Env { name: &'static str, msg: String },
    #[error("{0} points to a non-existent file")]
    MissingFile(PathBuf),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub scoring: ScoringConfig,
    pub tiers: TierThresholds,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed browser origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            cors_origins: vec![
                "http://localhost:5173".into(),
                "http://localhost:3000".into(),
                "http://localhost:3001".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Csv,
    Json,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unsupported store kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Csv,
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub duplicates: DuplicatePolicy,
    pub missing_values: MissingValuePolicy,
    pub score_offset: f64,
    pub weight_tolerance: f64,
    /// JSON weight map overriding the built-in default vector (hot-reloaded).
    pub default_weights_path: PathBuf,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::default(),
            missing_values: MissingValuePolicy::default(),
            score_offset: 0.0,
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
            default_weights_path: PathBuf::from(DEFAULT_WEIGHTS_PATH),
        }
    }
}

impl ScoringConfig {
    pub fn options(&self) -> AggregateOptions {
        AggregateOptions {
            duplicates: self.duplicates,
            missing_values: self.missing_values,
            score_offset: self.score_offset,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    /// Resolve config the way the binary does:
    /// 1) `$LIVABILITY_CONFIG_PATH` (must exist)
    /// 2) `config/livability.toml` if present
    /// 3) built-in defaults
    ///
    /// followed by env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(ConfigError::MissingFile(pb));
                }
                Self::from_path(&pb)?
            }
            Err(_) => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_path(default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg.sanitized())
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_nonempty(ENV_HOST) {
            self.server.host = v;
        }
        if let Some(v) = env_nonempty(ENV_PORT) {
            self.server.port = v.parse().map_err(|_| ConfigError::Env {
                name: ENV_PORT,
                msg: format!("'{v}' is not a port number"),
            })?;
        }
        if let Some(v) = env_nonempty(ENV_STORE_PATH) {
            self.store.path = PathBuf::from(v);
        }
        if let Some(v) = env_nonempty(ENV_STORE_KIND) {
            self.store.kind = v.parse().map_err(|msg| ConfigError::Env {
                name: ENV_STORE_KIND,
                msg,
            })?;
        }
        if let Some(v) = env_nonempty(ENV_LOG_FORMAT) {
            self.logging.format = v.parse().map_err(|msg| ConfigError::Env {
                name: ENV_LOG_FORMAT,
                msg,
            })?;
        }
        if let Some(v) = env_nonempty(ENV_METRICS) {
            self.metrics.enabled = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "on");
        }
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        self.tiers = self.tiers.sanitized();
        if !self.scoring.weight_tolerance.is_finite() || self.scoring.weight_tolerance < 0.0 {
            self.scoring.weight_tolerance = DEFAULT_WEIGHT_TOLERANCE;
        }
        if !self.scoring.score_offset.is_finite() {
            self.scoring.score_offset = 0.0;
        }
        self
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.store.kind, StoreKind::Csv);
        assert_eq!(cfg.scoring.duplicates, DuplicatePolicy::First);
        assert_eq!(cfg.scoring.missing_values, MissingValuePolicy::Reject);
        assert_eq!(cfg.tiers, TierThresholds::default());
        assert!(cfg.metrics.enabled);
    }

    #[test]
    fn sections_parse() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [server]
            port = 8080
            cors_origins = []

            [store]
            kind = "json"
            path = "data/rows.json"

            [scoring]
            duplicates = "average"
            missing_values = "zero"
            score_offset = 0.1

            [tiers]
            high = 0.7
            medium = 0.4

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.server.cors_origins.is_empty());
        assert_eq!(cfg.store.kind, StoreKind::Json);
        assert_eq!(cfg.scoring.options().duplicates, DuplicatePolicy::Average);
        assert_eq!(cfg.scoring.options().missing_values, MissingValuePolicy::Zero);
        assert!((cfg.scoring.score_offset - 0.1).abs() < 1e-12);
        assert_eq!(cfg.tiers.high, 0.7);
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn inverted_tiers_are_swapped() {
        let cfg = AppConfig::from_toml_str("[tiers]\nhigh = 0.2\nmedium = 0.8\n").unwrap();
        assert_eq!(cfg.tiers.high, 0.8);
        assert_eq!(cfg.tiers.medium, 0.2);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(AppConfig::from_toml_str("[scoring]\nduplicates = \"median\"\n").is_err());
    }
}
