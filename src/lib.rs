// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod category;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ranking;
pub mod record;
pub mod store;
pub mod tier;
pub mod weights;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{
    compute_scores, AggregateError, AggregateOptions, AggregatedScore, DuplicatePolicy,
    MissingValuePolicy,
};
pub use crate::api::{router, AppState};
pub use crate::category::{Category, CategoryValues};
pub use crate::config::AppConfig;
pub use crate::record::{MetricRecord, PeriodLabel};
pub use crate::store::{MetricStore, StoreError};
pub use crate::tier::{score_to_tier, Tier, TierThresholds};
pub use crate::weights::{WeightReport, WeightVector};

use std::sync::Arc;

/// Assemble the full router around an already opened store.
///
/// ```ignore
/// let store = livability_scores::store::open_store(&cfg.store)?;
/// let app = livability_scores::build_app(store.clone(), &cfg)?;
/// ```
pub fn build_app(store: Arc<dyn MetricStore>, cfg: &AppConfig) -> anyhow::Result<axum::Router> {
    let metrics = if cfg.metrics.enabled {
        Some(crate::metrics::Metrics::init()?)
    } else {
        None
    };
    let state = AppState::new(store, cfg);
    Ok(api::router(state, &cfg.server.cors_origins, metrics.as_ref()))
}
