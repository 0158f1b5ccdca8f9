use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::aggregate::{
    compute_scores, AggregateOptions, AggregatedScore, DuplicatePolicy, MissingValuePolicy,
};
use crate::config::{AppConfig, ScoringConfig};
use crate::error::ApiError;
use crate::metrics::{self, Metrics};
use crate::ranking::{latest_period, top_city};
use crate::record::{MetricRecord, PeriodLabel};
use crate::store::MetricStore;
use crate::tier::{Tier, TierThresholds};
use crate::weights::{HotReloadDefaultWeights, WeightReport, WeightVector};

const SCORES_FAILED: &str = "Failed to fetch city scores";
const DATA_FAILED: &str = "City data not loaded";

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn MetricStore>,
    default_weights: Arc<HotReloadDefaultWeights>,
    scoring: Arc<ScoringConfig>,
    tiers: TierThresholds,
}

impl AppState {
    pub fn new(store: Arc<dyn MetricStore>, cfg: &AppConfig) -> Self {
        Self {
            store,
            default_weights: Arc::new(HotReloadDefaultWeights::new(Some(
                &cfg.scoring.default_weights_path,
            ))),
            scoring: Arc::new(cfg.scoring.clone()),
            tiers: cfg.tiers,
        }
    }

    /// Server default weights. The file check runs on the blocking pool.
    async fn current_default_weights(&self) -> WeightVector {
        let hot = Arc::clone(&self.default_weights);
        match tokio::task::spawn_blocking(move || hot.current()).await {
            Ok(w) => w,
            Err(e) => {
                warn!(error = %e, "default weights lookup failed, using built-in");
                WeightVector::default()
            }
        }
    }
}

/// Build the HTTP surface. `/metrics` is mounted only when a recorder is given.
pub fn router(state: AppState, cors_origins: &[String], metrics: Option<&Metrics>) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/city-scores", get(city_scores_default).post(city_scores))
        .route("/api/city-data", get(city_data))
        .route("/api/top-city", get(top_city_handler))
        .route("/api/weights/default", get(default_weights))
        .route("/api/weights/validate", post(validate_weights))
        .route("/api/tiers", get(tiers))
        .with_state(state);

    if let Some(m) = metrics {
        app = app.merge(m.router());
    }
    app.layer(cors_layer(cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::very_permissive();
    }
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Body of `POST /api/city-scores`. Everything is optional.
#[derive(Debug, Default, Deserialize)]
struct ScoreRequest {
    #[serde(default)]
    weights: Option<HashMap<String, f64>>,
    #[serde(default)]
    duplicates: Option<DuplicatePolicy>,
    #[serde(default)]
    missing_values: Option<MissingValuePolicy>,
}

fn parse_body<T: for<'de> Deserialize<'de> + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

async fn score_with(
    state: &AppState,
    weights: &WeightVector,
    opts: AggregateOptions,
) -> Result<Vec<AggregatedScore>, ApiError> {
    let records = state
        .store
        .fetch_all()
        .await
        .map_err(|e| ApiError::store(SCORES_FAILED, e))?;

    let started = Instant::now();
    let scores = compute_scores(&records, weights, opts)?;
    metrics::record_aggregation(records.len(), started.elapsed().as_secs_f64() * 1000.0);
    Ok(scores)
}

async fn city_scores_default(
    State(state): State<AppState>,
) -> Result<Json<Vec<AggregatedScore>>, ApiError> {
    metrics::record_request("get");
    let weights = state.current_default_weights().await;
    let scores = score_with(&state, &weights, state.scoring.options()).await?;
    info!(keys = scores.len(), "city scores (default weights)");
    Ok(Json(scores))
}

async fn city_scores(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<AggregatedScore>>, ApiError> {
    metrics::record_request("post");
    let req: ScoreRequest = parse_body(&body)?;

    // An absent or empty map means "use the default vector".
    let weights = match req.weights.as_ref().filter(|m| !m.is_empty()) {
        Some(map) => {
            let report = WeightReport::for_map(map, state.scoring.weight_tolerance);
            if !report.valid {
                warn!(problems = ?report.problems(), "scoring with a questionable weight vector");
            }
            report.weights
        }
        None => state.current_default_weights().await,
    };

    let mut opts = state.scoring.options();
    if let Some(d) = req.duplicates {
        opts.duplicates = d;
    }
    if let Some(m) = req.missing_values {
        opts.missing_values = m;
    }

    let scores = score_with(&state, &weights, opts).await?;
    info!(keys = scores.len(), policy = ?opts.duplicates, "city scores (caller weights)");
    Ok(Json(scores))
}

async fn city_data(State(state): State<AppState>) -> Result<Json<Vec<MetricRecord>>, ApiError> {
    let records = state
        .store
        .fetch_all()
        .await
        .map_err(|e| ApiError::store(DATA_FAILED, e))?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
struct TopCityQuery {
    period: Option<String>,
}

#[derive(Debug, Serialize)]
struct TopCityResp {
    top_city: String,
    period: PeriodLabel,
    score: f64,
    tier: Tier,
}

async fn top_city_handler(
    State(state): State<AppState>,
    q: Result<Query<TopCityQuery>, QueryRejection>,
) -> Result<Json<TopCityResp>, ApiError> {
    let Query(q) = q.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let weights = state.current_default_weights().await;
    let scores = score_with(&state, &weights, state.scoring.options()).await?;

    let (period, best) = match q.period.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => {
            // "2022" may be stored as a year or as text (JSON string)
            let parsed = PeriodLabel::parse(p);
            let text = PeriodLabel::Label(p.to_string());
            match top_city(&scores, &parsed) {
                Some(b) => (parsed, b),
                None => match top_city(&scores, &text) {
                    Some(b) => (text, b),
                    None => {
                        return Err(ApiError::NotFound(format!(
                            "no city scores for period {parsed}"
                        )))
                    }
                },
            }
        }
        None => {
            let latest = latest_period(&scores)
                .cloned()
                .ok_or_else(|| ApiError::NotFound("no city scores available".into()))?;
            let best = top_city(&scores, &latest)
                .ok_or_else(|| ApiError::NotFound(format!("no city scores for period {latest}")))?;
            (latest, best)
        }
    };

    Ok(Json(TopCityResp {
        top_city: best.city.clone(),
        period,
        score: best.score,
        tier: state.tiers.tier(best.score),
    }))
}

async fn default_weights(State(state): State<AppState>) -> Json<WeightVector> {
    Json(state.current_default_weights().await)
}

async fn validate_weights(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WeightReport>, ApiError> {
    let map: HashMap<String, f64> = parse_body(&body)?;
    Ok(Json(WeightReport::for_map(&map, state.scoring.weight_tolerance)))
}

#[derive(Debug, Deserialize)]
struct TierQuery {
    score: Option<f64>,
}

#[derive(Debug, Serialize)]
struct TierResp {
    high: f64,
    medium: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier: Option<Tier>,
}

async fn tiers(
    State(state): State<AppState>,
    q: Result<Query<TierQuery>, QueryRejection>,
) -> Result<Json<TierResp>, ApiError> {
    let Query(q) = q.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(TierResp {
        high: state.tiers.high,
        medium: state.tiers.medium,
        tier: q.score.map(|s| state.tiers.tier(s)),
    }))
}
