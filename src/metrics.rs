use axum::{routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub const REQUESTS_TOTAL: &str = "city_scores_requests_total";
pub const FAILURES_TOTAL: &str = "city_scores_failures_total";
pub const DURATION_MS: &str = "city_scores_duration_ms";
pub const RECORDS: &str = "city_scores_records";

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process; later calls reuse it.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE.get_or_try_init(|| {
            let handle = PrometheusBuilder::new().install_recorder()?;
            // Register series up front so a fresh scrape lists them.
            counter!(REQUESTS_TOTAL, "method" => "get").absolute(0);
            counter!(REQUESTS_TOTAL, "method" => "post").absolute(0);
            gauge!(RECORDS).set(0.0);
            Ok::<_, anyhow::Error>(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

pub fn record_request(method: &'static str) {
    counter!(REQUESTS_TOTAL, "method" => method).increment(1);
}

pub fn record_failure(kind: &'static str) {
    counter!(FAILURES_TOTAL, "kind" => kind).increment(1);
}

pub fn record_aggregation(records: usize, millis: f64) {
    gauge!(RECORDS).set(records as f64);
    histogram!(DURATION_MS).record(millis);
}
