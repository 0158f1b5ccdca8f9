//! City livability score service — binary entrypoint.
//! Loads config, opens the metric store, serves the Axum router, and closes
//! the store after graceful shutdown.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use livability_scores::config::{init_tracing, AppConfig};
use livability_scores::{build_app, store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = AppConfig::load().context("loading configuration")?;
    init_tracing(&cfg.logging);

    let store = store::open_store(&cfg.store)
        .with_context(|| format!("opening metric store at {}", cfg.store.path.display()))?;

    let app = build_app(store.clone(), &cfg)?;

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, store = %store.describe(), "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    if let Err(e) = store.close().await {
        warn!(error = %e, "closing metric store failed");
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
