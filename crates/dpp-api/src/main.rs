//! # dpp-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the passport registry.
//! Configuration comes from the environment (see [`AppConfig::from_env`]).

use std::net::SocketAddr;
use std::time::Duration;

use dpp_api::state::{AppConfig, AppState, LogFormat};
use tracing_subscriber::EnvFilter;

/// How often expired import jobs are swept.
const IMPORT_EVICTION_INTERVAL: Duration = Duration::from_secs(300);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging needs the format before the rest of the config is validated.
    let config = AppConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );
    let config = config.map_err(|e| {
        tracing::error!("Configuration invalid: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");

    if !config.auth.is_enabled() {
        tracing::warn!(
            "DPP_AUTH_TOKENS not set; authentication is DISABLED and all mutations are allowed"
        );
    }

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = dpp_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let port = config.port;
    let seed = config.seed_demo_data;
    let state = AppState::with_config(config, db_pool);

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    if seed {
        state.seed_demo_data().await.map_err(|e| {
            tracing::error!("Seeding demo data failed: {e}");
            e
        })?;
    }

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(IMPORT_EVICTION_INTERVAL);
        loop {
            ticker.tick().await;
            match sweeper.evict_expired_import_jobs().await {
                Ok(0) => {}
                Ok(evicted) => tracing::info!(evicted, "expired import jobs evicted"),
                Err(e) => tracing::error!(error = %e, "import job eviction failed"),
            }
        }
    });

    let app = dpp_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("DPP registry API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
