//! # dpp-api: HTTP Surface for the Product Passport Registry
//!
//! ## API Surface
//!
//! | Prefix                   | Module                   | Domain               |
//! |--------------------------|--------------------------|----------------------|
//! | `/dpp`, `/dpp/{id}`      | [`routes::passports`]    | Passport records     |
//! | `/dpp/anchor/*`, `/dpp/verify/*` | [`routes::ledger`] | Anchoring, verification |
//! | `/dpp/import*`           | [`routes::imports`]      | Bulk import jobs     |
//! | `/dpp/dashboard/*`       | [`routes::dashboard`]    | Dashboard metrics    |
//! | `/openapi.json`          | [`openapi`]              | OpenAPI document     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! Trace → Metrics → Envelope → Timeout → RateLimit → Auth → BodyLimit → Handler
//! ```
//!
//! Health probes (`/health/*`) and the Prometheus scrape (`/metrics`) sit
//! outside timeout, rate limiting, and auth. Unknown paths fall through to a
//! JSON 404.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::collections::BTreeMap;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode, Uri};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Body limit for every route except import submission.
pub const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = state.config.auth.clone();
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::per_minute(
        state.config.rate_limit_per_minute,
    ));
    let timeout = state.config.request_timeout;

    let api = Router::new()
        .merge(routes::passports::router())
        .merge(routes::ledger::router())
        .merge(routes::imports::router())
        .merge(routes::dashboard::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(TimeoutLayer::new(timeout))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    let scrape = Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new()
        .merge(health)
        .merge(scrape)
        .merge(api)
        .fallback(not_found)
        .layer(from_fn(middleware::envelope::error_envelope_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .layer(Extension(metrics))
        .layer(Extension(limiter))
}

/// GET /metrics: Prometheus scrape endpoint.
///
/// Registry gauges are recomputed from the repository on every scrape.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Response {
    let passports = state.repo.list();

    let mut by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_label: BTreeMap<&'static str, usize> = BTreeMap::new();
    for p in &passports {
        *by_status.entry(p.metadata.status.as_str()).or_default() += 1;
        *by_label.entry(p.overall_compliance().as_str()).or_default() += 1;
    }

    metrics.passports_total().reset();
    for (status, count) in &by_status {
        metrics
            .passports_total()
            .with_label_values(&[*status])
            .set(*count as f64);
    }
    metrics.passports_by_compliance().reset();
    for (label, count) in &by_label {
        metrics
            .passports_by_compliance()
            .with_label_values(&[*label])
            .set(*count as f64);
    }
    metrics
        .import_jobs_total()
        .set(i64::try_from(state.imports.len()).unwrap_or(i64::MAX));

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => AppError::Internal(e).into_response(),
    }
}

/// Fallback for paths no route matches.
async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
async fn readiness() -> &'static str {
    "ready"
}
