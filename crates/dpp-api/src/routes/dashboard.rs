//! # Dashboard Routes

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use dpp_registry::{DashboardMetrics, PassportFilter, RawPassportQuery};

use crate::error::AppError;
use crate::extractors::extract_query;
use crate::state::AppState;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/dpp/dashboard/metrics", get(dashboard_metrics))
}

/// GET /dpp/dashboard/metrics: Summary metrics over the filtered collection.
///
/// Accepts the same filters as `GET /dpp`; sort and pagination are ignored.
#[utoipa::path(
    get,
    path = "/dpp/dashboard/metrics",
    params(
        ("searchQuery" = Option<String>, Query, description = "Case-insensitive substring of productName"),
        ("status" = Option<String>, Query, description = "Exact passport status"),
        ("compliance" = Option<String>, Query, description = "Regulation key whose entry must be compliant"),
        ("category" = Option<String>, Query, description = "Exact category"),
        ("blockchainAnchored" = Option<String>, Query, description = "all, anchored or not_anchored"),
    ),
    responses(
        (status = 200, description = "Dashboard metrics", body = DashboardMetrics),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorBody),
    ),
    tag = "dashboard"
)]
async fn dashboard_metrics(
    State(state): State<AppState>,
    query: Result<Query<RawPassportQuery>, QueryRejection>,
) -> Result<Json<DashboardMetrics>, AppError> {
    let filter = PassportFilter::try_from(extract_query(query)?)?;
    Ok(Json(state.registry.metrics(&filter)))
}
