//! # Passport Routes
//!
//! Reads are unauthenticated. Mutations require a bearer token and are
//! attributed to the caller's principal. Every passport in a response is a
//! [`PassportView`], so `overallCompliance` is always present.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dpp_core::{NewPassport, PassportId};
use dpp_registry::{PassportFilter, PassportPage, PassportView, RawPassportQuery};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::state::AppState;

/// Build the passports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dpp", get(list_passports).post(create_passport))
        .route(
            "/dpp/:id",
            get(get_passport).put(update_passport).delete(archive_passport),
        )
        .route("/dpp/:id/scan", post(record_scan))
}

/// GET /dpp/:id: Fetch one passport.
#[utoipa::path(
    get,
    path = "/dpp/{id}",
    params(("id" = String, Path, description = "Passport ID")),
    responses(
        (status = 200, description = "Passport found", body = PassportView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "passports"
)]
async fn get_passport(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PassportView>, AppError> {
    let passport = state.registry.get_by_id(&id)?;
    Ok(Json(PassportView::from(passport)))
}

/// GET /dpp: Filtered, sorted, paginated listing.
#[utoipa::path(
    get,
    path = "/dpp",
    params(
        ("searchQuery" = Option<String>, Query, description = "Case-insensitive substring of productName"),
        ("status" = Option<String>, Query, description = "Exact passport status"),
        ("compliance" = Option<String>, Query, description = "Regulation key whose entry must be compliant"),
        ("category" = Option<String>, Query, description = "Exact category"),
        ("blockchainAnchored" = Option<String>, Query, description = "all, anchored or not_anchored"),
        ("sortBy" = Option<String>, Query, description = "Sort key"),
        ("sortDirection" = Option<String>, Query, description = "asc or desc"),
        ("limit" = Option<usize>, Query, description = "Page size (max 1000)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "Matching passports", body = PassportPage),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorBody),
    ),
    tag = "passports"
)]
async fn list_passports(
    State(state): State<AppState>,
    query: Result<Query<RawPassportQuery>, QueryRejection>,
) -> Result<Json<PassportPage>, AppError> {
    let filter = PassportFilter::try_from(extract_query(query)?)?;
    Ok(Json(state.registry.list(&filter)))
}

/// POST /dpp: Create a draft passport.
#[utoipa::path(
    post,
    path = "/dpp",
    request_body = NewPassport,
    responses(
        (status = 201, description = "Passport created", body = PassportView),
        (status = 400, description = "Invalid passport", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "passports"
)]
async fn create_passport(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<NewPassport>, JsonRejection>,
) -> Result<(StatusCode, Json<PassportView>), AppError> {
    let input = extract_json(body)?;
    let passport = state
        .commit_new_passport(|| Ok(state.registry.create(input, &caller.principal)?))
        .await?;
    Ok((StatusCode::CREATED, Json(PassportView::from(passport))))
}

/// PUT /dpp/:id: Apply a JSON merge patch.
#[utoipa::path(
    put,
    path = "/dpp/{id}",
    params(("id" = String, Path, description = "Passport ID")),
    request_body(content = Object, description = "RFC 7396 merge patch"),
    responses(
        (status = 200, description = "Passport updated", body = PassportView),
        (status = 400, description = "Invalid patch", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Passport archived", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "passports"
)]
async fn update_passport(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: CallerIdentity,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<PassportView>, AppError> {
    let patch = extract_json(body)?;
    let id = PassportId::new(&id)?;
    let passport = state
        .commit_passport(&id, || {
            Ok(state.registry.update(id.as_str(), &patch, &caller.principal)?)
        })
        .await?;
    Ok(Json(PassportView::from(passport)))
}

/// DELETE /dpp/:id: Soft-archive.
#[utoipa::path(
    delete,
    path = "/dpp/{id}",
    params(("id" = String, Path, description = "Passport ID")),
    responses(
        (status = 200, description = "Passport archived", body = PassportView),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "passports"
)]
async fn archive_passport(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: CallerIdentity,
) -> Result<Json<PassportView>, AppError> {
    let id = PassportId::new(&id)?;
    let passport = state
        .commit_passport(&id, || Ok(state.registry.archive(id.as_str(), &caller.principal)?))
        .await?;
    Ok(Json(PassportView::from(passport)))
}

/// POST /dpp/:id/scan: Count one consumer scan.
#[utoipa::path(
    post,
    path = "/dpp/{id}/scan",
    params(("id" = String, Path, description = "Passport ID")),
    responses(
        (status = 200, description = "Scan recorded", body = PassportView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Passport archived", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "passports"
)]
async fn record_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PassportView>, AppError> {
    let id = PassportId::new(&id)?;
    let passport = state
        .commit_passport(&id, || Ok(state.registry.record_scan(id.as_str())?))
        .await?;
    Ok(Json(PassportView::from(passport)))
}
