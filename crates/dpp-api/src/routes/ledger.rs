//! # Anchoring & Verification Routes
//!
//! Anchoring is simulated: identifiers are derived locally and every anchor
//! is appended to the passport's history. An `Idempotency-Key` header makes
//! anchor retries safe.
//!
//! Verification always answers with a [`VerificationResult`]. An unknown
//! passport yields a `ProductNotFound` result served with 404.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use dpp_core::{PassportId, VerificationStatus};
use dpp_registry::{PassportView, VerificationResult};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Header carrying the caller's retry key for anchoring.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Anchor request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnchorRequest {
    /// Ledger platform name, e.g. `Ethereum`.
    #[serde(default)]
    pub platform: Option<String>,
}

/// Build the anchoring and verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dpp/anchor/:id", post(anchor_passport))
        .route("/dpp/verify/:id", post(verify_passport))
        .route("/dpp/anchor/", post(missing_passport_id))
        .route("/dpp/verify/", post(missing_passport_id))
}

/// An empty path segment is a bad id, not an unknown route.
async fn missing_passport_id() -> AppError {
    AppError::BadRequest("passport id must not be empty".to_string())
}

/// POST /dpp/anchor/:id: Record a simulated ledger anchor.
#[utoipa::path(
    post,
    path = "/dpp/anchor/{id}",
    params(
        ("id" = String, Path, description = "Passport ID"),
        ("Idempotency-Key" = Option<String>, Header, description = "Retry key; a repeated key returns the passport unchanged"),
    ),
    request_body = AnchorRequest,
    responses(
        (status = 200, description = "Passport anchored", body = PassportView),
        (status = 400, description = "Missing platform", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Passport archived", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "ledger"
)]
async fn anchor_passport(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: CallerIdentity,
    headers: HeaderMap,
    body: Result<Json<AnchorRequest>, JsonRejection>,
) -> Result<Json<PassportView>, AppError> {
    let req = extract_json(body)?;
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let platform = req.platform.as_deref().unwrap_or_default();

    let id = PassportId::new(&id)?;
    let passport = state
        .commit_passport(&id, || {
            Ok(state
                .anchors
                .anchor(id.as_str(), platform, &caller.principal, idempotency_key)?)
        })
        .await?;
    Ok(Json(PassportView::from(passport)))
}

/// POST /dpp/verify/:id: Verify a passport.
#[utoipa::path(
    post,
    path = "/dpp/verify/{id}",
    params(("id" = String, Path, description = "Passport ID")),
    responses(
        (status = 200, description = "Verification completed", body = VerificationResult),
        (status = 400, description = "Blank passport ID", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 404, description = "ProductNotFound result", body = VerificationResult),
    ),
    security(("bearer_auth" = [])),
    tag = "ledger"
)]
async fn verify_passport(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<VerificationResult>), AppError> {
    let id = PassportId::new(&id)?;
    let result = state
        .commit_passport(&id, || Ok(state.verifier.verify(id.as_str())?))
        .await?;

    let status = match result.verification_status {
        VerificationStatus::ProductNotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    Ok((status, Json(result)))
}
