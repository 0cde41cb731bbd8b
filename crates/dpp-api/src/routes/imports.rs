//! # Bulk Import Routes
//!
//! Submission records an import job and returns 202 immediately; the
//! payload is opaque here. Jobs are polled by id until evicted.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use dpp_core::{ImportJob, ImportJobStatus, JobId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Body limit for import submissions.
pub const IMPORT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Import submission.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// Declared format, e.g. `csv` or `json`.
    #[serde(default)]
    pub file_type: String,
    /// Opaque payload: a string or any non-empty JSON value.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    /// Free-text origin of the data.
    #[serde(default)]
    pub source_description: Option<String>,
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportAccepted {
    pub job_id: JobId,
    pub status: ImportJobStatus,
    pub timestamp: DateTime<Utc>,
}

/// Build the imports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/dpp/import",
            post(submit_import).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT_BYTES)),
        )
        .route("/dpp/import/jobs/:job_id", get(get_import_job))
}

/// POST /dpp/import: Submit a bulk import.
#[utoipa::path(
    post,
    path = "/dpp/import",
    request_body = ImportRequest,
    responses(
        (status = 202, description = "Import accepted", body = ImportAccepted),
        (status = 400, description = "Missing fileType or data", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 413, description = "Payload too large", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "imports"
)]
async fn submit_import(
    State(state): State<AppState>,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ImportAccepted>), AppError> {
    let req = extract_json(body)?;
    let job = state
        .imports
        .submit(&req.file_type, &req.data, req.source_description)?;
    state.commit_import_job(&job).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ImportAccepted {
            job_id: job.job_id,
            status: job.status,
            timestamp: job.submitted_at,
        }),
    ))
}

/// GET /dpp/import/jobs/:job_id: Poll an import job.
#[utoipa::path(
    get,
    path = "/dpp/import/jobs/{job_id}",
    params(("job_id" = String, Path, description = "Import job ID")),
    responses(
        (status = 200, description = "Job found", body = ImportJob),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "imports"
)]
async fn get_import_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ImportJob>, AppError> {
    Ok(Json(state.imports.get_status(&job_id)?))
}
