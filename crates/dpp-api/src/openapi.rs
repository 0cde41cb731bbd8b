//! # OpenAPI Document Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Shared-secret bearer token from the DPP_AUTH_TOKENS allow-list.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI document for the registry API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Digital Product Passport Registry API",
        version = "0.1.0",
        description = "Product compliance passports: lifecycle status, multi-regulation compliance, simulated ledger anchoring, verification, and bulk import jobs.\n\nMutating requests require `Authorization: Bearer <token>`. Reads and health probes are unauthenticated.",
        license(name = "BUSL-1.1")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // Passports
        crate::routes::passports::get_passport,
        crate::routes::passports::list_passports,
        crate::routes::passports::create_passport,
        crate::routes::passports::update_passport,
        crate::routes::passports::archive_passport,
        crate::routes::passports::record_scan,
        // Ledger
        crate::routes::ledger::anchor_passport,
        crate::routes::ledger::verify_passport,
        // Imports
        crate::routes::imports::submit_import,
        crate::routes::imports::get_import_job,
        // Dashboard
        crate::routes::dashboard::dashboard_metrics,
    ),
    components(schemas(
        // Passport model
        dpp_core::PassportId,
        dpp_core::Passport,
        dpp_core::PassportMetadata,
        dpp_core::PassportStatus,
        dpp_core::ComplianceEntry,
        dpp_core::BlockchainIdentifiers,
        dpp_core::AnchorRecord,
        dpp_core::VerificationInfo,
        dpp_core::VerificationStatus,
        dpp_core::LifecycleEvent,
        dpp_core::OverallCompliance,
        dpp_core::NewPassport,
        // Import jobs
        dpp_core::JobId,
        dpp_core::ImportJob,
        dpp_core::ImportJobStatus,
        dpp_core::ImportResultSummary,
        // Registry views
        dpp_registry::PassportView,
        dpp_registry::PassportPage,
        dpp_registry::PassportFilter,
        dpp_registry::AnchoredFilter,
        dpp_registry::SortField,
        dpp_registry::SortDirection,
        dpp_registry::DashboardMetrics,
        dpp_registry::UntrackedCompliancePolicy,
        dpp_registry::VerificationResult,
        dpp_registry::VerificationCheck,
        dpp_registry::CheckOutcome,
        // Request DTOs
        crate::routes::ledger::AnchorRequest,
        crate::routes::imports::ImportRequest,
        crate::routes::imports::ImportAccepted,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "passports", description = "Passport records"),
        (name = "ledger", description = "Simulated anchoring and verification"),
        (name = "imports", description = "Bulk import jobs"),
        (name = "dashboard", description = "Dashboard metrics"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
