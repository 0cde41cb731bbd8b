//! Error envelope for framework-generated responses.
//!
//! Handlers return [`AppError`](crate::error::AppError), which already
//! renders `{"error": {"code", "message"}}`. Responses produced below the
//! handlers (405 from the router, 408 from the timeout layer) carry an
//! empty body and no content type; this middleware gives them the same
//! envelope.

use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::ErrorBody;

/// Wrap bodiless 4xx/5xx responses in the JSON error envelope.
pub async fn error_envelope_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error())
        || response.headers().contains_key(CONTENT_TYPE)
    {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    let message = status.canonical_reason().unwrap_or("request failed");
    (parts, Json(ErrorBody::new(status, message))).into_response()
}
