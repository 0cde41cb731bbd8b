//! # Authentication Middleware
//!
//! Shared-secret bearer authentication for mutating requests.
//!
//! ## Allow-list Format
//!
//! `DPP_AUTH_TOKENS` is a comma-separated list of entries:
//!
//! ```text
//! {secret}              : anonymous client, recorded as "api-client"
//! {principal}:{secret}  : named client, principal recorded as the actor
//! ```
//!
//! Safe methods (GET, HEAD, OPTIONS) pass through unauthenticated. With an
//! empty allow-list every request is allowed and attributed to
//! `"anonymous"` (development mode).
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::error::{AppError, ErrorBody};

/// Principal recorded for allow-list entries that carry no name.
pub const DEFAULT_PRINCIPAL: &str = "api-client";

/// Principal recorded when authentication is disabled.
pub const ANONYMOUS_PRINCIPAL: &str = "anonymous";

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Name recorded as the actor of mutations (`anchoredBy`, logs).
    pub principal: String,
}

impl CallerIdentity {
    fn anonymous() -> Self {
        Self {
            principal: ANONYMOUS_PRINCIPAL.to_string(),
        }
    }
}

/// Axum `FromRequestParts` implementation for `CallerIdentity`.
///
/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// One allow-list entry.
#[derive(Clone)]
pub struct AllowedToken {
    principal: String,
    secret: String,
}

impl AllowedToken {
    /// Parse `secret` or `principal:secret`.
    pub fn parse(entry: &str) -> Result<Self, String> {
        let entry = entry.trim();
        let (principal, secret) = match entry.split_once(':') {
            Some((principal, secret)) => (principal.trim(), secret.trim()),
            None => (DEFAULT_PRINCIPAL, entry),
        };
        if principal.is_empty() {
            return Err("allow-list entry has an empty principal".into());
        }
        if secret.is_empty() {
            return Err(format!("allow-list entry for {principal} has an empty secret"));
        }
        Ok(Self {
            principal: principal.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Principal this token authenticates as.
    pub fn principal(&self) -> &str {
        &self.principal
    }
}

impl std::fmt::Debug for AllowedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowedToken")
            .field("principal", &self.principal)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Auth configuration injected into request extensions.
///
/// An empty allow-list disables authentication.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    tokens: Vec<AllowedToken>,
}

impl AuthConfig {
    /// Allow-list built from already parsed entries.
    pub fn new(tokens: Vec<AllowedToken>) -> Self {
        Self { tokens }
    }

    /// Parse a comma-separated allow-list. Blank entries are skipped.
    pub fn parse(list: &str) -> Result<Self, String> {
        let tokens = list
            .split(',')
            .filter(|e| !e.trim().is_empty())
            .map(AllowedToken::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    /// Whether any token is configured.
    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Number of allow-list entries.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the allow-list is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Match `provided` against every entry. All entries are compared so
    /// the position of the matching entry does not affect timing.
    fn authenticate(&self, provided: &str) -> Option<CallerIdentity> {
        let mut matched = None;
        for token in &self.tokens {
            if constant_time_token_eq(provided, &token.secret) && matched.is_none() {
                matched = Some(CallerIdentity {
                    principal: token.principal.clone(),
                });
            }
        }
        matched
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the bearer token on mutating requests and inject the caller's
/// [`CallerIdentity`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    if !config.is_enabled() {
        request.extensions_mut().insert(CallerIdentity::anonymous());
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) if header_value.starts_with("Bearer ") => {
            let provided = header_value[7..].trim();
            match config.authenticate(provided) {
                Some(identity) => {
                    request.extensions_mut().insert(identity);
                    next.run(request).await
                }
                None => {
                    tracing::warn!(
                        method = %request.method(),
                        path = %request.uri().path(),
                        "authentication failed: invalid bearer token"
                    );
                    unauthorized_response("invalid bearer token")
                }
            }
        }
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
        None => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "authentication failed: missing authorization header"
            );
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody::new(StatusCode::UNAUTHORIZED, message);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
