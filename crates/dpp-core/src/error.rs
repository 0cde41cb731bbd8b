//! # Error Hierarchy
//!
//! Structured error types for the passport data model, built with `thiserror`.
//! Each variant carries the offending field or value so that API clients get
//! an actionable message without the server leaking internals.

use thiserror::Error;

use crate::identity::PassportId;
use crate::import::ImportJobStatus;

/// Validation failures for passports, patches, and import submissions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent or blank.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field is present but its value is unacceptable.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// The offending field, in wire (camelCase) form.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A patch attempted to change a server-managed or immutable field.
    #[error("field {0} is managed by the server and cannot be changed")]
    ImmutableField(String),

    /// GTIN fails the GS1 length or check-digit rules.
    #[error("invalid GTIN \"{0}\" (expected 8, 12, 13 or 14 digits with a valid check digit)")]
    InvalidGtin(String),

    /// The merged document no longer describes a valid passport.
    #[error("patched passport is malformed: {0}")]
    MalformedPassport(String),
}

/// Failures applying a merge patch to a stored passport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The patch or its result failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The passport is archived; only `metadata` may change.
    #[error("passport {0} is archived; only metadata may change")]
    Archived(PassportId),
}

/// Illegal import job state transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid import job transition from {from} to {to}")]
pub struct TransitionError {
    /// Status the job was in.
    pub from: ImportJobStatus,
    /// Status that was requested.
    pub to: ImportJobStatus,
}
