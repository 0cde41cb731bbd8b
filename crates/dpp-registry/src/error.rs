//! Registry error type shared by every service in this crate.

use dpp_core::{PassportId, PatchError, TransitionError, ValidationError};
use thiserror::Error;

/// Failures returned by registry operations.
///
/// Domain outcomes such as a failed verification are results, not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No record exists under the given identifier.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind ("passport", "import job").
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The passport is archived and the operation would modify it.
    #[error("passport {0} is archived")]
    Archived(PassportId),

    /// Illegal import job state transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A record with this identifier already exists.
    #[error("passport {0} already exists")]
    Duplicate(PassportId),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// Passport lookup miss.
    pub fn passport_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: "passport",
            id: id.to_string(),
        }
    }

    /// Import job lookup miss.
    pub fn job_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: "import job",
            id: id.to_string(),
        }
    }
}

impl From<PatchError> for RegistryError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::Invalid(v) => Self::Validation(v),
            PatchError::Archived(id) => Self::Archived(id),
        }
    }
}
