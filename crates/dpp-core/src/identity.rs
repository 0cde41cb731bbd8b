//! # Identifier Newtypes
//!
//! Passport and import-job identifiers are distinct types. Both serialize as
//! plain strings. Server-generated values carry a uuid v4 body so that they
//! are collision-resistant without coordination.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum accepted identifier length.
const MAX_ID_LEN: usize = 128;

/// Unique, immutable passport identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema), schema(value_type = String))]
pub struct PassportId(String);

impl PassportId {
    /// Validate a caller-supplied identifier (trimmed, non-empty, bounded).
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }
        if trimmed.len() > MAX_ID_LEN {
            return Err(ValidationError::InvalidField {
                field: "id".to_string(),
                reason: format!("must not exceed {MAX_ID_LEN} characters"),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generate a fresh server-assigned identifier: `DPP-<32 hex>`.
    pub fn generate() -> Self {
        Self(format!("DPP-{}", Uuid::new_v4().simple()).to_uppercase())
    }

    /// Wrap a literal known to be valid (seed data, tests).
    pub fn from_static(s: &'static str) -> Self {
        Self(s.to_string())
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PassportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for PassportId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Unique import job identifier: `job_<32 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema), schema(value_type = String))]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh job identifier.
    pub fn generate() -> Self {
        Self(format!("job_{}", Uuid::new_v4().simple()))
    }

    /// Wrap a caller-supplied job identifier for lookup.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField("jobId".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passport_id_trims_input() {
        let id = PassportId::new("  DPP001 ").unwrap();
        assert_eq!(id.as_str(), "DPP001");
    }

    #[test]
    fn passport_id_rejects_blank() {
        assert_eq!(
            PassportId::new("   ").unwrap_err(),
            ValidationError::MissingField("id".to_string())
        );
    }

    #[test]
    fn passport_id_rejects_overlong() {
        assert!(PassportId::new("x".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn generated_passport_ids_are_unique_and_prefixed() {
        let a = PassportId::generate();
        let b = PassportId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("DPP-"));
        assert_eq!(a.as_str().len(), 4 + 32);
    }

    #[test]
    fn generated_job_ids_are_unique() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("job_"));
    }

    #[test]
    fn passport_id_serializes_as_plain_string() {
        let id = PassportId::from_static("DPP002");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"DPP002\"");
    }
}
