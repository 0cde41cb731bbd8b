//! Read model returned for every passport: the stored record plus its
//! derived overall compliance label.

use dpp_core::{OverallCompliance, Passport};
use serde::Serialize;

/// A passport as served to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PassportView {
    /// The stored record.
    #[serde(flatten)]
    pub passport: Passport,
    /// Label computed from `complianceMap` at read time.
    pub overall_compliance: OverallCompliance,
}

impl From<Passport> for PassportView {
    fn from(passport: Passport) -> Self {
        let overall_compliance = passport.overall_compliance();
        Self {
            passport,
            overall_compliance,
        }
    }
}
