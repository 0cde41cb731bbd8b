//! # Regulation Taxonomy
//!
//! Defines the known regulation set that compliance aggregation runs over,
//! and the recognized per-regulation compliance statuses.
//!
//! Compliance maps are keyed by plain strings on the wire. Keys that do not
//! parse as a [`Regulation`] are kept in the record untouched but are never
//! counted by the aggregator; statuses that do not parse as a
//! [`ComplianceStatus`] are likewise kept but treated as carrying no data.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Regulations a passport can report compliance against.
///
/// | Key | Regulation |
/// |-----|------------|
/// | `espr` | Ecodesign for Sustainable Products Regulation |
/// | `eprel` | European Product Registry for Energy Labelling |
/// | `battery_regulation` | EU Battery Regulation 2023/1542 |
/// | `reach` | Registration, Evaluation, Authorisation of Chemicals |
/// | `rohs` | Restriction of Hazardous Substances |
/// | `weee` | Waste Electrical and Electronic Equipment |
/// | `ce_marking` | CE conformity marking |
/// | `scip` | Substances of Concern In articles as such or in complex objects (Products) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regulation {
    /// Ecodesign for Sustainable Products Regulation.
    Espr,
    /// EU energy label product registry.
    Eprel,
    /// EU Battery Regulation.
    BatteryRegulation,
    /// REACH chemicals regulation.
    Reach,
    /// RoHS hazardous substances directive.
    Rohs,
    /// WEEE waste electronics directive.
    Weee,
    /// CE conformity marking.
    CeMarking,
    /// ECHA SCIP database notification.
    Scip,
}

impl Regulation {
    /// All known regulations in canonical order.
    pub fn all() -> &'static [Regulation] {
        &[
            Self::Espr,
            Self::Eprel,
            Self::BatteryRegulation,
            Self::Reach,
            Self::Rohs,
            Self::Weee,
            Self::CeMarking,
            Self::Scip,
        ]
    }

    /// The snake_case wire key for this regulation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Espr => "espr",
            Self::Eprel => "eprel",
            Self::BatteryRegulation => "battery_regulation",
            Self::Reach => "reach",
            Self::Rohs => "rohs",
            Self::Weee => "weee",
            Self::CeMarking => "ce_marking",
            Self::Scip => "scip",
        }
    }
}

impl std::fmt::Display for Regulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regulation {
    type Err = String;

    /// Keys are matched case-insensitively; `-` is accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| format!("unknown regulation: {s}"))
    }
}

/// Recognized status values for a single compliance entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Requirements are met.
    Compliant,
    /// At least one requirement is violated.
    NonCompliant,
    /// Awaiting review by a compliance officer.
    PendingReview,
    /// The regulation does not apply to this product.
    NotApplicable,
    /// Assessment has started but not finished.
    InProgress,
    /// The assessment itself failed and must be repeated.
    Error,
}

impl ComplianceStatus {
    /// The snake_case wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant => "non_compliant",
            Self::PendingReview => "pending_review",
            Self::NotApplicable => "not_applicable",
            Self::InProgress => "in_progress",
            Self::Error => "error",
        }
    }

    /// Parse a stored status string. Only the exact wire values are
    /// recognized; anything else, including case or whitespace variants,
    /// is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "compliant" => Some(Self::Compliant),
            "non_compliant" => Some(Self::NonCompliant),
            "pending_review" => Some(Self::PendingReview),
            "not_applicable" => Some(Self::NotApplicable),
            "in_progress" => Some(Self::InProgress),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Whether this status counts toward full compliance.
    pub fn is_passing(&self) -> bool {
        matches!(self, Self::Compliant | Self::NotApplicable)
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
