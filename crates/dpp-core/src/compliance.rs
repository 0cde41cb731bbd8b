//! # Compliance Aggregation
//!
//! Collapses a passport's per-regulation compliance map into one overall
//! label. Worst status wins: a single non-compliant regulation makes the
//! whole passport non-compliant, and full compliance requires every
//! recognized entry to pass.
//!
//! Only entries keyed by a known [`Regulation`] participate. Priority order,
//! first match wins:
//!
//! | # | Condition | Label |
//! |---|-----------|-------|
//! | 1 | map is empty | `N/A` |
//! | 2 | no known entry has a recognized status | `No Data` |
//! | 3 | any `non_compliant` | `Non-Compliant` |
//! | 4 | any `pending_review`, `in_progress`, `error` | `Pending` |
//! | 5 | all `compliant` / `not_applicable` | `Fully Compliant` |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::passport::ComplianceEntry;
use crate::regulation::{ComplianceStatus, Regulation};

/// Overall compliance label for a passport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum OverallCompliance {
    /// The compliance map is empty; nothing is tracked.
    #[serde(rename = "N/A")]
    NotApplicable,
    /// Regulations are listed but none carries a usable status.
    #[serde(rename = "No Data")]
    NoData,
    /// At least one regulation is violated.
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
    /// Nothing is violated but at least one assessment is open.
    #[serde(rename = "Pending")]
    Pending,
    /// Every recognized entry is compliant or not applicable.
    #[serde(rename = "Fully Compliant")]
    FullyCompliant,
}

impl OverallCompliance {
    /// The display label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotApplicable => "N/A",
            Self::NoData => "No Data",
            Self::NonCompliant => "Non-Compliant",
            Self::Pending => "Pending",
            Self::FullyCompliant => "Fully Compliant",
        }
    }

    /// All labels in priority order.
    pub fn all() -> &'static [OverallCompliance] {
        &[
            Self::NotApplicable,
            Self::NoData,
            Self::NonCompliant,
            Self::Pending,
            Self::FullyCompliant,
        ]
    }
}

impl std::fmt::Display for OverallCompliance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the overall label from a compliance map.
pub fn aggregate(map: &BTreeMap<String, ComplianceEntry>) -> OverallCompliance {
    if map.is_empty() {
        return OverallCompliance::NotApplicable;
    }

    let recognized: Vec<ComplianceStatus> = map
        .iter()
        .filter(|(key, _)| key.parse::<Regulation>().is_ok())
        .filter_map(|(_, entry)| entry.recognized_status())
        .collect();

    if recognized.is_empty() {
        return OverallCompliance::NoData;
    }
    if recognized.contains(&ComplianceStatus::NonCompliant) {
        return OverallCompliance::NonCompliant;
    }
    if recognized.iter().any(|s| {
        matches!(
            s,
            ComplianceStatus::PendingReview | ComplianceStatus::InProgress | ComplianceStatus::Error
        )
    }) {
        return OverallCompliance::Pending;
    }
    debug_assert!(recognized.iter().all(ComplianceStatus::is_passing));
    OverallCompliance::FullyCompliant
}

/// Per-status counts behind an overall label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComplianceBreakdown {
    /// Overall label.
    pub overall: Option<OverallCompliance>,
    /// Known-regulation entries, by recognized status.
    pub by_status: BTreeMap<String, usize>,
    /// Known regulations whose passing status lets them count as green.
    pub passing: Vec<String>,
    /// Known regulations that block full compliance.
    pub blocking: Vec<String>,
    /// Keys outside the known regulation set (preserved, not aggregated).
    pub unknown_regulations: Vec<String>,
    /// Known regulations whose status value is not recognized.
    pub unrecognized_statuses: Vec<String>,
}

impl ComplianceBreakdown {
    /// Build the breakdown for a compliance map.
    pub fn from_map(map: &BTreeMap<String, ComplianceEntry>) -> Self {
        let mut out = Self {
            overall: Some(aggregate(map)),
            ..Self::default()
        };
        for (key, entry) in map {
            if key.parse::<Regulation>().is_err() {
                out.unknown_regulations.push(key.clone());
                continue;
            }
            match entry.recognized_status() {
                Some(status) => {
                    *out.by_status.entry(status.as_str().to_string()).or_default() += 1;
                    if status.is_passing() {
                        out.passing.push(key.clone());
                    } else {
                        out.blocking.push(key.clone());
                    }
                }
                None => out.unrecognized_statuses.push(key.clone()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, ComplianceEntry> {
        entries
            .iter()
            .map(|(k, s)| {
                (
                    k.to_string(),
                    ComplianceEntry {
                        status: s.to_string(),
                        last_checked: Utc::now(),
                        reference_id: None,
                        url: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn empty_map_is_not_applicable() {
        assert_eq!(aggregate(&map(&[])), OverallCompliance::NotApplicable);
    }

    #[test]
    fn unrecognized_statuses_only_is_no_data() {
        assert_eq!(
            aggregate(&map(&[("eprel", "unknown"), ("espr", "")])),
            OverallCompliance::NoData
        );
    }

    #[test]
    fn unknown_regulations_only_is_no_data() {
        assert_eq!(
            aggregate(&map(&[("fda", "non_compliant")])),
            OverallCompliance::NoData
        );
    }

    #[test]
    fn non_compliant_wins_over_compliant() {
        assert_eq!(
            aggregate(&map(&[("eprel", "compliant"), ("espr", "non_compliant")])),
            OverallCompliance::NonCompliant
        );
    }

    #[test]
    fn non_compliant_wins_over_pending() {
        assert_eq!(
            aggregate(&map(&[("reach", "pending_review"), ("rohs", "non_compliant")])),
            OverallCompliance::NonCompliant
        );
    }

    #[test]
    fn pending_and_in_progress_yield_pending() {
        assert_eq!(
            aggregate(&map(&[("eprel", "compliant"), ("espr", "in_progress")])),
            OverallCompliance::Pending
        );
        assert_eq!(
            aggregate(&map(&[("weee", "pending_review")])),
            OverallCompliance::Pending
        );
    }

    #[test]
    fn error_status_yields_pending() {
        assert_eq!(
            aggregate(&map(&[("eprel", "compliant"), ("scip", "error")])),
            OverallCompliance::Pending
        );
    }

    #[test]
    fn compliant_and_not_applicable_is_fully_compliant() {
        assert_eq!(
            aggregate(&map(&[("eprel", "compliant"), ("battery_regulation", "not_applicable")])),
            OverallCompliance::FullyCompliant
        );
    }

    #[test]
    fn unknown_keys_do_not_affect_label() {
        assert_eq!(
            aggregate(&map(&[("eprel", "compliant"), ("custom_rule", "non_compliant")])),
            OverallCompliance::FullyCompliant
        );
    }

    #[test]
    fn unrecognized_status_is_ignored_next_to_recognized() {
        assert_eq!(
            aggregate(&map(&[("eprel", "compliant"), ("espr", "waiting")])),
            OverallCompliance::FullyCompliant
        );
    }

    #[test]
    fn labels_serialize_to_display_strings() {
        for label in OverallCompliance::all() {
            let json = serde_json::to_string(label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
        }
    }

    #[test]
    fn breakdown_partitions_entries() {
        let b = ComplianceBreakdown::from_map(&map(&[
            ("eprel", "compliant"),
            ("espr", "non_compliant"),
            ("reach", "bogus"),
            ("internal_qa", "compliant"),
        ]));
        assert_eq!(b.overall, Some(OverallCompliance::NonCompliant));
        assert_eq!(b.passing, vec!["eprel".to_string()]);
        assert_eq!(b.blocking, vec!["espr".to_string()]);
        assert_eq!(b.unrecognized_statuses, vec!["reach".to_string()]);
        assert_eq!(b.unknown_regulations, vec!["internal_qa".to_string()]);
        assert_eq!(b.by_status.get("compliant"), Some(&1));
    }
}
