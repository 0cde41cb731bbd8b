//! # Dashboard Views
//!
//! Read-only filtering, sorting, pagination and summary metrics over the
//! passport collection.
//!
//! Filters compose conjunctively: a passport is listed only if it satisfies
//! every supplied filter, so incompatible combinations produce an empty
//! page. Sorting is stable and places missing or blank keys last in both
//! directions.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dpp_core::{ComplianceStatus, OverallCompliance, Passport, PassportStatus, Regulation, ValidationError};
use serde::{Deserialize, Serialize};

use crate::view::PassportView;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 1000;

// ── Filter vocabulary ───────────────────────────────────────────────────────

/// Tri-state filter on anchor presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AnchoredFilter {
    /// No constraint.
    #[default]
    All,
    /// Only passports with a current anchor transaction hash.
    Anchored,
    /// Only passports without one.
    NotAnchored,
}

impl FromStr for AnchoredFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "anchored" | "true" => Ok(Self::Anchored),
            "not_anchored" | "false" => Ok(Self::NotAnchored),
            _ => Err(invalid("blockchainAnchored", "expected all, anchored or not_anchored")),
        }
    }
}

/// Sortable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum SortField {
    /// Passport id.
    Id,
    /// Product name, case-insensitive.
    ProductName,
    /// Category, case-insensitive.
    Category,
    /// Manufacturer, case-insensitive.
    Manufacturer,
    /// Publication status.
    Status,
    /// `metadata.lastUpdated`.
    LastUpdated,
    /// `verification.status`.
    VerificationStatus,
    /// Consumer scan count.
    ConsumerScans,
}

impl FromStr for SortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" => Ok(Self::Id),
            "productName" => Ok(Self::ProductName),
            "category" => Ok(Self::Category),
            "manufacturer" => Ok(Self::Manufacturer),
            "status" | "metadata.status" => Ok(Self::Status),
            "lastUpdated" | "metadata.lastUpdated" => Ok(Self::LastUpdated),
            "verificationStatus" | "verification.status" => Ok(Self::VerificationStatus),
            "consumerScans" => Ok(Self::ConsumerScans),
            _ => Err(invalid(
                "sortBy",
                "expected id, productName, category, manufacturer, status, lastUpdated, verificationStatus or consumerScans",
            )),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl FromStr for SortDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(invalid("sortDirection", "expected asc or desc")),
        }
    }
}

/// How passports with an empty compliance map enter the fully-compliant
/// metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum UntrackedCompliancePolicy {
    /// Untracked passports count as fully compliant.
    #[default]
    CountAsCompliant,
    /// Untracked passports are left out of both numerator and denominator.
    Exclude,
}

impl FromStr for UntrackedCompliancePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count_as_compliant" => Ok(Self::CountAsCompliant),
            "exclude" => Ok(Self::Exclude),
            other => Err(format!(
                "unknown untracked policy \"{other}\" (expected count_as_compliant or exclude)"
            )),
        }
    }
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ── Query ───────────────────────────────────────────────────────────────────

/// Query parameters exactly as received. Every value is optional text so
/// that bad values surface as validation errors rather than decoder errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPassportQuery {
    /// Case-insensitive substring of `productName`.
    pub search_query: Option<String>,
    /// Publication status.
    pub status: Option<String>,
    /// Regulation key whose entry must be `compliant`.
    pub compliance: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// `all`, `anchored` or `not_anchored`.
    pub blockchain_anchored: Option<String>,
    /// Sort key.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_direction: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Page start.
    pub offset: Option<String>,
}

/// Validated filter, sort and page selection. Echoed back in list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PassportFilter {
    /// Case-insensitive substring of `productName`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    /// Exact publication status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PassportStatus>,
    /// Regulation key whose entry must be `compliant`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance: Option<String>,
    /// Exact category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Anchor presence.
    pub blockchain_anchored: AnchoredFilter,
    /// Sort key; insertion order when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortField>,
    /// Sort direction.
    pub sort_direction: SortDirection,
    /// Page size; unbounded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Page start.
    pub offset: usize,
}

impl TryFrom<RawPassportQuery> for PassportFilter {
    type Error = ValidationError;

    fn try_from(raw: RawPassportQuery) -> Result<Self, Self::Error> {
        let status = non_blank(raw.status)
            .map(|s| {
                s.parse::<PassportStatus>()
                    .map_err(|_| invalid("status", "unknown passport status"))
            })
            .transpose()?;
        let limit = non_blank(raw.limit)
            .map(|s| parse_count("limit", &s))
            .transpose()?;
        if limit.is_some_and(|l| l > MAX_PAGE_SIZE) {
            return Err(invalid("limit", "must not exceed 1000"));
        }
        Ok(Self {
            search_query: non_blank(raw.search_query),
            status,
            compliance: non_blank(raw.compliance),
            category: non_blank(raw.category),
            blockchain_anchored: non_blank(raw.blockchain_anchored)
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
            sort_by: non_blank(raw.sort_by).map(|s| s.parse()).transpose()?,
            sort_direction: non_blank(raw.sort_direction)
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
            limit,
            offset: non_blank(raw.offset)
                .map(|s| parse_count("offset", &s))
                .transpose()?
                .unwrap_or(0),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_count(field: &str, value: &str) -> Result<usize, ValidationError> {
    value
        .parse::<usize>()
        .map_err(|_| invalid(field, "must be a non-negative integer"))
}

impl PassportFilter {
    /// Whether `passport` satisfies every filter.
    pub fn matches(&self, passport: &Passport) -> bool {
        if let Some(q) = &self.search_query {
            if !passport
                .product_name
                .to_lowercase()
                .contains(&q.to_lowercase())
            {
                return false;
            }
        }
        if let Some(status) = self.status {
            if passport.metadata.status != status {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &passport.category != category {
                return false;
            }
        }
        if let Some(regulation) = &self.compliance {
            if !is_compliant_with(passport, regulation) {
                return false;
            }
        }
        match self.blockchain_anchored {
            AnchoredFilter::All => true,
            AnchoredFilter::Anchored => passport.is_anchored(),
            AnchoredFilter::NotAnchored => !passport.is_anchored(),
        }
    }
}

fn is_compliant_with(passport: &Passport, wanted: &str) -> bool {
    let wanted_regulation = wanted.parse::<Regulation>().ok();
    passport.compliance_map.iter().any(|(key, entry)| {
        let same_key = match wanted_regulation {
            Some(r) => key.parse::<Regulation>().ok() == Some(r),
            None => key == wanted,
        };
        same_key && entry.recognized_status() == Some(ComplianceStatus::Compliant)
    })
}

// ── Sorting ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Text(String),
    Time(DateTime<Utc>),
    Count(u64),
}

fn text_key(s: &str) -> Option<SortKey> {
    let t = s.trim();
    (!t.is_empty()).then(|| SortKey::Text(t.to_lowercase()))
}

fn sort_key(passport: &Passport, field: SortField) -> Option<SortKey> {
    match field {
        SortField::Id => text_key(passport.id.as_str()),
        SortField::ProductName => text_key(&passport.product_name),
        SortField::Category => text_key(&passport.category),
        SortField::Manufacturer => text_key(&passport.manufacturer),
        SortField::Status => text_key(passport.metadata.status.as_str()),
        SortField::LastUpdated => Some(SortKey::Time(passport.metadata.last_updated)),
        SortField::VerificationStatus => passport
            .verification
            .as_ref()
            .and_then(|v| v.status)
            .and_then(|s| text_key(s.as_str())),
        SortField::ConsumerScans => Some(SortKey::Count(passport.consumer_scans)),
    }
}

/// Stable sort; missing keys go last in either direction.
pub fn sort_passports(passports: &mut Vec<Passport>, field: SortField, direction: SortDirection) {
    let mut keyed: Vec<(Option<SortKey>, Passport)> = passports
        .drain(..)
        .map(|p| (sort_key(&p, field), p))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Asc => a.cmp(b),
            SortDirection::Desc => b.cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    passports.extend(keyed.into_iter().map(|(_, p)| p));
}

// ── Aggregation ─────────────────────────────────────────────────────────────

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PassportPage {
    /// Passports on this page.
    pub passports: Vec<PassportView>,
    /// Matching passports before pagination.
    pub total_count: usize,
    /// The applied filter.
    pub filters: PassportFilter,
}

/// Summary metrics over a filtered collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DashboardMetrics {
    /// Passports matching the filter.
    pub total_passports: usize,
    /// Fully compliant passports, subject to the untracked policy.
    pub fully_compliant_count: usize,
    /// `fullyCompliantCount` as a percentage of the eligible population.
    pub fully_compliant_percentage: f64,
    /// Passports with status `pending_review`.
    pub pending_review_count: usize,
    /// Sum of consumer scans.
    pub total_consumer_scans: u64,
    /// Mean consumer scans per passport.
    pub average_consumer_scans: f64,
    /// Passports with an empty compliance map.
    pub untracked_count: usize,
    /// Passports with a current anchor.
    pub anchored_count: usize,
    /// Count per overall compliance label.
    pub by_compliance_label: BTreeMap<String, usize>,
    /// Policy applied to untracked passports.
    pub untracked_policy: UntrackedCompliancePolicy,
}

/// Computes list pages and metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardAggregator {
    policy: UntrackedCompliancePolicy,
}

impl DashboardAggregator {
    /// Aggregator with the given untracked-compliance policy.
    pub fn new(policy: UntrackedCompliancePolicy) -> Self {
        Self { policy }
    }

    /// The configured policy.
    pub fn policy(&self) -> UntrackedCompliancePolicy {
        self.policy
    }

    /// Filter, sort and paginate.
    pub fn page(&self, passports: Vec<Passport>, filter: &PassportFilter) -> PassportPage {
        let mut matching: Vec<Passport> =
            passports.into_iter().filter(|p| filter.matches(p)).collect();
        if let Some(field) = filter.sort_by {
            sort_passports(&mut matching, field, filter.sort_direction);
        }
        let total_count = matching.len();
        let page = matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .map(PassportView::from)
            .collect();
        PassportPage {
            passports: page,
            total_count,
            filters: filter.clone(),
        }
    }

    /// Metrics over every passport that matches `filter`. Pagination is
    /// ignored.
    pub fn metrics(&self, passports: &[Passport], filter: &PassportFilter) -> DashboardMetrics {
        let mut m = DashboardMetrics {
            total_passports: 0,
            fully_compliant_count: 0,
            fully_compliant_percentage: 0.0,
            pending_review_count: 0,
            total_consumer_scans: 0,
            average_consumer_scans: 0.0,
            untracked_count: 0,
            anchored_count: 0,
            by_compliance_label: OverallCompliance::all()
                .iter()
                .map(|l| (l.as_str().to_string(), 0))
                .collect(),
            untracked_policy: self.policy,
        };

        for p in passports.iter().filter(|p| filter.matches(p)) {
            let label = p.overall_compliance();
            m.total_passports += 1;
            *m.by_compliance_label
                .entry(label.as_str().to_string())
                .or_default() += 1;
            if p.compliance_map.is_empty() {
                m.untracked_count += 1;
            }
            if p.is_anchored() {
                m.anchored_count += 1;
            }
            if p.metadata.status == PassportStatus::PendingReview {
                m.pending_review_count += 1;
            }
            m.total_consumer_scans = m.total_consumer_scans.saturating_add(p.consumer_scans);

            let counts_as_compliant = match label {
                OverallCompliance::FullyCompliant => true,
                OverallCompliance::NotApplicable => {
                    self.policy == UntrackedCompliancePolicy::CountAsCompliant
                }
                _ => false,
            };
            if counts_as_compliant {
                m.fully_compliant_count += 1;
            }
        }

        let eligible = match self.policy {
            UntrackedCompliancePolicy::CountAsCompliant => m.total_passports,
            UntrackedCompliancePolicy::Exclude => m.total_passports - m.untracked_count,
        };
        m.fully_compliant_percentage = percentage(m.fully_compliant_count, eligible);
        if m.total_passports > 0 {
            m.average_consumer_scans =
                round2(m.total_consumer_scans as f64 / m.total_passports as f64);
        }
        m
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / whole as f64)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
