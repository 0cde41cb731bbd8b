//! # Passport Data Model
//!
//! The compliance and lifecycle record for one regulated product. Passports
//! serialize with camelCase member names; that JSON form is also the document
//! that merge patches are applied to (see [`crate::merge`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::compliance::{aggregate, OverallCompliance};
use crate::error::ValidationError;
use crate::identity::PassportId;
use crate::regulation::{ComplianceStatus, Regulation};

/// Maximum length of free-text descriptive fields.
const MAX_TEXT_LEN: usize = 512;

// ── Status enums ────────────────────────────────────────────────────────────

/// Publication status of a passport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PassportStatus {
    /// Created but not yet submitted.
    Draft,
    /// Submitted and awaiting review.
    PendingReview,
    /// Publicly visible.
    Published,
    /// Soft-deleted. Only metadata may change.
    Archived,
    /// Marked for attention by an operator or automated check.
    Flagged,
    /// Withdrawn by the issuer.
    Revoked,
}

impl PassportStatus {
    /// The snake_case wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Published => "published",
            Self::Archived => "archived",
            Self::Flagged => "flagged",
            Self::Revoked => "revoked",
        }
    }

    /// All statuses in declaration order.
    pub fn all() -> &'static [PassportStatus] {
        &[
            Self::Draft,
            Self::PendingReview,
            Self::Published,
            Self::Archived,
            Self::Flagged,
            Self::Revoked,
        ]
    }
}

impl std::fmt::Display for PassportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| format!("unknown passport status: {s}"))
    }
}

/// Outcome of an independent verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum VerificationStatus {
    /// All checks passed.
    Verified,
    /// At least one blocking check failed.
    VerificationFailed,
    /// Nothing failed, but the record is not yet verifiable end to end.
    PendingFurtherChecks,
    /// No passport exists under the requested id.
    ProductNotFound,
}

impl VerificationStatus {
    /// The wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "Verified",
            Self::VerificationFailed => "VerificationFailed",
            Self::PendingFurtherChecks => "PendingFurtherChecks",
            Self::ProductNotFound => "ProductNotFound",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Nested records ──────────────────────────────────────────────────────────

/// One regulation's evaluation attached to a passport.
///
/// `status` is kept as the raw string so that values outside
/// [`ComplianceStatus`] survive a round trip; see
/// [`ComplianceEntry::recognized_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComplianceEntry {
    /// Raw status value.
    pub status: String,
    /// When this entry was last evaluated. Filled with the current time when
    /// a client omits it.
    #[serde(default = "Utc::now")]
    pub last_checked: DateTime<Utc>,
    /// External reference (e.g. an EPREL registration number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// Link to the external record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ComplianceEntry {
    /// Create an entry with a recognized status.
    pub fn new(status: ComplianceStatus, last_checked: DateTime<Utc>) -> Self {
        Self {
            status: status.as_str().to_string(),
            last_checked,
            reference_id: None,
            url: None,
        }
    }

    /// Attach an external reference.
    pub fn with_reference(mut self, reference_id: &str, url: Option<&str>) -> Self {
        self.reference_id = Some(reference_id.to_string());
        self.url = url.map(String::from);
        self
    }

    /// Parsed status, or `None` when the stored value is not recognized.
    pub fn recognized_status(&self) -> Option<ComplianceStatus> {
        ComplianceStatus::parse(&self.status)
    }
}

/// The passport's current ledger anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BlockchainIdentifiers {
    /// Ledger or platform name (e.g. "Ethereum").
    pub platform: String,
    /// `0x`-prefixed 32-byte transaction hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_transaction_hash: Option<String>,
    /// `0x`-prefixed 20-byte contract address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Decimal token id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

/// An entry in the append-only anchor history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AnchorRecord {
    /// Ledger or platform name.
    pub platform: String,
    /// Transaction hash produced by this anchor.
    pub anchor_transaction_hash: String,
    /// Contract address produced by this anchor.
    pub contract_address: String,
    /// Token id produced by this anchor.
    pub token_id: String,
    /// When the anchor was recorded.
    pub anchored_at: DateTime<Utc>,
    /// Principal that requested the anchor.
    pub anchored_by: String,
    /// Client-supplied retry key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl AnchorRecord {
    /// The identifiers this record produced, as the current-anchor view.
    pub fn identifiers(&self) -> BlockchainIdentifiers {
        BlockchainIdentifiers {
            platform: self.platform.clone(),
            anchor_transaction_hash: Some(self.anchor_transaction_hash.clone()),
            contract_address: Some(self.contract_address.clone()),
            token_id: Some(self.token_id.clone()),
        }
    }
}

/// Latest verification outcome recorded on the passport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VerificationInfo {
    /// Outcome of the last verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VerificationStatus>,
    /// Identifier of the verification run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<String>,
    /// When the status was last set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    /// Human-readable explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A product history event (manufacture, shipment, repair, recycling).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LifecycleEvent {
    /// Event classification, free-form.
    pub event_type: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Where the event happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Structured event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

/// Server-maintained bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PassportMetadata {
    /// Creation time. Never changes.
    pub created_at: DateTime<Utc>,
    /// Last mutation time. Strictly increases on every mutation.
    pub last_updated: DateTime<Utc>,
    /// Publication status.
    pub status: PassportStatus,
}

// ── Passport ────────────────────────────────────────────────────────────────

/// A Digital Product Passport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Passport {
    /// Immutable identifier.
    pub id: PassportId,
    /// Commercial product name.
    pub product_name: String,
    /// Product category (e.g. "Electronics").
    pub category: String,
    /// Manufacturer legal name.
    pub manufacturer: String,
    /// GS1 Global Trade Item Number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    /// Manufacturer model number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
    /// Timestamps and status.
    pub metadata: PassportMetadata,
    /// Regulation key → evaluation. Ordered for deterministic output.
    #[serde(default)]
    pub compliance_map: BTreeMap<String, ComplianceEntry>,
    /// Current ledger anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_identifiers: Option<BlockchainIdentifiers>,
    /// Every anchor ever recorded, oldest first.
    #[serde(default)]
    pub anchor_history: Vec<AnchorRecord>,
    /// Latest verification outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationInfo>,
    /// Product history, in client order.
    #[serde(default)]
    pub lifecycle_events: Vec<LifecycleEvent>,
    /// Number of consumer scans.
    #[serde(default)]
    pub consumer_scans: u64,
}

impl Passport {
    /// Overall compliance label derived from the compliance map.
    pub fn overall_compliance(&self) -> OverallCompliance {
        aggregate(&self.compliance_map)
    }

    /// Whether the passport is soft-deleted.
    pub fn is_archived(&self) -> bool {
        self.metadata.status == PassportStatus::Archived
    }

    /// Whether a current anchor transaction hash is present and non-blank.
    pub fn is_anchored(&self) -> bool {
        self.blockchain_identifiers
            .as_ref()
            .and_then(|b| b.anchor_transaction_hash.as_deref())
            .is_some_and(|h| !h.trim().is_empty())
    }

    /// Advance `metadata.lastUpdated`.
    ///
    /// Uses `now` when it is later than the stored value; otherwise bumps the
    /// stored value by one microsecond so that the field strictly increases
    /// even under clock skew or sub-resolution bursts.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let prev = self.metadata.last_updated;
        self.metadata.last_updated = if now > prev {
            now
        } else {
            prev + Duration::microseconds(1)
        };
    }

    /// Check the fields every stored passport must satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }
        require_text("productName", &self.product_name)?;
        require_text("category", &self.category)?;
        require_text("manufacturer", &self.manufacturer)?;
        if let Some(gtin) = &self.gtin {
            validate_gtin(gtin)?;
        }
        for key in self.compliance_map.keys() {
            if key.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: "complianceMap".to_string(),
                    reason: "regulation keys must not be blank".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Entries whose key is a known regulation, paired with the parsed key.
    pub fn known_compliance(&self) -> impl Iterator<Item = (Regulation, &ComplianceEntry)> {
        self.compliance_map
            .iter()
            .filter_map(|(k, v)| k.parse::<Regulation>().ok().map(|r| (r, v)))
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field.to_string()));
    }
    if value.len() > MAX_TEXT_LEN {
        return Err(ValidationError::InvalidField {
            field: field.to_string(),
            reason: format!("must not exceed {MAX_TEXT_LEN} characters"),
        });
    }
    Ok(())
}

/// Validate a GS1 GTIN-8/12/13/14 including its mod-10 check digit.
pub fn validate_gtin(gtin: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidGtin(gtin.to_string());
    if !matches!(gtin.len(), 8 | 12 | 13 | 14) || !gtin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let digits: Vec<u32> = gtin.bytes().map(|b| u32::from(b - b'0')).collect();
    let (body, check) = digits.split_at(digits.len() - 1);
    // Weights alternate 3,1,3,… starting from the digit next to the check digit.
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();
    if (10 - sum % 10) % 10 == check[0] {
        Ok(())
    } else {
        Err(invalid())
    }
}

// ── Creation input ──────────────────────────────────────────────────────────

/// Caller-supplied fields for a new passport.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewPassport {
    /// Commercial product name.
    #[serde(default)]
    pub product_name: String,
    /// Product category.
    #[serde(default)]
    pub category: String,
    /// Manufacturer legal name.
    #[serde(default)]
    pub manufacturer: String,
    /// GS1 GTIN.
    #[serde(default)]
    pub gtin: Option<String>,
    /// Manufacturer model number.
    #[serde(default)]
    pub model_number: Option<String>,
    /// Entries that override or extend the default compliance skeleton.
    #[serde(default)]
    pub compliance_map: BTreeMap<String, ComplianceEntry>,
    /// Initial product history.
    #[serde(default)]
    pub lifecycle_events: Vec<LifecycleEvent>,
}

impl NewPassport {
    /// Build a draft passport.
    ///
    /// `skeleton` regulations start as `pending_review`; entries supplied by
    /// the caller replace skeleton entries with the same key.
    pub fn into_passport(
        self,
        id: PassportId,
        skeleton: &[Regulation],
        now: DateTime<Utc>,
    ) -> Result<Passport, ValidationError> {
        let mut compliance_map: BTreeMap<String, ComplianceEntry> = skeleton
            .iter()
            .map(|r| {
                (
                    r.as_str().to_string(),
                    ComplianceEntry::new(ComplianceStatus::PendingReview, now),
                )
            })
            .collect();
        compliance_map.extend(self.compliance_map);

        let passport = Passport {
            id,
            product_name: self.product_name.trim().to_string(),
            category: self.category.trim().to_string(),
            manufacturer: self.manufacturer.trim().to_string(),
            gtin: self.gtin.map(|g| g.trim().to_string()),
            model_number: self.model_number,
            metadata: PassportMetadata {
                created_at: now,
                last_updated: now,
                status: PassportStatus::Draft,
            },
            compliance_map,
            blockchain_identifiers: None,
            anchor_history: Vec::new(),
            verification: None,
            lifecycle_events: self.lifecycle_events,
            consumer_scans: 0,
        };
        passport.validate()?;
        Ok(passport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_passport() -> NewPassport {
        NewPassport {
            product_name: "EcoSmart Washing Machine".to_string(),
            category: "Appliances".to_string(),
            manufacturer: "GreenTech Appliances".to_string(),
            gtin: Some("4006381333931".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn into_passport_applies_skeleton_and_draft_status() {
        let now = Utc::now();
        let p = new_passport()
            .into_passport(
                PassportId::from_static("DPP100"),
                &[Regulation::Espr, Regulation::Eprel],
                now,
            )
            .unwrap();
        assert_eq!(p.metadata.status, PassportStatus::Draft);
        assert_eq!(p.metadata.created_at, now);
        assert_eq!(p.metadata.last_updated, now);
        assert_eq!(p.compliance_map.len(), 2);
        assert_eq!(p.compliance_map["espr"].status, "pending_review");
        assert_eq!(p.consumer_scans, 0);
        assert!(p.anchor_history.is_empty());
    }

    #[test]
    fn caller_entries_override_skeleton() {
        let now = Utc::now();
        let mut input = new_passport();
        input.compliance_map.insert(
            "espr".to_string(),
            ComplianceEntry::new(ComplianceStatus::Compliant, now),
        );
        let p = input
            .into_passport(PassportId::from_static("DPP101"), &[Regulation::Espr], now)
            .unwrap();
        assert_eq!(p.compliance_map["espr"].status, "compliant");
    }

    #[test]
    fn into_passport_rejects_missing_product_name() {
        let mut input = new_passport();
        input.product_name = "  ".to_string();
        let err = input
            .into_passport(PassportId::from_static("DPP102"), &[], Utc::now())
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("productName".to_string()));
    }

    #[test]
    fn touch_strictly_increases_even_with_stale_clock() {
        let now = Utc::now();
        let mut p = new_passport()
            .into_passport(PassportId::from_static("DPP103"), &[], now)
            .unwrap();
        p.touch(now);
        assert!(p.metadata.last_updated > now);
        let bumped = p.metadata.last_updated;
        p.touch(now - Duration::hours(1));
        assert!(p.metadata.last_updated > bumped);
        let later = bumped + Duration::seconds(5);
        p.touch(later);
        assert_eq!(p.metadata.last_updated, later);
    }

    #[test]
    fn gtin_valid_examples() {
        for g in ["4006381333931", "5901234123457", "96385074", "036000291452"] {
            assert!(validate_gtin(g).is_ok(), "{g} should be valid");
        }
    }

    #[test]
    fn gtin_rejects_bad_check_digit_and_length() {
        assert!(validate_gtin("4006381333932").is_err());
        assert!(validate_gtin("12345").is_err());
        assert!(validate_gtin("40063813339a1").is_err());
    }

    #[test]
    fn is_anchored_requires_non_blank_hash() {
        let mut p = new_passport()
            .into_passport(PassportId::from_static("DPP104"), &[], Utc::now())
            .unwrap();
        assert!(!p.is_anchored());
        p.blockchain_identifiers = Some(BlockchainIdentifiers {
            platform: "Ethereum".to_string(),
            anchor_transaction_hash: Some(" ".to_string()),
            contract_address: None,
            token_id: None,
        });
        assert!(!p.is_anchored());
        if let Some(b) = p.blockchain_identifiers.as_mut() {
            b.anchor_transaction_hash = Some("0xabc".to_string());
        }
        assert!(p.is_anchored());
    }

    #[test]
    fn passport_serializes_camel_case() {
        let p = new_passport()
            .into_passport(PassportId::from_static("DPP105"), &[], Utc::now())
            .unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("productName").is_some());
        assert!(json.get("complianceMap").is_some());
        assert_eq!(json["metadata"]["status"], "draft");
        assert!(json.get("blockchainIdentifiers").is_none());
    }

    #[test]
    fn compliance_entry_without_last_checked_deserializes() {
        let entry: ComplianceEntry =
            serde_json::from_value(serde_json::json!({"status": "compliant"})).unwrap();
        assert_eq!(entry.recognized_status(), Some(ComplianceStatus::Compliant));
    }

    #[test]
    fn passport_status_parse() {
        assert_eq!(
            "pending_review".parse::<PassportStatus>().unwrap(),
            PassportStatus::PendingReview
        );
        assert!("deleted".parse::<PassportStatus>().is_err());
    }
}
