//! # Verification Service
//!
//! Runs an independent verification pass over a stored passport and reports
//! a terminal outcome. Three checks are always reported:
//!
//! | Check | Pass | Warn | Fail |
//! |-------|------|------|------|
//! | `data_integrity` | required fields valid | | a required field is blank or malformed |
//! | `anchor_verification` | current anchor is well formed | not anchored | anchor hash malformed or disagrees with history |
//! | `critical_field_check` | `Fully Compliant` | pending, no data, untracked | `Non-Compliant` |
//!
//! In [`VerificationMode::Deterministic`] the outcome follows from the checks:
//! integrity failure or non-compliance yields `VerificationFailed`; a missing
//! anchor or incomplete compliance yields `PendingFurtherChecks`; otherwise
//! `Verified`. [`VerificationMode::Simulated`] draws the outcome from a seeded
//! RNG instead, for demos and tests.
//!
//! The result is written back to `passport.verification` unless the passport
//! is archived.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dpp_core::{
    OverallCompliance, Passport, PassportId, ValidationError, VerificationInfo, VerificationStatus,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RegistryError;
use crate::store::PassportRepository;

/// How the outcome is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationMode {
    /// Rule evaluation against compliance and anchor state.
    #[default]
    Deterministic,
    /// Uniform pick among the three found-passport outcomes.
    Simulated {
        /// RNG seed; equal seeds replay equal outcome sequences.
        seed: u64,
    },
}

impl FromStr for VerificationMode {
    type Err = String;

    /// Parses `deterministic` or `simulated`; the seed is supplied separately.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deterministic" => Ok(Self::Deterministic),
            "simulated" => Ok(Self::Simulated { seed: 0 }),
            other => Err(format!(
                "unknown verification mode \"{other}\" (expected deterministic or simulated)"
            )),
        }
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum CheckOutcome {
    /// Check passed.
    Pass,
    /// Check found nothing wrong but could not confirm.
    Warn,
    /// Check failed.
    Fail,
}

/// One reported check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VerificationCheck {
    /// Check name.
    pub name: String,
    /// Outcome.
    pub outcome: CheckOutcome,
    /// Explanation.
    pub detail: String,
}

/// Structured verification result. `ProductNotFound` is a result, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VerificationResult {
    /// Terminal outcome.
    pub verification_status: VerificationStatus,
    /// Unique id of this verification run.
    pub verification_id: String,
    /// Passport that was verified.
    pub passport_id: String,
    /// Human-readable explanation.
    pub message: String,
    /// When the run completed.
    pub timestamp: DateTime<Utc>,
    /// The checks, always in the same order.
    pub checks_performed: Vec<VerificationCheck>,
}

const DATA_INTEGRITY: &str = "data_integrity";
const ANCHOR_VERIFICATION: &str = "anchor_verification";
const CRITICAL_FIELD_CHECK: &str = "critical_field_check";

/// Verification over a passport repository.
#[derive(Debug, Clone)]
pub struct VerificationService {
    repo: Arc<dyn PassportRepository>,
    mode: VerificationMode,
    rng: Option<Arc<Mutex<StdRng>>>,
}

impl VerificationService {
    /// Service in the given mode.
    pub fn new(repo: Arc<dyn PassportRepository>, mode: VerificationMode) -> Self {
        let rng = match mode {
            VerificationMode::Deterministic => None,
            VerificationMode::Simulated { seed } => {
                Some(Arc::new(Mutex::new(StdRng::seed_from_u64(seed))))
            }
        };
        Self { repo, mode, rng }
    }

    /// Configured mode.
    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// Verify `passport_id`.
    pub fn verify(&self, passport_id: &str) -> Result<VerificationResult, RegistryError> {
        let id = PassportId::new(passport_id)
            .map_err(|_| ValidationError::MissingField("passportId".to_string()))?;

        let mut result = None;
        let outcome = self.repo.try_update(&id, &mut |p| {
            let now = Utc::now();
            let r = self.evaluate(p, now);
            if !p.is_archived() {
                p.verification = Some(VerificationInfo {
                    status: Some(r.verification_status),
                    verification_id: Some(r.verification_id.clone()),
                    last_checked: Some(now),
                    message: Some(r.message.clone()),
                });
                p.touch(now);
            }
            result = Some(r);
            Ok(())
        });

        match (outcome, result) {
            (Ok(_), Some(r)) => {
                tracing::info!(
                    passport_id = %id,
                    verification_id = %r.verification_id,
                    status = %r.verification_status,
                    "passport verified"
                );
                Ok(r)
            }
            (Err(RegistryError::NotFound { .. }), _) => Ok(not_found(&id)),
            (Err(e), _) => Err(e),
            (Ok(_), None) => Err(RegistryError::Internal(
                "verification produced no result".to_string(),
            )),
        }
    }

    fn evaluate(&self, passport: &Passport, now: DateTime<Utc>) -> VerificationResult {
        let overall = passport.overall_compliance();
        let integrity = integrity_check(passport);
        let anchor = anchor_check(passport);
        let critical = critical_check(overall);

        let (status, message) = match &self.rng {
            Some(rng) => {
                let pick = rng.lock().gen_range(0..3u8);
                let status = match pick {
                    0 => VerificationStatus::Verified,
                    1 => VerificationStatus::VerificationFailed,
                    _ => VerificationStatus::PendingFurtherChecks,
                };
                (status, format!("Simulated outcome: {status}"))
            }
            None => decide(&integrity, &anchor, overall),
        };

        VerificationResult {
            verification_status: status,
            verification_id: new_verification_id(),
            passport_id: passport.id.to_string(),
            message,
            timestamp: now,
            checks_performed: vec![integrity, anchor, critical],
        }
    }
}

fn new_verification_id() -> String {
    format!("ver_{}", Uuid::new_v4().simple())
}

fn check(name: &str, outcome: CheckOutcome, detail: impl Into<String>) -> VerificationCheck {
    VerificationCheck {
        name: name.to_string(),
        outcome,
        detail: detail.into(),
    }
}

fn integrity_check(passport: &Passport) -> VerificationCheck {
    match passport.validate() {
        Ok(()) => check(DATA_INTEGRITY, CheckOutcome::Pass, "required fields present and valid"),
        Err(e) => check(DATA_INTEGRITY, CheckOutcome::Fail, e.to_string()),
    }
}

fn is_hex_with_prefix(s: &str, hex_len: usize) -> bool {
    s.len() == hex_len + 2
        && s.starts_with("0x")
        && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

fn anchor_check(passport: &Passport) -> VerificationCheck {
    let Some(hash) = passport
        .blockchain_identifiers
        .as_ref()
        .and_then(|b| b.anchor_transaction_hash.as_deref())
        .filter(|h| !h.trim().is_empty())
    else {
        return check(ANCHOR_VERIFICATION, CheckOutcome::Warn, "passport is not anchored");
    };
    if !is_hex_with_prefix(hash, 64) {
        return check(
            ANCHOR_VERIFICATION,
            CheckOutcome::Fail,
            "anchor transaction hash is malformed",
        );
    }
    if let Some(last) = passport.anchor_history.last() {
        if last.anchor_transaction_hash != hash {
            return check(
                ANCHOR_VERIFICATION,
                CheckOutcome::Fail,
                "current anchor does not match the latest anchor history entry",
            );
        }
    }
    check(ANCHOR_VERIFICATION, CheckOutcome::Pass, "anchor present and well formed")
}

fn critical_check(overall: OverallCompliance) -> VerificationCheck {
    let outcome = match overall {
        OverallCompliance::FullyCompliant => CheckOutcome::Pass,
        OverallCompliance::NonCompliant => CheckOutcome::Fail,
        _ => CheckOutcome::Warn,
    };
    check(
        CRITICAL_FIELD_CHECK,
        outcome,
        format!("overall compliance is {overall}"),
    )
}

fn decide(
    integrity: &VerificationCheck,
    anchor: &VerificationCheck,
    overall: OverallCompliance,
) -> (VerificationStatus, String) {
    if integrity.outcome == CheckOutcome::Fail {
        return (
            VerificationStatus::VerificationFailed,
            format!("Data integrity check failed: {}", integrity.detail),
        );
    }
    if overall == OverallCompliance::NonCompliant {
        return (
            VerificationStatus::VerificationFailed,
            "At least one regulation is non-compliant".to_string(),
        );
    }
    if anchor.outcome != CheckOutcome::Pass {
        return (
            VerificationStatus::PendingFurtherChecks,
            format!("Anchor not verifiable: {}", anchor.detail),
        );
    }
    if overall != OverallCompliance::FullyCompliant {
        return (
            VerificationStatus::PendingFurtherChecks,
            format!("Compliance is not yet complete ({overall})"),
        );
    }
    (
        VerificationStatus::Verified,
        "All verification checks passed".to_string(),
    )
}

fn not_found(id: &PassportId) -> VerificationResult {
    let detail = "passport not found";
    VerificationResult {
        verification_status: VerificationStatus::ProductNotFound,
        verification_id: new_verification_id(),
        passport_id: id.to_string(),
        message: format!("Passport {id} not found"),
        timestamp: Utc::now(),
        checks_performed: vec![
            check(DATA_INTEGRITY, CheckOutcome::Fail, detail),
            check(ANCHOR_VERIFICATION, CheckOutcome::Fail, detail),
            check(CRITICAL_FIELD_CHECK, CheckOutcome::Fail, detail),
        ],
    }
}
