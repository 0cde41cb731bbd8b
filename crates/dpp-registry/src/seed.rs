//! Demo passports loaded at startup when seeding is enabled.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use dpp_core::{
    derive_anchor_identifiers, AnchorRecord, ComplianceEntry, ComplianceStatus, LifecycleEvent,
    Passport, PassportId, PassportMetadata, PassportStatus, VerificationInfo, VerificationStatus,
};
use serde_json::json;

struct Seed {
    id: &'static str,
    product_name: &'static str,
    category: &'static str,
    manufacturer: &'static str,
    gtin: Option<&'static str>,
    model_number: Option<&'static str>,
    status: PassportStatus,
    compliance: &'static [(&'static str, ComplianceStatus)],
    consumer_scans: u64,
    age_days: i64,
}

const SEEDS: &[Seed] = &[
    Seed {
        id: "DPP001",
        product_name: "EcoSmart Washing Machine",
        category: "Appliances",
        manufacturer: "GreenTech Appliances",
        gtin: Some("4006381333931"),
        model_number: Some("GT-WM-8000"),
        status: PassportStatus::Published,
        compliance: &[
            ("espr", ComplianceStatus::Compliant),
            ("eprel", ComplianceStatus::Compliant),
            ("weee", ComplianceStatus::Compliant),
        ],
        consumer_scans: 1520,
        age_days: 120,
    },
    Seed {
        id: "DPP002",
        product_name: "Smart LED Bulb",
        category: "Lighting",
        manufacturer: "BrightLife",
        gtin: Some("5901234123457"),
        model_number: Some("BL-LED-9W"),
        status: PassportStatus::PendingReview,
        compliance: &[
            ("eprel", ComplianceStatus::Compliant),
            ("espr", ComplianceStatus::NonCompliant),
        ],
        consumer_scans: 89,
        age_days: 45,
    },
    Seed {
        id: "DPP003",
        product_name: "Lithium-ion Battery Pack",
        category: "Batteries",
        manufacturer: "VoltCell Industries",
        gtin: Some("96385074"),
        model_number: None,
        status: PassportStatus::Published,
        compliance: &[
            ("battery_regulation", ComplianceStatus::PendingReview),
            ("reach", ComplianceStatus::Compliant),
            ("rohs", ComplianceStatus::InProgress),
        ],
        consumer_scans: 342,
        age_days: 60,
    },
    Seed {
        id: "DPP004",
        product_name: "Recycled Cotton T-Shirt",
        category: "Textiles",
        manufacturer: "EcoWear",
        gtin: Some("036000291452"),
        model_number: None,
        status: PassportStatus::Draft,
        compliance: &[],
        consumer_scans: 0,
        age_days: 7,
    },
    Seed {
        id: "DPP005",
        product_name: "Wireless Earbuds",
        category: "Electronics",
        manufacturer: "SoundWave Audio",
        gtin: None,
        model_number: Some("SW-EB2"),
        status: PassportStatus::Flagged,
        compliance: &[
            ("ce_marking", ComplianceStatus::Compliant),
            ("rohs", ComplianceStatus::Compliant),
            ("scip", ComplianceStatus::NotApplicable),
        ],
        consumer_scans: 2750,
        age_days: 200,
    },
];

/// Build the demo collection relative to `now`.
///
/// DPP001 and DPP003 carry anchors; DPP001 also carries a `Verified` result.
/// DPP004 has no compliance entries.
pub fn demo_passports(now: DateTime<Utc>) -> Vec<Passport> {
    SEEDS.iter().map(|s| build(s, now)).collect()
}

fn build(seed: &Seed, now: DateTime<Utc>) -> Passport {
    let created_at = now - Duration::days(seed.age_days);
    let last_updated = now - Duration::days(seed.age_days / 4);
    let compliance_map: BTreeMap<String, ComplianceEntry> = seed
        .compliance
        .iter()
        .map(|(key, status)| {
            let entry = ComplianceEntry::new(*status, last_updated);
            let entry = if *key == "eprel" {
                entry.with_reference(
                    &format!("EPREL-{}", &seed.id[3..]),
                    Some("https://eprel.ec.europa.eu"),
                )
            } else {
                entry
            };
            (key.to_string(), entry)
        })
        .collect();

    let mut passport = Passport {
        id: PassportId::from_static(seed.id),
        product_name: seed.product_name.to_string(),
        category: seed.category.to_string(),
        manufacturer: seed.manufacturer.to_string(),
        gtin: seed.gtin.map(String::from),
        model_number: seed.model_number.map(String::from),
        metadata: PassportMetadata {
            created_at,
            last_updated,
            status: seed.status,
        },
        compliance_map,
        blockchain_identifiers: None,
        anchor_history: Vec::new(),
        verification: None,
        lifecycle_events: vec![LifecycleEvent {
            event_type: "manufactured".to_string(),
            timestamp: created_at,
            location: Some("EU".to_string()),
            details: Some(json!({ "batch": format!("B-{}", seed.id) })),
        }],
        consumer_scans: seed.consumer_scans,
    };

    match seed.id {
        "DPP001" => {
            anchor(&mut passport, "Ethereum", last_updated);
            passport.verification = Some(VerificationInfo {
                status: Some(VerificationStatus::Verified),
                verification_id: Some("ver_seed_dpp001".to_string()),
                last_checked: Some(last_updated),
                message: Some("All verification checks passed".to_string()),
            });
        }
        "DPP003" => anchor(&mut passport, "Polygon", last_updated),
        _ => {}
    }
    passport
}

fn anchor(passport: &mut Passport, platform: &str, at: DateTime<Utc>) {
    let ids = derive_anchor_identifiers(&passport.id, platform, at, b"seed");
    passport.anchor_history.push(AnchorRecord {
        platform: platform.to_string(),
        anchor_transaction_hash: ids.anchor_transaction_hash.clone().unwrap_or_default(),
        contract_address: ids.contract_address.clone().unwrap_or_default(),
        token_id: ids.token_id.clone().unwrap_or_default(),
        anchored_at: at,
        anchored_by: "seed".to_string(),
        idempotency_key: None,
    });
    passport.blockchain_identifiers = Some(ids);
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpp_core::OverallCompliance;

    #[test]
    fn demo_passports_are_valid() {
        for p in demo_passports(Utc::now()) {
            assert!(p.validate().is_ok(), "{} failed validation", p.id);
            assert!(p.metadata.last_updated >= p.metadata.created_at);
        }
    }

    #[test]
    fn demo_collection_covers_every_label_of_interest() {
        let labels: Vec<OverallCompliance> = demo_passports(Utc::now())
            .iter()
            .map(Passport::overall_compliance)
            .collect();
        assert_eq!(
            labels,
            vec![
                OverallCompliance::FullyCompliant,
                OverallCompliance::NonCompliant,
                OverallCompliance::Pending,
                OverallCompliance::NotApplicable,
                OverallCompliance::FullyCompliant,
            ]
        );
    }

    #[test]
    fn anchored_seeds_have_matching_history() {
        let passports = demo_passports(Utc::now());
        for p in passports.iter().filter(|p| p.is_anchored()) {
            let current = p
                .blockchain_identifiers
                .as_ref()
                .and_then(|b| b.anchor_transaction_hash.clone());
            assert_eq!(
                current.as_deref(),
                p.anchor_history.last().map(|r| r.anchor_transaction_hash.as_str())
            );
        }
        assert_eq!(passports.iter().filter(|p| p.is_anchored()).count(), 2);
    }
}
