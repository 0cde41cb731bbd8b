//! # API Route Modules
//!
//! - `passports`: read, list, create, merge-patch update, archive, scans.
//! - `ledger`: simulated anchoring and verification.
//! - `imports`: bulk import submission and job polling.
//! - `dashboard`: summary metrics over a filtered collection.

pub mod dashboard;
pub mod imports;
pub mod ledger;
pub mod passports;
