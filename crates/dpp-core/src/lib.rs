#![deny(missing_docs)]

//! # dpp-core: Foundational Types for the Product Passport Registry
//!
//! This crate defines the passport data model and the pure logic that every
//! other crate in the workspace builds on. It performs no I/O and holds no
//! state. External dependencies are limited to `serde`, `serde_json`,
//! `thiserror`, `chrono`, `uuid` and `sha2`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`JobId`] cannot be passed where
//!    a [`PassportId`] is expected.
//!
//! 2. **Single [`Regulation`] enum.** The known regulation set is defined once.
//!    Compliance entries keyed outside it are preserved verbatim but never
//!    aggregated.
//!
//! 3. **[`aggregate`] is the sole path to an overall compliance label.**
//!    Every read path in the API runs through it, so the label shown on a
//!    passport and the label counted by dashboard metrics cannot diverge.
//!
//! 4. **Explicit merge-patch contract.** Updates follow RFC 7396 via
//!    [`apply_passport_patch`]: objects merge, `null` deletes, arrays replace.

pub mod compliance;
pub mod digest;
pub mod error;
pub mod identity;
pub mod import;
pub mod merge;
pub mod passport;
pub mod regulation;

// Re-export primary types at crate root for ergonomic imports.
pub use compliance::{aggregate, ComplianceBreakdown, OverallCompliance};
pub use digest::{derive_anchor_identifiers, sha256_hex};
pub use error::{PatchError, TransitionError, ValidationError};
pub use identity::{JobId, PassportId};
pub use import::{ImportJob, ImportJobStatus, ImportResultSummary};
pub use merge::{apply_passport_patch, merge_patch};
pub use passport::{
    validate_gtin, AnchorRecord, BlockchainIdentifiers, ComplianceEntry, LifecycleEvent,
    NewPassport, Passport, PassportMetadata, PassportStatus, VerificationInfo,
    VerificationStatus,
};
pub use regulation::{ComplianceStatus, Regulation};
