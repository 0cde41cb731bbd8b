#![deny(missing_docs)]

//! # dpp-registry: Passport Registry Services
//!
//! Stateful services over the [`dpp_core`] data model. Every service takes
//! an `Arc<dyn PassportRepository>`, so storage is injected rather than
//! global.
//!
//! | Service | Responsibility |
//! |---------|----------------|
//! | [`PassportRegistry`] | get, list, create, merge-patch update, archive, scan recording |
//! | [`AnchorService`] | simulated ledger anchoring with append-only history |
//! | [`VerificationService`] | deterministic (or seeded simulated) verification |
//! | [`ImportJobTracker`] | import job submission, polling, transitions, TTL eviction |
//! | [`DashboardAggregator`] | filter, sort, paginate, metrics |
//!
//! All locks are `parking_lot` and synchronous; nothing here awaits.

pub mod anchor;
pub mod dashboard;
pub mod error;
pub mod import;
pub mod registry;
pub mod seed;
pub mod store;
pub mod verification;
pub mod view;

pub use anchor::AnchorService;
pub use dashboard::{
    AnchoredFilter, DashboardAggregator, DashboardMetrics, PassportFilter, PassportPage,
    RawPassportQuery, SortDirection, SortField, UntrackedCompliancePolicy, MAX_PAGE_SIZE,
};
pub use error::RegistryError;
pub use import::{ImportJobTracker, DEFAULT_JOB_TTL_SECS};
pub use registry::{PassportRegistry, DEFAULT_SKELETON};
pub use seed::demo_passports;
pub use store::{InMemoryPassportStore, PassportMutation, PassportRepository};
pub use verification::{
    CheckOutcome, VerificationCheck, VerificationMode, VerificationResult, VerificationService,
};
pub use view::PassportView;
