//! # HTTP Middleware
//!
//! - [`envelope`]: JSON error bodies for framework-generated errors.
//! - [`metrics`]: Prometheus request metrics.
//! - [`rate_limit`]: fixed-window per-peer request limits.

pub mod envelope;
pub mod metrics;
pub mod rate_limit;
