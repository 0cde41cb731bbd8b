//! # Import Job Tracker
//!
//! Independent keyed store of bulk-import jobs. Submission records the job in
//! `PendingProcessing`; the payload itself is opaque and handed to an
//! ingestion pipeline outside this crate, which drives later transitions via
//! [`ImportJobTracker::transition`].
//!
//! Jobs are retained for a fixed TTL measured from their last status change.
//! [`ImportJobTracker::evict_expired`] runs on every submission and is also
//! meant to be driven by a periodic background task.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dpp_core::{ImportJob, ImportJobStatus, ImportResultSummary, JobId, ValidationError};
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::RegistryError;

/// Default retention for import jobs.
pub const DEFAULT_JOB_TTL_SECS: i64 = 24 * 60 * 60;

/// Thread-safe, cloneable import job store.
#[derive(Debug, Clone)]
pub struct ImportJobTracker {
    jobs: Arc<RwLock<HashMap<JobId, ImportJob>>>,
    ttl: Duration,
}

impl Default for ImportJobTracker {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_JOB_TTL_SECS))
    }
}

impl ImportJobTracker {
    /// Tracker retaining jobs for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Configured retention.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Accept a submission.
    ///
    /// `file_type` must be non-blank; `data` must be present and non-empty.
    pub fn submit(
        &self,
        file_type: &str,
        data: &Value,
        source_description: Option<String>,
    ) -> Result<ImportJob, RegistryError> {
        let now = Utc::now();
        let job = ImportJob::submit(file_type, source_description, payload_len(data), now)?;
        check_payload(data)?;

        self.evict_expired(now);
        self.jobs.write().insert(job.job_id.clone(), job.clone());
        tracing::info!(
            job_id = %job.job_id,
            file_type = %job.file_type_received,
            payload_bytes = job.payload_bytes,
            "import job submitted"
        );
        Ok(job)
    }

    /// Current state of `job_id`.
    pub fn get_status(&self, job_id: &str) -> Result<ImportJob, RegistryError> {
        let id = JobId::parse(job_id)?;
        self.jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::job_not_found(&id))
    }

    /// Advance `job_id` to `to`. The whole check-and-set runs under one
    /// write lock.
    pub fn transition(
        &self,
        job_id: &str,
        to: ImportJobStatus,
        summary: Option<ImportResultSummary>,
    ) -> Result<ImportJob, RegistryError> {
        let id = JobId::parse(job_id)?;
        let mut guard = self.jobs.write();
        let job = guard
            .get_mut(&id)
            .ok_or_else(|| RegistryError::job_not_found(&id))?;
        job.transition(to, summary, Utc::now())?;
        tracing::info!(job_id = %id, status = %to, "import job transitioned");
        Ok(job.clone())
    }

    /// Store a job as-is (hydration).
    pub fn restore(&self, job: ImportJob) {
        self.jobs.write().insert(job.job_id.clone(), job);
    }

    /// Remove a job that was never made durable. Returns the removed job.
    pub fn discard(&self, job_id: &JobId) -> Option<ImportJob> {
        self.jobs.write().remove(job_id)
    }

    /// Drop jobs whose last change is older than the TTL. Returns how many
    /// were removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.ttl;
        let mut guard = self.jobs.write();
        let before = guard.len();
        guard.retain(|_, job| job.updated_at >= cutoff);
        let evicted = before - guard.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted expired import jobs");
        }
        evicted
    }

    /// Number of retained jobs.
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Whether no jobs are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn payload_len(data: &Value) -> u64 {
    let len = match data {
        Value::String(s) => s.len(),
        other => serde_json::to_vec(other).map(|v| v.len()).unwrap_or(0),
    };
    len as u64
}

fn check_payload(data: &Value) -> Result<(), ValidationError> {
    let empty = match data {
        Value::Null => return Err(ValidationError::MissingField("data".to_string())),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if empty {
        return Err(ValidationError::InvalidField {
            field: "data".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}
