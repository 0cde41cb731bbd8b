//! # Import Job Lifecycle
//!
//! Bulk-import submissions are tracked as jobs, independently of passports.
//!
//! ```text
//! submit ──► PendingProcessing ──► Processing ──┬──► Completed
//!                                               └──► Failed
//! ```
//!
//! Parsing and ingestion happen in an external pipeline; this module only
//! owns the record and the legal transitions between its states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TransitionError, ValidationError};
use crate::identity::JobId;

/// Import job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ImportJobStatus {
    /// Accepted and queued for the ingestion pipeline.
    PendingProcessing,
    /// Picked up by the ingestion pipeline.
    Processing,
    /// Ingestion finished. Terminal.
    Completed,
    /// Ingestion aborted. Terminal.
    Failed,
}

impl ImportJobStatus {
    /// The wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingProcessing => "PendingProcessing",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self → to` is a legal edge.
    pub fn can_transition_to(&self, to: ImportJobStatus) -> bool {
        matches!(
            (self, to),
            (Self::PendingProcessing, Self::Processing)
                | (Self::PendingProcessing, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl std::fmt::Display for ImportJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome counters reported by the ingestion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImportResultSummary {
    /// Records read from the payload.
    pub processed: u64,
    /// Records turned into passports.
    pub succeeded: u64,
    /// Records rejected.
    pub failed: u64,
    /// Per-record error messages.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// A tracked bulk-import submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImportJob {
    /// Unique job identifier.
    pub job_id: JobId,
    /// Current status.
    pub status: ImportJobStatus,
    /// File type declared by the submitter (e.g. "csv").
    pub file_type_received: String,
    /// Free-text origin of the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_description: Option<String>,
    /// Size of the opaque payload as received, in bytes.
    pub payload_bytes: u64,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
    /// Present once the pipeline reports back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<ImportResultSummary>,
}

impl ImportJob {
    /// Create a job in `PendingProcessing`.
    ///
    /// `file_type` must be non-blank; it is stored lowercased.
    pub fn submit(
        file_type: &str,
        source_description: Option<String>,
        payload_bytes: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let file_type = file_type.trim();
        if file_type.is_empty() {
            return Err(ValidationError::MissingField("fileType".to_string()));
        }
        Ok(Self {
            job_id: JobId::generate(),
            status: ImportJobStatus::PendingProcessing,
            file_type_received: file_type.to_ascii_lowercase(),
            source_description: source_description
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            payload_bytes,
            submitted_at: now,
            updated_at: now,
            result_summary: None,
        })
    }

    /// Move to `to`, recording `summary` when provided.
    pub fn transition(
        &mut self,
        to: ImportJobStatus,
        summary: Option<ImportResultSummary>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        if summary.is_some() {
            self.result_summary = summary;
        }
        Ok(())
    }
}
