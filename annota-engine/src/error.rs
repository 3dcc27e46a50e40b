//! Error types for annota-engine
//!
//! Severity follows the labeling workflow:
//! - Validation/Throttled: rejected locally, nothing sent to the backend
//! - Precondition/Conflict: an orchestration run never started
//! - JobCreation: fatal to the current run
//! - JobTimeout: per-taxonomy, the run continues

use crate::selection::PathError;
use crate::services::ServiceError;
use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation rejected client-side before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Label path operation would break path invariants
    #[error("Invalid label path: {0}")]
    Path(#[from] PathError),

    /// Repeated submit/skip/flag inside the throttle window
    #[error("Submission for record {0} throttled")]
    Throttled(String),

    /// Orchestration preconditions not met
    #[error("Cannot start AI labeling: {0}")]
    Precondition(String),

    /// Active taxonomies not yet synced with the AI backend
    #[error("Taxonomies not synced: {}", .0.join(", "))]
    UnsyncedTaxonomies(Vec<String>),

    /// Job creation failed; the orchestration run was aborted
    #[error("Job creation failed for taxonomy {taxonomy_key}: {source}")]
    JobCreation {
        taxonomy_key: String,
        #[source]
        source: ServiceError,
    },

    /// Job never reached a terminal status within the poll budget
    #[error("Job {job_id} for taxonomy {taxonomy_key} timed out after {attempts} polls")]
    JobTimeout {
        taxonomy_key: String,
        job_id: String,
        attempts: u32,
    },

    /// Conflicting operation already running (409-style)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend call failed
    #[error("Backend error: {0}")]
    Backend(#[from] ServiceError),

    /// No further record in the working set
    #[error("Working set exhausted")]
    WorkingSetExhausted,

    /// annota-common error
    #[error("Common error: {0}")]
    Common(#[from] annota_common::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
