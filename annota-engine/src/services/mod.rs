//! External service seams consumed by the labeling engine
//!
//! The engine is agnostic to transport: everything it needs from the backend
//! goes through these traits. `BackendClient` implements all of them over
//! JSON/HTTP; tests substitute in-memory fakes.

pub mod backend_client;

pub use backend_client::BackendClient;

use crate::models::{
    AiJob, JobStatus, SubmissionRequest, SubmissionResponse, Taxonomy, TaxonomyNode,
};
use async_trait::async_trait;
use thiserror::Error;

/// Backend service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Response was well-formed but lacked a required field
    #[error("Missing field in response: {0}")]
    MissingField(&'static str),
}

/// Taxonomy node lookup
#[async_trait]
pub trait NodeLookup: Send + Sync {
    /// Ordered nodes at `level` under `parent_code` (`None` = no parent constraint)
    async fn nodes_at_level(
        &self,
        taxonomy_key: &str,
        level: u32,
        parent_code: Option<&str>,
    ) -> Result<Vec<TaxonomyNode>, ServiceError>;

    /// Ranked matches across all levels
    async fn search_nodes(
        &self,
        taxonomy_key: &str,
        query: &str,
    ) -> Result<Vec<TaxonomyNode>, ServiceError>;
}

/// Annotation submission (submit, skip, flag)
#[async_trait]
pub trait AnnotationSubmission: Send + Sync {
    async fn submit(&self, request: &SubmissionRequest)
        -> Result<SubmissionResponse, ServiceError>;
}

/// AI job lifecycle
#[async_trait]
pub trait AiJobService: Send + Sync {
    /// Create a job, returning its id
    async fn create_job(
        &self,
        taxonomy_key: &str,
        sentence_ids: &[String],
    ) -> Result<String, ServiceError>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError>;

    async fn list_jobs_by_status(&self, statuses: &[JobStatus])
        -> Result<Vec<AiJob>, ServiceError>;
}

/// Taxonomy catalogue with per-taxonomy sync state
#[async_trait]
pub trait TaxonomySyncState: Send + Sync {
    /// All taxonomies in display order
    async fn taxonomies(&self) -> Result<Vec<Taxonomy>, ServiceError>;
}

/// Reloads the record list so newly written annotations become visible
///
/// Refreshing never fails from the caller's point of view; implementations
/// log their own errors.
#[async_trait]
pub trait RecordRefresher: Send + Sync {
    async fn refresh_records(&self);
}

/// Refreshing through the session context broadcasts a request to every view
#[async_trait]
impl RecordRefresher for annota_common::SessionContext {
    async fn refresh_records(&self) {
        tracing::debug!(session_id = %self.session_id(), "Record list refresh requested");
        self.emit(annota_common::events::AnnotaEvent::RecordsRefreshRequested {
            session_id: self.session_id(),
            timestamp: chrono::Utc::now(),
        });
    }
}
