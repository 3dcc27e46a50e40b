//! Data models for annota-engine
//!
//! - Taxonomies and nodes (read-only, fetched on demand)
//! - Selected labels (ephemeral path entries)
//! - Records, annotations and the submission contract
//! - AI jobs and their outcomes

pub mod job;
pub mod label;
pub mod record;
pub mod taxonomy;

pub use job::{AiJob, JobOutcome, JobStatus, TaxonomyOutcome};
pub use label::{LabelSource, SelectedLabel};
pub use record::{
    Annotation, AnnotationInput, Record, RecordStatus, SubmissionRequest, SubmissionResponse,
};
pub use taxonomy::{SyncStatus, Taxonomy, TaxonomyNode, UNKNOWN_CODE, UNKNOWN_LABEL};
