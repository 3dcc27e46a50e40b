//! Completion tracking and the submission workflow

pub mod guard;
pub mod tracker;
pub mod working_set;

pub use guard::{SubmissionGuard, SubmissionPermit, WriteAction};
pub use tracker::{can_submit, is_taxonomy_complete, CompletionSnapshot, CompletionTracker};
pub use working_set::WorkingSet;
