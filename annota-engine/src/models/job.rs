//! AI labeling job models
//!
//! Job lifecycle is owned by the backend job runner; the engine only observes
//! it by polling.

use annota_common::events::JobOutcomeKind;
use serde::{Deserialize, Serialize};

/// Backend job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Statuses the active-job poller treats as "still running"
    pub const ACTIVE: [JobStatus; 2] = [JobStatus::Pending, JobStatus::Processing];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

/// One AI job as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiJob {
    pub id: String,
    #[serde(default)]
    pub taxonomy_key: Option<String>,
    #[serde(default)]
    pub sentence_ids: Vec<String>,
    pub status: JobStatus,
}

/// How one taxonomy's job ended from the orchestrator's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    Cancelled,
    /// Poll budget exhausted without a terminal status
    TimedOut { attempts: u32 },
}

impl JobOutcome {
    /// Outcome for a terminal status; `None` for pending/processing
    pub fn from_status(status: JobStatus) -> Option<Self> {
        match status {
            JobStatus::Completed => Some(JobOutcome::Completed),
            JobStatus::Failed => Some(JobOutcome::Failed),
            JobStatus::Cancelled => Some(JobOutcome::Cancelled),
            JobStatus::Pending | JobStatus::Processing => None,
        }
    }

    pub fn kind(&self) -> JobOutcomeKind {
        match self {
            JobOutcome::Completed => JobOutcomeKind::Completed,
            JobOutcome::Failed => JobOutcomeKind::Failed,
            JobOutcome::Cancelled => JobOutcomeKind::Cancelled,
            JobOutcome::TimedOut { .. } => JobOutcomeKind::TimedOut,
        }
    }
}

/// Outcome of one taxonomy within an orchestration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyOutcome {
    pub taxonomy_key: String,
    pub job_id: String,
    pub outcome: JobOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(JobOutcome::from_status(JobStatus::Processing), None);
        assert_eq!(
            JobOutcome::from_status(JobStatus::Failed),
            Some(JobOutcome::Failed)
        );
        assert_eq!(
            JobOutcome::TimedOut { attempts: 3 }.kind(),
            JobOutcomeKind::TimedOut
        );
    }
}
