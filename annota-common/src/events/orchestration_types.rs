//! AI orchestration type definitions
//!
//! Supporting types for orchestration progress shared between the run that
//! produces them and every view that renders them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress descriptor for one orchestration run
///
/// Tagged with the session id so a descriptor left behind by an earlier run
/// (e.g. after a reload mid-run) is never attributed to the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationProgress {
    /// Session that owns the run
    pub session_id: Uuid,
    /// Taxonomy whose job is currently dispatched or polled
    pub current: String,
    /// Taxonomies still waiting, in dispatch order
    pub remaining: Vec<String>,
    /// Taxonomies already finished in this run (any outcome)
    #[serde(default)]
    pub finished: Vec<String>,
    /// Number of records in the batch
    pub record_count: usize,
    /// When the run started
    pub started_at: DateTime<Utc>,
}

impl OrchestrationProgress {
    /// Total taxonomies in the run
    pub fn total(&self) -> usize {
        self.finished.len() + 1 + self.remaining.len()
    }

    /// Percentage of taxonomies finished (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.finished.len() as f64 / total as f64) * 100.0
        }
    }
}

/// Terminal outcome of one taxonomy's AI job, as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcomeKind {
    Completed,
    Failed,
    Cancelled,
    /// Poll attempts exhausted before a terminal status was seen
    TimedOut,
}

impl std::fmt::Display for JobOutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobOutcomeKind::Completed => "completed",
            JobOutcomeKind::Failed => "failed",
            JobOutcomeKind::Cancelled => "cancelled",
            JobOutcomeKind::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}
