//! AI job orchestration
//!
//! - [`JobOrchestrator`]: sequential per-taxonomy runs with cooperative cancel
//! - [`ActiveJobPoller`]: background settlement of tracked jobs

pub mod active_jobs;
pub mod job_orchestrator;

pub use active_jobs::{spawn_refresh_ticker, ActiveJobPoller};
pub use job_orchestrator::{JobOrchestrator, OrchestratorSettings, RunReport};
