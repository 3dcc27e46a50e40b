//! annota-engine library interface
//!
//! Labeling interaction engine: hierarchical label path selection, AI
//! suggestion reconciliation, completion tracking and sequential AI job
//! orchestration. Transport lives behind the traits in [`services`].

pub mod config;
pub mod completion;
pub mod error;
pub mod labeling;
pub mod models;
pub mod orchestrator;
pub mod reconcile;
pub mod selection;
pub mod services;

pub use crate::config::EngineConfig;
pub use crate::error::{EngineError, EngineResult};
pub use crate::labeling::{LabelingSession, LabelingSettings, SubmitAdvance};
pub use crate::orchestrator::{ActiveJobPoller, JobOrchestrator, OrchestratorSettings, RunReport};
