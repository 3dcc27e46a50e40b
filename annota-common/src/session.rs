//! Session-scoped context
//!
//! One `SessionContext` exists per operator session. It carries the session id,
//! the key-value store holding the progress descriptor and job registry, and
//! the event bus every view of the session subscribes to.
//!
//! Writers are read-modify-write without locking across calls: exactly one
//! orchestration run is active per session, other views only read.

use crate::events::{AnnotaEvent, EventBus, OrchestrationProgress, SessionSubscription};
use crate::kv::{KvStore, KvStoreExt};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const PROGRESS_KEY: &str = "annota.orchestration.progress";
const JOB_REGISTRY_PREFIX: &str = "annota.jobs.";

/// Job ids registered against a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct JobRegistry {
    session_id: Uuid,
    job_ids: Vec<String>,
}

/// Shared context for one operator session
#[derive(Clone)]
pub struct SessionContext {
    session_id: Uuid,
    store: Arc<dyn KvStore>,
    events: EventBus,
}

impl SessionContext {
    /// Create a context with a fresh session id
    pub fn new(store: Arc<dyn KvStore>, events: EventBus) -> Self {
        Self::with_session_id(Uuid::new_v4(), store, events)
    }

    /// Create a context for an existing session (e.g. a second view)
    pub fn with_session_id(session_id: Uuid, store: Arc<dyn KvStore>, events: EventBus) -> Self {
        Self {
            session_id,
            store,
            events,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Emit an event on the session bus (lossy: no subscriber is fine)
    pub fn emit(&self, event: AnnotaEvent) {
        self.events.emit_lossy(event);
    }

    /// Subscribe to this session's events only
    pub fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe_session(self.session_id)
    }

    // ========================================
    // Progress descriptor
    // ========================================

    /// Store and broadcast the progress of the current run
    pub fn publish_progress(&self, progress: &OrchestrationProgress) -> Result<()> {
        self.store.set_json(PROGRESS_KEY, progress)?;
        self.emit(AnnotaEvent::OrchestrationProgress {
            session_id: self.session_id,
            progress: progress.clone(),
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Read the stored progress descriptor
    ///
    /// Returns `None` if no run is in progress or the stored descriptor was
    /// written by a different session.
    pub fn read_progress(&self) -> Result<Option<OrchestrationProgress>> {
        let progress: Option<OrchestrationProgress> = self.store.get_json(PROGRESS_KEY)?;
        Ok(progress.filter(|p| p.session_id == self.session_id))
    }

    /// Remove this session's progress descriptor
    pub fn clear_progress(&self) -> Result<()> {
        if self.read_progress()?.is_some() {
            self.store.remove(PROGRESS_KEY)?;
        }
        Ok(())
    }

    // ========================================
    // Job registry
    // ========================================

    fn registry_key(&self) -> String {
        format!("{}{}", JOB_REGISTRY_PREFIX, self.session_id)
    }

    fn load_registry(&self) -> Result<JobRegistry> {
        let registry: Option<JobRegistry> = self.store.get_json(&self.registry_key())?;
        Ok(registry
            .filter(|r| r.session_id == self.session_id)
            .unwrap_or_else(|| JobRegistry {
                session_id: self.session_id,
                job_ids: Vec::new(),
            }))
    }

    /// Register a job id against this session (idempotent)
    pub fn register_job(&self, job_id: &str) -> Result<()> {
        let mut registry = self.load_registry()?;
        if !registry.job_ids.iter().any(|id| id == job_id) {
            registry.job_ids.push(job_id.to_string());
            self.store.set_json(&self.registry_key(), &registry)?;
        }
        Ok(())
    }

    /// Remove a job id from this session's registry
    pub fn unregister_job(&self, job_id: &str) -> Result<()> {
        let mut registry = self.load_registry()?;
        let before = registry.job_ids.len();
        registry.job_ids.retain(|id| id != job_id);
        if registry.job_ids.len() != before {
            self.store.set_json(&self.registry_key(), &registry)?;
        }
        Ok(())
    }

    /// Job ids currently registered, in registration order
    pub fn registered_jobs(&self) -> Result<Vec<String>> {
        Ok(self.load_registry()?.job_ids)
    }
}
