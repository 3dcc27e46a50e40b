//! Event types for the Annota event system
//!
//! Provides shared event definitions and the EventBus used to publish
//! labeling and orchestration activity to every view of a session.

mod orchestration_types;

pub use orchestration_types::{JobOutcomeKind, OrchestrationProgress};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Annota event types
///
/// Every event carries the session id of its producer so subscribers can
/// filter down to the run they are rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnnotaEvent {
    /// Orchestration moved on to a new taxonomy
    ///
    /// Triggers:
    /// - Progress views: render current/remaining taxonomies
    OrchestrationProgress {
        session_id: Uuid,
        progress: OrchestrationProgress,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// AI job created for one taxonomy
    JobDispatched {
        session_id: Uuid,
        taxonomy_key: String,
        job_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// AI job reached a terminal state or its poll budget ran out
    JobFinished {
        session_id: Uuid,
        taxonomy_key: String,
        job_id: String,
        outcome: JobOutcomeKind,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Orchestration run ended
    ///
    /// `error` is set when job creation failed and the run was aborted.
    OrchestrationFinished {
        session_id: Uuid,
        cancelled: bool,
        error: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Tracked jobs left the pending/processing set
    ActiveJobsSettled {
        session_id: Uuid,
        job_ids: Vec<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Record list should be reloaded so new annotations become visible
    RecordsRefreshRequested {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Label path of one record+taxonomy changed
    ///
    /// Triggers:
    /// - Completion recompute, submit button state
    LabelPathChanged {
        session_id: Uuid,
        record_id: String,
        taxonomy_key: String,
        depth: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AnnotaEvent {
    /// Session that produced this event
    pub fn session_id(&self) -> Uuid {
        match self {
            AnnotaEvent::OrchestrationProgress { session_id, .. }
            | AnnotaEvent::JobDispatched { session_id, .. }
            | AnnotaEvent::JobFinished { session_id, .. }
            | AnnotaEvent::OrchestrationFinished { session_id, .. }
            | AnnotaEvent::ActiveJobsSettled { session_id, .. }
            | AnnotaEvent::RecordsRefreshRequested { session_id, .. }
            | AnnotaEvent::LabelPathChanged { session_id, .. } => *session_id,
        }
    }

    /// Event type name (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            AnnotaEvent::OrchestrationProgress { .. } => "OrchestrationProgress",
            AnnotaEvent::JobDispatched { .. } => "JobDispatched",
            AnnotaEvent::JobFinished { .. } => "JobFinished",
            AnnotaEvent::OrchestrationFinished { .. } => "OrchestrationFinished",
            AnnotaEvent::ActiveJobsSettled { .. } => "ActiveJobsSettled",
            AnnotaEvent::RecordsRefreshRequested { .. } => "RecordsRefreshRequested",
            AnnotaEvent::LabelPathChanged { .. } => "LabelPathChanged",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use annota_common::events::{AnnotaEvent, EventBus};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(AnnotaEvent::RecordsRefreshRequested {
///     session_id: Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AnnotaEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<AnnotaEvent> {
        self.tx.subscribe()
    }

    /// Subscribe to future events of a single session
    pub fn subscribe_session(&self, session_id: Uuid) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
            session_id,
        }
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: AnnotaEvent,
    ) -> Result<usize, broadcast::error::SendError<AnnotaEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AnnotaEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Receiver filtered to one session's events
pub struct SessionSubscription {
    rx: broadcast::Receiver<AnnotaEvent>,
    session_id: Uuid,
}

impl SessionSubscription {
    /// Session this subscription follows
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Wait for the next event of this session
    ///
    /// Returns `None` once the bus is closed. Lagged gaps are logged and skipped.
    pub async fn recv(&mut self) -> Option<AnnotaEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.session_id() == self.session_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        skipped = skipped,
                        "Session subscriber lagged, events dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
