//! Double-submission guard
//!
//! Any write for a record is refused while another write for the same record
//! is in flight. Repeating the same action (same record, same kind, same
//! taxonomy for submits) within the throttle window is refused as well, so
//! moving on to the next taxonomy's submit is never throttled.

use crate::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Kind of write a permit is claimed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteAction<'a> {
    /// Submit of one taxonomy's path
    Submit(&'a str),
    Skip,
    Flag,
}

impl WriteAction<'_> {
    fn window_key(&self, record_id: &str) -> String {
        match self {
            WriteAction::Submit(taxonomy_key) => format!("{}/submit/{}", record_id, taxonomy_key),
            WriteAction::Skip => format!("{}/skip", record_id),
            WriteAction::Flag => format!("{}/flag", record_id),
        }
    }
}

#[derive(Debug, Default)]
struct GuardState {
    last_started: HashMap<String, Instant>,
    in_flight: HashSet<String>,
}

/// Per-record throttle shared by every write path of a session
#[derive(Debug, Clone)]
pub struct SubmissionGuard {
    window: Duration,
    state: Arc<Mutex<GuardState>>,
}

impl SubmissionGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Arc::new(Mutex::new(GuardState::default())),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        // State stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the record for one write
    ///
    /// The returned permit releases the in-flight mark when dropped.
    pub fn try_begin(
        &self,
        record_id: &str,
        action: WriteAction<'_>,
    ) -> EngineResult<SubmissionPermit> {
        let mut state = self.lock();
        let now = Instant::now();
        let window_key = action.window_key(record_id);

        let within_window = state
            .last_started
            .get(&window_key)
            .map(|started| now.duration_since(*started) < self.window)
            .unwrap_or(false);

        if within_window || state.in_flight.contains(record_id) {
            tracing::debug!(record_id, action = ?action, "Submission throttled");
            return Err(EngineError::Throttled(record_id.to_string()));
        }

        state.last_started.insert(window_key, now);
        state.in_flight.insert(record_id.to_string());

        Ok(SubmissionPermit {
            record_id: record_id.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    pub fn is_in_flight(&self, record_id: &str) -> bool {
        self.lock().in_flight.contains(record_id)
    }
}

/// In-flight claim on one record
#[derive(Debug)]
pub struct SubmissionPermit {
    record_id: String,
    state: Arc<Mutex<GuardState>>,
}

impl Drop for SubmissionPermit {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.in_flight.remove(&self.record_id);
    }
}
