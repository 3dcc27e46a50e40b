//! AI suggestion snapshots and divergence detection
//!
//! The first time a record+taxonomy pair is opened, its AI-sourced labels are
//! frozen into an [`AiSnapshot`]. Later edits are compared against it so the
//! operator can always get the AI suggestion back.

use crate::models::label::{is_contiguous, normalize_labels};
use crate::models::SelectedLabel;
use crate::selection::PathState;
use std::collections::HashMap;

/// Immutable copy of the AI labels a pair was loaded with, sorted by level
#[derive(Debug, Clone, PartialEq)]
pub struct AiSnapshot {
    entries: Vec<SelectedLabel>,
}

impl AiSnapshot {
    /// `None` when the labels contain nothing AI-sourced
    pub fn from_labels(labels: &[SelectedLabel]) -> Option<Self> {
        let ai: Vec<SelectedLabel> = labels.iter().filter(|l| l.is_ai()).cloned().collect();
        if ai.is_empty() {
            return None;
        }
        Some(Self {
            entries: normalize_labels(ai),
        })
    }

    pub fn entries(&self) -> &[SelectedLabel] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live path differs in `{level, code}` content, or lost AI labels
    pub fn is_divergent(&self, live: &[SelectedLabel]) -> bool {
        let live = normalize_labels(live.to_vec());
        let live_keys: Vec<(u32, &str)> = live.iter().map(SelectedLabel::key).collect();
        let snapshot_keys: Vec<(u32, &str)> = self.entries.iter().map(SelectedLabel::key).collect();

        let ai_count = live.iter().filter(|l| l.is_ai()).count();
        live_keys != snapshot_keys || ai_count < self.entries.len()
    }
}

/// Submittable from AI labels alone
///
/// The AI labels must form a contiguous path `1..L` whose label at `L` is
/// terminal. Such a path is never "complete" (completion needs a user label)
/// but may still be submitted.
pub fn is_implicitly_accepted(labels: &[SelectedLabel], max_depth: u32) -> bool {
    let ai = normalize_labels(labels.iter().filter(|l| l.is_ai()).cloned().collect());
    match ai.last() {
        Some(deepest) => is_contiguous(&ai) && deepest.is_terminal(max_depth),
        None => false,
    }
}

/// Per-session snapshot store keyed by `(record_id, taxonomy_key)`
#[derive(Debug, Default)]
pub struct AiAnnotationReconciler {
    /// `None` = pair loaded without AI labels; still counts as captured
    snapshots: HashMap<(String, String), Option<AiSnapshot>>,
}

impl AiAnnotationReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the initial labels of a pair, once per load
    ///
    /// Returns `true` if a snapshot was stored by this call.
    pub fn capture(&mut self, record_id: &str, taxonomy_key: &str, initial: &[SelectedLabel]) -> bool {
        let key = (record_id.to_string(), taxonomy_key.to_string());
        if self.snapshots.contains_key(&key) {
            return false;
        }

        let snapshot = AiSnapshot::from_labels(initial);
        let captured = snapshot.is_some();
        if let Some(snapshot) = &snapshot {
            tracing::debug!(
                record_id,
                taxonomy = %taxonomy_key,
                entries = snapshot.len(),
                "Captured AI snapshot"
            );
        }
        self.snapshots.insert(key, snapshot);
        captured
    }

    pub fn snapshot(&self, record_id: &str, taxonomy_key: &str) -> Option<&AiSnapshot> {
        self.snapshots
            .get(&(record_id.to_string(), taxonomy_key.to_string()))
            .and_then(Option::as_ref)
    }

    /// Whether the restore action should be offered
    pub fn is_divergent(&self, record_id: &str, taxonomy_key: &str, live: &[SelectedLabel]) -> bool {
        self.snapshot(record_id, taxonomy_key)
            .map(|snapshot| snapshot.is_divergent(live))
            .unwrap_or(false)
    }

    /// Replace the live path with the snapshot; clears any active search
    ///
    /// Returns `false` if the pair has no snapshot.
    pub fn restore(&self, record_id: &str, state: &mut PathState) -> bool {
        let taxonomy_key = state.taxonomy().key.clone();
        match self.snapshot(record_id, &taxonomy_key) {
            Some(snapshot) => {
                state.replace_labels(snapshot.entries().to_vec());
                tracing::info!(record_id, taxonomy = %taxonomy_key, "Restored AI suggestion");
                true
            }
            None => false,
        }
    }

    /// Drop one pair so its next load re-captures
    pub fn forget(&mut self, record_id: &str, taxonomy_key: &str) {
        self.snapshots
            .remove(&(record_id.to_string(), taxonomy_key.to_string()));
    }

    /// Drop every pair of a record
    pub fn forget_record(&mut self, record_id: &str) {
        self.snapshots.retain(|(record, _), _| record != record_id);
    }
}
