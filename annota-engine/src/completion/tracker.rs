//! Per-record completion state across active taxonomies
//!
//! Completion and submittability are deliberately asymmetric: a path made of
//! AI labels alone is never *complete*, yet a terminal contiguous AI path may
//! still be *submitted* (implicit accept).

use crate::models::label::deepest;
use crate::models::{LabelSource, SelectedLabel, SubmissionResponse, Taxonomy};
use crate::reconcile::is_implicitly_accepted;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Deepest selected label is user-sourced and terminal
pub fn is_taxonomy_complete(labels: &[SelectedLabel], max_depth: u32) -> bool {
    deepest(labels)
        .map(|label| label.source == LabelSource::User && label.is_terminal(max_depth))
        .unwrap_or(false)
}

/// Complete, or an implicitly accepted AI path
pub fn can_submit(labels: &[SelectedLabel], max_depth: u32) -> bool {
    is_taxonomy_complete(labels, max_depth) || is_implicitly_accepted(labels, max_depth)
}

/// Completion view of one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSnapshot {
    /// Completed taxonomy keys, in taxonomy order
    pub completed_taxonomies: Vec<String>,
    pub all_completed: bool,
}

/// Tracks completion of every active taxonomy for the open record
#[derive(Debug, Clone)]
pub struct CompletionTracker {
    taxonomies: Vec<Taxonomy>,
    labels: HashMap<String, Vec<SelectedLabel>>,
    /// Confirmed complete by the last submission answer; dropped on edit
    server_completed: HashSet<String>,
}

impl CompletionTracker {
    /// Inactive taxonomies are ignored
    pub fn new(taxonomies: &[Taxonomy]) -> Self {
        Self {
            taxonomies: taxonomies.iter().filter(|t| t.is_active).cloned().collect(),
            labels: HashMap::new(),
            server_completed: HashSet::new(),
        }
    }

    pub fn taxonomies(&self) -> &[Taxonomy] {
        &self.taxonomies
    }

    /// Record the latest label path of one taxonomy
    pub fn set_labels(&mut self, taxonomy_key: &str, labels: &[SelectedLabel]) {
        self.server_completed.remove(taxonomy_key);
        self.labels.insert(taxonomy_key.to_string(), labels.to_vec());
    }

    pub fn is_complete(&self, taxonomy_key: &str) -> bool {
        if self.server_completed.contains(taxonomy_key) {
            return true;
        }
        match (
            self.taxonomies.iter().find(|t| t.key == taxonomy_key),
            self.labels.get(taxonomy_key),
        ) {
            (Some(taxonomy), Some(labels)) => is_taxonomy_complete(labels, taxonomy.max_depth),
            _ => false,
        }
    }

    pub fn can_submit(&self, taxonomy_key: &str) -> bool {
        match (
            self.taxonomies.iter().find(|t| t.key == taxonomy_key),
            self.labels.get(taxonomy_key),
        ) {
            (Some(taxonomy), Some(labels)) => can_submit(labels, taxonomy.max_depth),
            _ => false,
        }
    }

    /// No active taxonomies means nothing can be completed
    pub fn snapshot(&self) -> CompletionSnapshot {
        let completed_taxonomies: Vec<String> = self
            .taxonomies
            .iter()
            .filter(|t| self.is_complete(&t.key))
            .map(|t| t.key.clone())
            .collect();
        let all_completed =
            !self.taxonomies.is_empty() && completed_taxonomies.len() == self.taxonomies.len();

        CompletionSnapshot {
            completed_taxonomies,
            all_completed,
        }
    }

    /// Adopt the server's view after a successful submission
    pub fn apply_server(&mut self, response: &SubmissionResponse) {
        self.server_completed = response.completed_taxonomies.iter().cloned().collect();
    }

    /// First incomplete taxonomy after `taxonomy_key`, wrapping around
    ///
    /// `taxonomy_key` itself is considered last.
    pub fn next_incomplete_after(&self, taxonomy_key: &str) -> Option<&Taxonomy> {
        let count = self.taxonomies.len();
        let start = self
            .taxonomies
            .iter()
            .position(|t| t.key == taxonomy_key)
            .map(|idx| idx + 1)
            .unwrap_or(0);

        (0..count)
            .map(|offset| &self.taxonomies[(start + offset) % count])
            .find(|t| !self.is_complete(&t.key))
    }

    /// First incomplete taxonomy in order
    pub fn first_incomplete(&self) -> Option<&Taxonomy> {
        self.taxonomies.iter().find(|t| !self.is_complete(&t.key))
    }
}
