//! Records (sentences), persisted annotations and the submission contract

use super::label::{normalize_labels, LabelSource, SelectedLabel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Review status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Pending,
    Submitted,
    Skipped,
}

/// Durable counterpart of a selected label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub level: u32,
    pub node_code: String,
    pub taxonomy_key: String,
    pub source: LabelSource,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub confidence_score: Option<f32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub is_leaf: bool,
}

impl Annotation {
    /// Persisted form of a submitted label
    pub fn from_label(label: &SelectedLabel, created_at: DateTime<Utc>) -> Self {
        Self {
            level: label.level,
            node_code: label.node_code.clone(),
            taxonomy_key: label.taxonomy_key.clone(),
            source: label.source,
            created_by: None,
            created_at,
            confidence_score: label.confidence_score,
            label: label.label.clone(),
            is_leaf: label.is_leaf,
        }
    }
}

/// A text record to be labelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
            status: RecordStatus::Pending,
            flagged: false,
            annotations: Vec::new(),
        }
    }

    /// Initial label set of one taxonomy, normalized by level
    pub fn labels_for(&self, taxonomy_key: &str) -> Vec<SelectedLabel> {
        let labels = self
            .annotations
            .iter()
            .filter(|a| a.taxonomy_key == taxonomy_key)
            .map(|a| SelectedLabel {
                level: a.level,
                node_code: a.node_code.clone(),
                taxonomy_key: a.taxonomy_key.clone(),
                label: a.label.clone(),
                definition: None,
                examples: None,
                is_leaf: a.is_leaf,
                source: a.source,
                confidence_score: a.confidence_score,
            })
            .collect();
        normalize_labels(labels)
    }

    /// Replace (never merge) the annotations of one taxonomy
    pub fn replace_annotations(&mut self, taxonomy_key: &str, annotations: Vec<Annotation>) {
        self.annotations.retain(|a| a.taxonomy_key != taxonomy_key);
        self.annotations.extend(annotations);
    }
}

/// Annotation as sent on submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationInput {
    pub level: u32,
    pub node_code: String,
    pub taxonomy_key: String,
    pub source: LabelSource,
    #[serde(default)]
    pub confidence_score: Option<f32>,
}

impl From<&SelectedLabel> for AnnotationInput {
    fn from(label: &SelectedLabel) -> Self {
        Self {
            level: label.level,
            node_code: label.node_code.clone(),
            taxonomy_key: label.taxonomy_key.clone(),
            source: label.source,
            confidence_score: label.confidence_score,
        }
    }
}

/// Submit / skip / flag request for one record
///
/// `taxonomy_key = None` leaves every taxonomy's annotations untouched
/// (flag toggle) unless `status` is `skipped`, which clears them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub record_id: String,
    pub status: RecordStatus,
    pub taxonomy_key: Option<String>,
    pub annotations: Vec<AnnotationInput>,
    pub flagged: bool,
    pub labeling_started_at: DateTime<Utc>,
}

/// Backend answer to a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub status: RecordStatus,
    #[serde(default)]
    pub completed_taxonomies: Vec<String>,
    #[serde(default)]
    pub all_completed: bool,
}
