//! Selected labels: the ephemeral, per-session label path entries

use super::taxonomy::{TaxonomyNode, UNKNOWN_CODE, UNKNOWN_LABEL};
use serde::{Deserialize, Serialize};

/// Who produced a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    User,
    Ai,
}

/// One entry of a label path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedLabel {
    pub level: u32,
    pub node_code: String,
    pub taxonomy_key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub is_leaf: bool,
    pub source: LabelSource,
    #[serde(default)]
    pub confidence_score: Option<f32>,
}

impl SelectedLabel {
    /// Label for a taxonomy node
    pub fn from_node(node: &TaxonomyNode, taxonomy_key: &str, source: LabelSource) -> Self {
        Self {
            level: node.level,
            node_code: node.code.clone(),
            taxonomy_key: taxonomy_key.to_string(),
            label: Some(node.label.clone()),
            definition: node.definition.clone(),
            examples: node.examples.clone(),
            is_leaf: node.is_leaf,
            source,
            confidence_score: None,
        }
    }

    /// Unknown marker at `level`; always a leaf
    pub fn unknown(level: u32, taxonomy_key: &str) -> Self {
        Self {
            level,
            node_code: UNKNOWN_CODE.to_string(),
            taxonomy_key: taxonomy_key.to_string(),
            label: Some(UNKNOWN_LABEL.to_string()),
            definition: None,
            examples: None,
            is_leaf: true,
            source: LabelSource::User,
            confidence_score: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.node_code == UNKNOWN_CODE
    }

    pub fn is_ai(&self) -> bool {
        self.source == LabelSource::Ai
    }

    /// Leaf, Unknown marker, or at/after the taxonomy's max depth
    pub fn is_terminal(&self, max_depth: u32) -> bool {
        self.is_leaf || self.is_unknown() || self.level >= max_depth
    }

    /// `(level, code)` identity used for path comparison
    pub fn key(&self) -> (u32, &str) {
        (self.level, self.node_code.as_str())
    }
}

/// Sort by level and keep one label per level (the last one wins)
pub fn normalize_labels(mut labels: Vec<SelectedLabel>) -> Vec<SelectedLabel> {
    labels.reverse();
    // stable sort keeps the later entry first within a level
    labels.sort_by_key(|l| l.level);
    labels.dedup_by_key(|l| l.level);
    labels
}

/// True when levels are exactly `1..=k` for some `k >= 0`
pub fn is_contiguous(labels: &[SelectedLabel]) -> bool {
    labels
        .iter()
        .enumerate()
        .all(|(idx, label)| label.level == idx as u32 + 1)
}

/// Deepest label by level
pub fn deepest(labels: &[SelectedLabel]) -> Option<&SelectedLabel> {
    labels.iter().max_by_key(|l| l.level)
}
