//! Taxonomy and taxonomy node models
//!
//! Nodes are immutable and owned by the taxonomy service; the engine fetches
//! them on demand and never caches them beyond the current view.

use serde::{Deserialize, Serialize};

/// Reserved node code meaning "cannot classify beyond this point"
pub const UNKNOWN_CODE: &str = "UNKNOWN";

/// Display label of the Unknown marker
pub const UNKNOWN_LABEL: &str = "Unknown";

/// One node of a taxonomy tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub code: String,
    pub label: String,
    /// Depth in the tree, 1-indexed from the root
    pub level: u32,
    /// Code of the parent node, `None` at level 1
    #[serde(default)]
    pub parent_code: Option<String>,
    #[serde(default)]
    pub is_leaf: bool,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub examples: Option<String>,
}

impl TaxonomyNode {
    /// Terminal nodes end a label path: leaves, or anything at max depth
    pub fn is_terminal(&self, max_depth: u32) -> bool {
        self.is_leaf || self.level >= max_depth
    }
}

/// Sync state of a taxonomy with the AI backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Completed,
    Success,
    Pending,
    Syncing,
    Failed,
    #[default]
    #[serde(other)]
    NotSynced,
}

impl SyncStatus {
    /// Only `completed`/`success` allow AI jobs for the taxonomy
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Success)
    }
}

/// A fixed-depth classification tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub max_depth: u32,
    /// Names of levels 1..=max_depth, in order
    #[serde(default)]
    pub level_names: Option<Vec<String>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

fn default_active() -> bool {
    true
}

impl Taxonomy {
    pub fn new(key: impl Into<String>, max_depth: u32) -> Self {
        Self {
            key: key.into(),
            display_name: None,
            max_depth,
            level_names: None,
            is_active: true,
            sync_status: SyncStatus::NotSynced,
        }
    }

    pub fn with_sync_status(mut self, status: SyncStatus) -> Self {
        self.sync_status = status;
        self
    }

    /// Name shown to operators (display name, else key)
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.key)
    }

    /// Display name of a level, falling back to "Level N"
    pub fn level_name(&self, level: u32) -> String {
        self.level_names
            .as_ref()
            .and_then(|names| names.get(level.checked_sub(1)? as usize))
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Level {}", level))
    }
}
