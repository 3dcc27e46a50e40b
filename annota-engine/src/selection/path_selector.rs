//! Async side of taxonomy navigation: level listings, search, ancestry
//!
//! All path mutations go through [`PathState`]; this type only fetches the
//! nodes those mutations need.

use super::path_state::{PathError, PathState};
use crate::error::{EngineError, EngineResult};
use crate::models::TaxonomyNode;
use crate::services::NodeLookup;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shown when a level has no nodes at all
pub const EMPTY_LEVEL_HINT: &str = "No labels at this level. Import the taxonomy first.";

/// Node list for the current browse position
#[derive(Debug, Clone, PartialEq)]
pub enum LevelListing {
    Nodes(Vec<TaxonomyNode>),
    /// Explicit empty view state (not an error)
    Empty { hint: &'static str },
}

impl LevelListing {
    fn from_nodes(nodes: Vec<TaxonomyNode>) -> Self {
        if nodes.is_empty() {
            LevelListing::Empty {
                hint: EMPTY_LEVEL_HINT,
            }
        } else {
            LevelListing::Nodes(nodes)
        }
    }

    pub fn nodes(&self) -> &[TaxonomyNode] {
        match self {
            LevelListing::Nodes(nodes) => nodes,
            LevelListing::Empty { .. } => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LevelListing::Empty { .. })
    }
}

/// Search-as-you-type tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub debounce: Duration,
    /// Shorter queries clear results without a lookup
    pub min_query_len: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_query_len: 2,
        }
    }
}

/// Taxonomy navigation backed by a node lookup service
pub struct TaxonomyPathSelector {
    lookup: Arc<dyn NodeLookup>,
    search: SearchSettings,
    /// Bumped by every keystroke; a debounced search only runs if still current
    search_generation: AtomicU64,
}

impl TaxonomyPathSelector {
    pub fn new(lookup: Arc<dyn NodeLookup>, search: SearchSettings) -> Self {
        Self {
            lookup,
            search,
            search_generation: AtomicU64::new(0),
        }
    }

    /// Nodes at the current browse position
    ///
    /// Lookup failures are logged and rendered as an empty level.
    pub async fn load_level(&self, state: &PathState) -> LevelListing {
        let taxonomy_key = &state.taxonomy().key;
        let level = state.current_level();
        let parent = state.current_parent();

        match self.lookup.nodes_at_level(taxonomy_key, level, parent).await {
            Ok(nodes) => {
                tracing::debug!(
                    taxonomy = %taxonomy_key,
                    level,
                    parent = ?parent,
                    count = nodes.len(),
                    "Loaded level"
                );
                LevelListing::from_nodes(nodes)
            }
            Err(e) => {
                tracing::warn!(
                    taxonomy = %taxonomy_key,
                    level,
                    parent = ?parent,
                    error = %e,
                    "Node lookup failed, showing empty level"
                );
                LevelListing::from_nodes(Vec::new())
            }
        }
    }

    /// Matches across every level, no level/parent constraint
    ///
    /// Failures are logged and yield no results.
    pub async fn search_across_levels(&self, taxonomy_key: &str, query: &str) -> Vec<TaxonomyNode> {
        match self.lookup.search_nodes(taxonomy_key, query).await {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::warn!(taxonomy = %taxonomy_key, query, error = %e, "Node search failed");
                Vec::new()
            }
        }
    }

    /// Debounced search for one keystroke
    ///
    /// Returns `None` when a later keystroke superseded this one. Queries below
    /// the minimum length return `Some(empty)` immediately.
    pub async fn search_as_you_type(
        &self,
        taxonomy_key: &str,
        query: &str,
    ) -> Option<Vec<TaxonomyNode>> {
        let ticket = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim();
        if query.chars().count() < self.search.min_query_len {
            return Some(Vec::new());
        }

        tokio::time::sleep(self.search.debounce).await;
        if self.search_generation.load(Ordering::SeqCst) != ticket {
            tracing::trace!(query, "Search superseded");
            return None;
        }

        let results = self.search_across_levels(taxonomy_key, query).await;

        // Drop responses that arrive after a newer keystroke
        if self.search_generation.load(Ordering::SeqCst) != ticket {
            return None;
        }
        Some(results)
    }

    /// Root-to-node chain for a search hit
    ///
    /// Walks up one level at a time: fetch the level `L-1` list and pick the
    /// node whose code equals the child's `parent_code`. A candidate reported
    /// at any other level does not count, so the walk always ends at level 1.
    pub async fn resolve_ancestry(
        &self,
        taxonomy_key: &str,
        node: &TaxonomyNode,
    ) -> EngineResult<Vec<TaxonomyNode>> {
        let mut chain = vec![node.clone()];

        while let Some(child) = chain.last().filter(|n| n.level > 1) {
            let parent_code = child.parent_code.clone().ok_or_else(|| PathError::MissingParent {
                code: child.code.clone(),
                level: child.level,
            })?;
            let parent_level = child.level - 1;
            let child_code = child.code.clone();

            let candidates = self
                .lookup
                .nodes_at_level(taxonomy_key, parent_level, None)
                .await?;
            let parent = candidates
                .into_iter()
                .find(|candidate| candidate.code == parent_code && candidate.level == parent_level)
                .ok_or(PathError::ParentNotFound {
                    code: child_code,
                    parent_code,
                    level: parent_level,
                })?;
            chain.push(parent);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Replace the label path with the chain leading to a search hit
    ///
    /// On any failure the path is left untouched and the error is logged.
    pub async fn select_search_result(
        &self,
        state: &mut PathState,
        node: &TaxonomyNode,
    ) -> EngineResult<()> {
        let taxonomy_key = state.taxonomy().key.clone();

        let applied = match self.resolve_ancestry(&taxonomy_key, node).await {
            Ok(chain) => state.apply_search_path(&chain).map_err(EngineError::from),
            Err(e) => Err(e),
        };

        match &applied {
            Ok(()) => tracing::debug!(
                taxonomy = %taxonomy_key,
                code = %node.code,
                level = node.level,
                "Search result applied"
            ),
            Err(e) => tracing::warn!(
                taxonomy = %taxonomy_key,
                code = %node.code,
                error = %e,
                "Could not resolve search result ancestry, path unchanged"
            ),
        }
        applied
    }
}
