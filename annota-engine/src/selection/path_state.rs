//! Label path state machine for one record+taxonomy pair
//!
//! Pure and synchronous: every mutation is applied immediately so completion
//! is always evaluated against the latest path. Fetching nodes and running
//! searches live in [`super::path_selector`].
//!
//! Invariant: levels of the label path are exactly `1..=k` for some `k >= 0`.
//! Labels loaded from a record are normalized (sorted, one per level) but not
//! gap-filled; every operation here rejects a selection that would leave a
//! shallower level unset.

use crate::models::label::{is_contiguous, normalize_labels};
use crate::models::{LabelSource, SelectedLabel, Taxonomy, TaxonomyNode};
use thiserror::Error;

/// Label path operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("level {level} outside 1..={max_depth}")]
    LevelOutOfRange { level: u32, max_depth: u32 },

    #[error("cannot select level {level} while level {missing} is unset")]
    LevelGap { level: u32, missing: u32 },

    #[error("search path is empty")]
    EmptyPath,

    #[error("search path breaks at level {level}")]
    BrokenChain { level: u32 },

    #[error("node {code} at level {level} has no parent code")]
    MissingParent { code: String, level: u32 },

    #[error("parent {parent_code} of {code} not found at level {level}")]
    ParentNotFound {
        code: String,
        parent_code: String,
        level: u32,
    },
}

/// Browse position: the level being listed and the parent it is listed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub level: u32,
    pub parent: Option<String>,
}

impl Position {
    pub fn root() -> Self {
        Self {
            level: 1,
            parent: None,
        }
    }
}

/// Navigation mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    /// Listing nodes at `level` under `parent`
    Browsing(Position),
    /// Cross-level search; `resume` is restored when the search is abandoned
    Searching { query: String, resume: Position },
}

/// Ancestor drilled into on the way to the current position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbEntry {
    pub level: u32,
    pub code: String,
    pub label: String,
}

impl From<&TaxonomyNode> for BreadcrumbEntry {
    fn from(node: &TaxonomyNode) -> Self {
        Self {
            level: node.level,
            code: node.code.clone(),
            label: node.label.clone(),
        }
    }
}

impl From<&SelectedLabel> for BreadcrumbEntry {
    fn from(label: &SelectedLabel) -> Self {
        Self {
            level: label.level,
            code: label.node_code.clone(),
            label: label.label.clone().unwrap_or_else(|| label.node_code.clone()),
        }
    }
}

/// Navigation state plus the label path of one taxonomy on one record
#[derive(Debug, Clone)]
pub struct PathState {
    taxonomy: Taxonomy,
    labels: Vec<SelectedLabel>,
    nav: NavState,
    breadcrumb: Vec<BreadcrumbEntry>,
}

impl PathState {
    /// Empty path at the taxonomy root
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self {
            taxonomy,
            labels: Vec::new(),
            nav: NavState::Browsing(Position::root()),
            breadcrumb: Vec::new(),
        }
    }

    /// Path initialised from a loaded label set
    pub fn with_labels(taxonomy: Taxonomy, labels: Vec<SelectedLabel>) -> Self {
        let mut state = Self::new(taxonomy);
        state.replace_labels(labels);
        state
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn labels(&self) -> &[SelectedLabel] {
        &self.labels
    }

    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    pub fn breadcrumb(&self) -> &[BreadcrumbEntry] {
        &self.breadcrumb
    }

    /// Browse position (the suspended one while searching)
    pub fn position(&self) -> &Position {
        match &self.nav {
            NavState::Browsing(position) => position,
            NavState::Searching { resume, .. } => resume,
        }
    }

    pub fn current_level(&self) -> u32 {
        self.position().level
    }

    pub fn current_parent(&self) -> Option<&str> {
        self.position().parent.as_deref()
    }

    pub fn search_query(&self) -> Option<&str> {
        match &self.nav {
            NavState::Searching { query, .. } => Some(query),
            NavState::Browsing(_) => None,
        }
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.nav, NavState::Searching { .. })
    }

    pub fn is_contiguous(&self) -> bool {
        is_contiguous(&self.labels)
    }

    /// Deepest label is a leaf, an Unknown marker, or at max depth
    pub fn is_terminal(&self) -> bool {
        self.labels
            .last()
            .map(|l| l.is_terminal(self.taxonomy.max_depth))
            .unwrap_or(false)
    }

    // ========================================
    // Reducers
    // ========================================

    /// Select a node: drop every label at `level >= node.level`, append the node
    ///
    /// Non-terminal nodes advance browsing one level down under the node;
    /// terminal nodes keep the position at their own level.
    pub fn select_node(&mut self, node: &TaxonomyNode) -> Result<(), PathError> {
        self.check_level(node.level)?;
        self.check_prefix(node.level)?;

        self.truncate_from(node.level);
        self.labels.push(SelectedLabel::from_node(
            node,
            &self.taxonomy.key,
            LabelSource::User,
        ));

        let position = if node.is_terminal(self.taxonomy.max_depth) {
            Position {
                level: node.level,
                parent: node.parent_code.clone(),
            }
        } else {
            self.breadcrumb.push(BreadcrumbEntry::from(node));
            Position {
                level: node.level + 1,
                parent: Some(node.code.clone()),
            }
        };
        self.nav = NavState::Browsing(position);
        Ok(())
    }

    /// Insert the Unknown marker at the current level
    ///
    /// Same cascade as [`select_node`](Self::select_node); always terminal,
    /// never advances depth.
    pub fn select_unknown(&mut self) -> Result<(), PathError> {
        let position = self.position().clone();
        self.check_level(position.level)?;
        self.check_prefix(position.level)?;

        self.truncate_from(position.level);
        self.labels
            .push(SelectedLabel::unknown(position.level, &self.taxonomy.key));
        self.nav = NavState::Browsing(position);
        Ok(())
    }

    /// Remove the label at `level` and every deeper label
    ///
    /// Returns `false` (and changes nothing) if no label at `>= level` exists.
    pub fn delete_label(&mut self, level: u32) -> bool {
        if !self.labels.iter().any(|l| l.level >= level) {
            return false;
        }
        self.truncate_from(level);
        self.rebuild_breadcrumb();
        self.nav = NavState::Browsing(self.resting_position());
        true
    }

    /// Pop the last breadcrumb entry; empty breadcrumb falls back to the root
    ///
    /// Navigation only: the label path is untouched.
    pub fn navigate_up(&mut self) {
        self.breadcrumb.pop();
        let position = match self.breadcrumb.last() {
            Some(entry) => Position {
                level: entry.level + 1,
                parent: Some(entry.code.clone()),
            },
            None => Position::root(),
        };
        self.nav = NavState::Browsing(position);
    }

    /// Enter (or update) search mode, remembering the browse position
    pub fn begin_search(&mut self, query: impl Into<String>) {
        let resume = self.position().clone();
        self.nav = NavState::Searching {
            query: query.into(),
            resume,
        };
    }

    /// Leave search mode without selecting anything
    pub fn clear_search(&mut self) {
        if let NavState::Searching { resume, .. } = &self.nav {
            self.nav = NavState::Browsing(resume.clone());
        }
    }

    /// Replace the whole path with a root-to-node chain found by search
    ///
    /// `path` must run from level 1 down, each node the child of the previous.
    /// The breadcrumb is rebuilt from the chain; the query is cleared.
    pub fn apply_search_path(&mut self, path: &[TaxonomyNode]) -> Result<(), PathError> {
        if path.is_empty() {
            return Err(PathError::EmptyPath);
        }
        for (idx, node) in path.iter().enumerate() {
            self.check_level(node.level)?;
            if node.level != idx as u32 + 1 {
                return Err(PathError::BrokenChain { level: node.level });
            }
            if idx > 0 && node.parent_code.as_deref() != Some(path[idx - 1].code.as_str()) {
                return Err(PathError::BrokenChain { level: node.level });
            }
        }

        self.labels = path
            .iter()
            .map(|node| SelectedLabel::from_node(node, &self.taxonomy.key, LabelSource::User))
            .collect();
        self.rebuild_breadcrumb();
        self.nav = NavState::Browsing(self.resting_position());
        Ok(())
    }

    /// Replace the whole path (e.g. restoring an AI snapshot); clears search
    pub fn replace_labels(&mut self, labels: Vec<SelectedLabel>) {
        self.labels = normalize_labels(labels);
        self.rebuild_breadcrumb();
        self.nav = NavState::Browsing(self.resting_position());
    }

    // ========================================
    // Helpers
    // ========================================

    fn check_level(&self, level: u32) -> Result<(), PathError> {
        if level == 0 || level > self.taxonomy.max_depth {
            return Err(PathError::LevelOutOfRange {
                level,
                max_depth: self.taxonomy.max_depth,
            });
        }
        Ok(())
    }

    /// Levels `1..level` must all be set
    fn check_prefix(&self, level: u32) -> Result<(), PathError> {
        match (1..level).find(|lv| !self.labels.iter().any(|l| l.level == *lv)) {
            Some(missing) => Err(PathError::LevelGap { level, missing }),
            None => Ok(()),
        }
    }

    fn truncate_from(&mut self, level: u32) {
        self.labels.retain(|l| l.level < level);
        self.breadcrumb.retain(|b| b.level < level);
    }

    /// Breadcrumb = the non-terminal labels of the path
    fn rebuild_breadcrumb(&mut self) {
        let max_depth = self.taxonomy.max_depth;
        self.breadcrumb = self
            .labels
            .iter()
            .filter(|l| !l.is_terminal(max_depth))
            .map(BreadcrumbEntry::from)
            .collect();
    }

    /// Where browsing rests for the current path
    ///
    /// Below the deepest label if it is non-terminal, at its level otherwise.
    fn resting_position(&self) -> Position {
        let max_depth = self.taxonomy.max_depth;
        match self.labels.last() {
            None => Position::root(),
            Some(deepest) if deepest.is_terminal(max_depth) => {
                let parent = self
                    .labels
                    .iter()
                    .rev()
                    .find(|l| l.level + 1 == deepest.level)
                    .map(|l| l.node_code.clone());
                Position {
                    level: deepest.level,
                    parent,
                }
            }
            Some(deepest) => Position {
                level: deepest.level + 1,
                parent: Some(deepest.node_code.clone()),
            },
        }
    }
}
