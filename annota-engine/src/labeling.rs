//! Interactive labeling of one working set
//!
//! Owns the open record, one [`PathState`] per active taxonomy, the AI
//! snapshots and the completion tracker. Every label mutation updates the
//! tracker synchronously and announces itself on the session event bus.

use crate::completion::{
    CompletionSnapshot, CompletionTracker, SubmissionGuard, WorkingSet, WriteAction,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Annotation, AnnotationInput, Record, RecordStatus, SubmissionRequest, Taxonomy, TaxonomyNode,
};
use crate::reconcile::AiAnnotationReconciler;
use crate::selection::{LevelListing, PathState, SearchSettings, TaxonomyPathSelector};
use crate::services::{AnnotationSubmission, NodeLookup};
use annota_common::events::AnnotaEvent;
use annota_common::SessionContext;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Labeling session tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelingSettings {
    pub search: SearchSettings,
    pub submit_throttle: Duration,
}

impl Default for LabelingSettings {
    fn default() -> Self {
        Self {
            search: SearchSettings::default(),
            submit_throttle: Duration::from_millis(1000),
        }
    }
}

/// Where navigation goes after a successful submit or skip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAdvance {
    /// Record still incomplete; this taxonomy is now active
    NextTaxonomy(String),
    /// Record done; open this record next
    NextRecord(String),
    /// Record done and it was the last one
    Exhausted,
    /// Server and local completion disagree; stay on the current taxonomy
    Stay,
}

struct OpenRecord {
    record: Record,
    labeling_started_at: DateTime<Utc>,
    paths: HashMap<String, PathState>,
    active_taxonomy: String,
    tracker: CompletionTracker,
}

pub struct LabelingSession {
    context: SessionContext,
    selector: TaxonomyPathSelector,
    submission: Arc<dyn AnnotationSubmission>,
    taxonomies: Vec<Taxonomy>,
    working_set: WorkingSet,
    reconciler: AiAnnotationReconciler,
    guard: SubmissionGuard,
    open: Option<OpenRecord>,
}

impl LabelingSession {
    /// Inactive taxonomies are dropped; order is preserved
    pub fn new(
        context: SessionContext,
        lookup: Arc<dyn NodeLookup>,
        submission: Arc<dyn AnnotationSubmission>,
        taxonomies: Vec<Taxonomy>,
        record_ids: Vec<String>,
        settings: LabelingSettings,
    ) -> Self {
        Self {
            context,
            selector: TaxonomyPathSelector::new(lookup, settings.search),
            submission,
            taxonomies: taxonomies.into_iter().filter(|t| t.is_active).collect(),
            working_set: WorkingSet::new(record_ids),
            reconciler: AiAnnotationReconciler::new(),
            guard: SubmissionGuard::new(settings.submit_throttle),
            open: None,
        }
    }

    pub fn taxonomies(&self) -> &[Taxonomy] {
        &self.taxonomies
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn working_set_mut(&mut self) -> &mut WorkingSet {
        &mut self.working_set
    }

    pub fn reconciler(&self) -> &AiAnnotationReconciler {
        &self.reconciler
    }

    pub fn current_record(&self) -> Option<&Record> {
        self.open.as_ref().map(|open| &open.record)
    }

    pub fn labeling_started_at(&self) -> Option<DateTime<Utc>> {
        self.open.as_ref().map(|open| open.labeling_started_at)
    }

    pub fn active_taxonomy(&self) -> Option<&Taxonomy> {
        let open = self.open.as_ref()?;
        self.taxonomies.iter().find(|t| t.key == open.active_taxonomy)
    }

    /// Path of the active taxonomy
    pub fn path(&self) -> Option<&PathState> {
        let open = self.open.as_ref()?;
        open.paths.get(&open.active_taxonomy)
    }

    pub fn path_for(&self, taxonomy_key: &str) -> Option<&PathState> {
        self.open.as_ref()?.paths.get(taxonomy_key)
    }

    pub fn completion(&self) -> CompletionSnapshot {
        self.open
            .as_ref()
            .map(|open| open.tracker.snapshot())
            .unwrap_or_default()
    }

    /// Submit is enabled for the active taxonomy
    pub fn can_submit(&self) -> bool {
        self.open
            .as_ref()
            .map(|open| open.tracker.can_submit(&open.active_taxonomy))
            .unwrap_or(false)
    }

    /// Restore action should be offered for the active taxonomy
    pub fn is_divergent(&self) -> bool {
        match (self.open.as_ref(), self.path()) {
            (Some(open), Some(path)) => self.reconciler.is_divergent(
                &open.record.id,
                &open.active_taxonomy,
                path.labels(),
            ),
            _ => false,
        }
    }

    // ========================================
    // Record lifecycle
    // ========================================

    /// Open a record of the working set
    ///
    /// Loads each active taxonomy's labels, captures AI snapshots and makes
    /// the first incomplete taxonomy active.
    pub fn open_record(&mut self, record: Record) -> EngineResult<()> {
        if self.taxonomies.is_empty() {
            return Err(EngineError::Validation(
                "no active taxonomies to label".to_string(),
            ));
        }
        if !self.working_set.seek(&record.id) {
            return Err(EngineError::Validation(format!(
                "record {} is not in the working set",
                record.id
            )));
        }

        if let Some(previous) = self.open.take() {
            if previous.record.id != record.id {
                self.reconciler.forget_record(&previous.record.id);
            }
        }

        let mut tracker = CompletionTracker::new(&self.taxonomies);
        let mut paths = HashMap::new();
        for taxonomy in &self.taxonomies {
            let labels = record.labels_for(&taxonomy.key);
            self.reconciler.capture(&record.id, &taxonomy.key, &labels);
            tracker.set_labels(&taxonomy.key, &labels);
            paths.insert(
                taxonomy.key.clone(),
                PathState::with_labels(taxonomy.clone(), labels),
            );
        }

        let active_taxonomy = tracker
            .first_incomplete()
            .unwrap_or(&self.taxonomies[0])
            .key
            .clone();

        tracing::info!(
            session_id = %self.context.session_id(),
            record_id = %record.id,
            taxonomy = %active_taxonomy,
            "Opened record"
        );

        self.open = Some(OpenRecord {
            record,
            labeling_started_at: Utc::now(),
            paths,
            active_taxonomy,
            tracker,
        });
        Ok(())
    }

    /// Make another active taxonomy current
    pub fn switch_taxonomy(&mut self, taxonomy_key: &str) -> EngineResult<()> {
        let open = self.open_mut()?;
        if !open.paths.contains_key(taxonomy_key) {
            return Err(EngineError::Validation(format!(
                "taxonomy {} is not active",
                taxonomy_key
            )));
        }
        open.active_taxonomy = taxonomy_key.to_string();
        Ok(())
    }

    // ========================================
    // Navigation and label mutations
    // ========================================

    /// Node list for the active taxonomy's current position
    pub async fn load_level(&self) -> EngineResult<LevelListing> {
        let path = self
            .path()
            .ok_or_else(|| EngineError::Validation("no record open".to_string()))?;
        Ok(self.selector.load_level(path).await)
    }

    /// Debounced search within the active taxonomy; `None` if superseded
    pub async fn search(&mut self, query: &str) -> EngineResult<Option<Vec<TaxonomyNode>>> {
        let taxonomy_key = {
            let path = self.active_path_mut()?;
            if query.trim().is_empty() {
                path.clear_search();
            } else {
                path.begin_search(query);
            }
            path.taxonomy().key.clone()
        };
        Ok(self.selector.search_as_you_type(&taxonomy_key, query).await)
    }

    pub fn clear_search(&mut self) -> EngineResult<()> {
        self.active_path_mut()?.clear_search();
        Ok(())
    }

    pub fn select_node(&mut self, node: &TaxonomyNode) -> EngineResult<()> {
        self.active_path_mut()?.select_node(node)?;
        self.label_path_changed();
        Ok(())
    }

    pub fn select_unknown(&mut self) -> EngineResult<()> {
        self.active_path_mut()?.select_unknown()?;
        self.label_path_changed();
        Ok(())
    }

    /// `false` when there was nothing to delete
    pub fn delete_label(&mut self, level: u32) -> EngineResult<bool> {
        let deleted = self.active_path_mut()?.delete_label(level);
        if deleted {
            self.label_path_changed();
        }
        Ok(deleted)
    }

    pub fn navigate_up(&mut self) -> EngineResult<()> {
        self.active_path_mut()?.navigate_up();
        Ok(())
    }

    /// Replace the active path with the chain leading to a search hit
    pub async fn select_search_result(&mut self, node: &TaxonomyNode) -> EngineResult<()> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| EngineError::Validation("no record open".to_string()))?;
        let path = open
            .paths
            .get_mut(&open.active_taxonomy)
            .ok_or_else(|| EngineError::Validation("no active taxonomy".to_string()))?;

        self.selector.select_search_result(path, node).await?;
        self.label_path_changed();
        Ok(())
    }

    /// Bring back the AI suggestion; `false` if the pair has none
    pub fn restore_ai(&mut self) -> EngineResult<bool> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| EngineError::Validation("no record open".to_string()))?;
        let record_id = open.record.id.clone();
        let path = open
            .paths
            .get_mut(&open.active_taxonomy)
            .ok_or_else(|| EngineError::Validation("no active taxonomy".to_string()))?;

        let restored = self.reconciler.restore(&record_id, path);
        if restored {
            self.label_path_changed();
        }
        Ok(restored)
    }

    // ========================================
    // Writes
    // ========================================

    /// Submit the active taxonomy's path, replacing its annotations
    ///
    /// Rejected before any network call unless the path is terminal (or an
    /// implicitly accepted AI path).
    pub async fn submit(&mut self) -> EngineResult<SubmitAdvance> {
        let open = self.open_ref()?;
        let record_id = open.record.id.clone();
        let taxonomy_key = open.active_taxonomy.clone();

        if !open.tracker.can_submit(&taxonomy_key) {
            return Err(EngineError::Validation(format!(
                "taxonomy {} has no terminal label path",
                taxonomy_key
            )));
        }

        let labels = open
            .paths
            .get(&taxonomy_key)
            .map(|path| path.labels().to_vec())
            .unwrap_or_default();
        let request = SubmissionRequest {
            record_id: record_id.clone(),
            status: RecordStatus::Submitted,
            taxonomy_key: Some(taxonomy_key.clone()),
            annotations: labels.iter().map(AnnotationInput::from).collect(),
            flagged: open.record.flagged,
            labeling_started_at: open.labeling_started_at,
        };

        let _permit = self.guard.try_begin(&record_id, WriteAction::Submit(&taxonomy_key))?;
        let response = self.submission.submit(&request).await?;

        tracing::info!(
            session_id = %self.context.session_id(),
            record_id = %record_id,
            taxonomy = %taxonomy_key,
            labels = labels.len(),
            all_completed = response.all_completed,
            "Submitted annotations"
        );

        let now = Utc::now();
        let open = self.open_mut()?;
        open.record.replace_annotations(
            &taxonomy_key,
            labels.iter().map(|l| Annotation::from_label(l, now)).collect(),
        );
        open.record.status = response.status;
        open.tracker.apply_server(&response);

        if response.all_completed {
            return Ok(self.advance_record());
        }

        let next = open
            .tracker
            .next_incomplete_after(&taxonomy_key)
            .map(|t| t.key.clone());
        match next {
            Some(next) => {
                open.active_taxonomy = next.clone();
                Ok(SubmitAdvance::NextTaxonomy(next))
            }
            None => Ok(SubmitAdvance::Stay),
        }
    }

    /// Skip the record; its annotations and label paths are cleared
    pub async fn skip(&mut self) -> EngineResult<SubmitAdvance> {
        let open = self.open_ref()?;
        let record_id = open.record.id.clone();
        let request = SubmissionRequest {
            record_id: record_id.clone(),
            status: RecordStatus::Skipped,
            taxonomy_key: None,
            annotations: Vec::new(),
            flagged: open.record.flagged,
            labeling_started_at: open.labeling_started_at,
        };

        let _permit = self.guard.try_begin(&record_id, WriteAction::Skip)?;
        let response = self.submission.submit(&request).await?;

        tracing::info!(
            session_id = %self.context.session_id(),
            record_id = %record_id,
            "Skipped record"
        );

        let open = self.open_mut()?;
        open.record.status = response.status;
        open.record.annotations.clear();
        for (taxonomy_key, path) in open.paths.iter_mut() {
            path.replace_labels(Vec::new());
            open.tracker.set_labels(taxonomy_key, &[]);
        }
        Ok(self.advance_record())
    }

    /// Flip the flag; status and annotations are left as they are
    pub async fn toggle_flag(&mut self) -> EngineResult<bool> {
        let open = self.open_ref()?;
        let record_id = open.record.id.clone();
        let flagged = !open.record.flagged;
        let request = SubmissionRequest {
            record_id: record_id.clone(),
            status: open.record.status,
            taxonomy_key: None,
            annotations: Vec::new(),
            flagged,
            labeling_started_at: open.labeling_started_at,
        };

        let _permit = self.guard.try_begin(&record_id, WriteAction::Flag)?;
        self.submission.submit(&request).await?;

        tracing::debug!(record_id = %record_id, flagged, "Flag toggled");
        self.open_mut()?.record.flagged = flagged;
        Ok(flagged)
    }

    // ========================================
    // Helpers
    // ========================================

    fn open_ref(&self) -> EngineResult<&OpenRecord> {
        self.open
            .as_ref()
            .ok_or_else(|| EngineError::Validation("no record open".to_string()))
    }

    fn open_mut(&mut self) -> EngineResult<&mut OpenRecord> {
        self.open
            .as_mut()
            .ok_or_else(|| EngineError::Validation("no record open".to_string()))
    }

    fn active_path_mut(&mut self) -> EngineResult<&mut PathState> {
        let open = self.open_mut()?;
        open.paths
            .get_mut(&open.active_taxonomy)
            .ok_or_else(|| EngineError::Validation("no active taxonomy".to_string()))
    }

    fn advance_record(&mut self) -> SubmitAdvance {
        match self.working_set.next() {
            Ok(next) => SubmitAdvance::NextRecord(next.to_string()),
            Err(_) => SubmitAdvance::Exhausted,
        }
    }

    /// Recompute completion for the active taxonomy and announce the change
    fn label_path_changed(&mut self) {
        let Some(open) = self.open.as_mut() else {
            return;
        };
        let Some(path) = open.paths.get(&open.active_taxonomy) else {
            return;
        };

        open.tracker.set_labels(&open.active_taxonomy, path.labels());
        self.context.emit(AnnotaEvent::LabelPathChanged {
            session_id: self.context.session_id(),
            record_id: open.record.id.clone(),
            taxonomy_key: open.active_taxonomy.clone(),
            depth: path.labels().len(),
            timestamp: Utc::now(),
        });
    }
}
