//! Sequential AI labeling runs
//!
//! One run dispatches one job per active taxonomy, strictly in order: the job
//! for a taxonomy is only created after the previous one reached a terminal
//! status or ran out of poll attempts.
//!
//! Cancellation is cooperative. It is checked before each taxonomy, so the
//! in-flight job always finishes and its record refresh still happens.

use crate::error::{EngineError, EngineResult};
use crate::models::{JobOutcome, Taxonomy, TaxonomyOutcome};
use crate::services::{AiJobService, RecordRefresher, TaxonomySyncState};
use annota_common::events::{AnnotaEvent, OrchestrationProgress};
use annota_common::SessionContext;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Job polling tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_poll_attempts: 200,
        }
    }
}

/// Result of one orchestration run
#[derive(Debug)]
pub struct RunReport {
    pub session_id: Uuid,
    /// One entry per taxonomy whose job was dispatched, in dispatch order
    pub outcomes: Vec<TaxonomyOutcome>,
    pub cancelled: bool,
    /// Fatal error that ended the run early (job creation failure)
    pub aborted: Option<EngineError>,
}

impl RunReport {
    /// Every active taxonomy got a job and nothing was fatal
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.aborted.is_none()
    }

    /// Per-taxonomy timeouts as reportable errors
    pub fn timeouts(&self) -> Vec<EngineError> {
        self.outcomes
            .iter()
            .filter_map(|o| match o.outcome {
                JobOutcome::TimedOut { attempts } => Some(EngineError::JobTimeout {
                    taxonomy_key: o.taxonomy_key.clone(),
                    job_id: o.job_id.clone(),
                    attempts,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Clears the running flag when a run ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives AI labeling runs for one session
pub struct JobOrchestrator {
    jobs: Arc<dyn AiJobService>,
    sync_state: Arc<dyn TaxonomySyncState>,
    refresher: Arc<dyn RecordRefresher>,
    context: SessionContext,
    settings: OrchestratorSettings,
    /// Record ids the next run labels
    selection: Mutex<Vec<String>>,
    /// Replaced at the start and end of every run
    cancel_token: Mutex<CancellationToken>,
    running: AtomicBool,
}

impl JobOrchestrator {
    pub fn new(
        jobs: Arc<dyn AiJobService>,
        sync_state: Arc<dyn TaxonomySyncState>,
        refresher: Arc<dyn RecordRefresher>,
        context: SessionContext,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            jobs,
            sync_state,
            refresher,
            context,
            settings,
            selection: Mutex::new(Vec::new()),
            cancel_token: Mutex::new(CancellationToken::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Replace the record selection
    pub fn select_records(&self, record_ids: Vec<String>) {
        *lock(&self.selection) = record_ids;
    }

    pub fn selected_records(&self) -> Vec<String> {
        lock(&self.selection).clone()
    }

    /// Request cancellation of the current run
    ///
    /// Takes effect before the next taxonomy; the job in flight is never
    /// interrupted.
    pub fn cancel(&self) {
        tracing::info!(session_id = %self.context.session_id(), "Cancellation requested");
        lock(&self.cancel_token).cancel();
    }

    /// Run over every active taxonomy
    pub async fn start(&self) -> EngineResult<RunReport> {
        self.run(None).await
    }

    /// Run over the active taxonomies whose keys are listed
    pub async fn start_for(&self, taxonomy_keys: &[String]) -> EngineResult<RunReport> {
        self.run(Some(taxonomy_keys)).await
    }

    async fn run(&self, only: Option<&[String]>) -> EngineResult<RunReport> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::Conflict(
                "an AI labeling run is already active for this session".to_string(),
            ));
        }
        let _running = RunningGuard(&self.running);

        // Installed before the first await: a cancel during the precondition
        // fetch applies to this run
        let cancel_token = CancellationToken::new();
        *lock(&self.cancel_token) = cancel_token.clone();

        let session_id = self.context.session_id();
        let record_ids = self.selected_records();
        let taxonomies = self.check_preconditions(&record_ids, only).await?;

        tracing::info!(
            session_id = %session_id,
            records = record_ids.len(),
            taxonomies = taxonomies.len(),
            "Starting AI labeling run"
        );

        let started_at = Utc::now();
        let keys: Vec<String> = taxonomies.iter().map(|t| t.key.clone()).collect();
        let mut report = RunReport {
            session_id,
            outcomes: Vec::new(),
            cancelled: false,
            aborted: None,
        };

        for (idx, taxonomy_key) in keys.iter().enumerate() {
            if cancel_token.is_cancelled() {
                tracing::info!(
                    session_id = %session_id,
                    skipped = keys.len() - idx,
                    "AI labeling run cancelled"
                );
                report.cancelled = true;
                break;
            }

            let progress = OrchestrationProgress {
                session_id,
                current: taxonomy_key.clone(),
                remaining: keys[idx + 1..].to_vec(),
                finished: keys[..idx].to_vec(),
                record_count: record_ids.len(),
                started_at,
            };
            if let Err(e) = self.context.publish_progress(&progress) {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to store progress");
            }

            let job_id = match self.jobs.create_job(taxonomy_key, &record_ids).await {
                Ok(job_id) => job_id,
                Err(source) => {
                    tracing::error!(
                        session_id = %session_id,
                        taxonomy = %taxonomy_key,
                        error = %source,
                        "Job creation failed, aborting run"
                    );
                    report.aborted = Some(EngineError::JobCreation {
                        taxonomy_key: taxonomy_key.clone(),
                        source,
                    });
                    break;
                }
            };

            if let Err(e) = self.context.register_job(&job_id) {
                tracing::warn!(session_id = %session_id, job_id = %job_id, error = %e, "Failed to register job");
            }
            self.context.emit(AnnotaEvent::JobDispatched {
                session_id,
                taxonomy_key: taxonomy_key.clone(),
                job_id: job_id.clone(),
                timestamp: Utc::now(),
            });
            tracing::info!(
                session_id = %session_id,
                taxonomy = %taxonomy_key,
                job_id = %job_id,
                "AI job dispatched"
            );

            let outcome = self.await_job(&job_id).await;
            if let JobOutcome::TimedOut { attempts } = outcome {
                tracing::warn!(
                    session_id = %session_id,
                    taxonomy = %taxonomy_key,
                    job_id = %job_id,
                    attempts,
                    "AI job poll budget exhausted, continuing with next taxonomy"
                );
            } else {
                tracing::info!(
                    session_id = %session_id,
                    taxonomy = %taxonomy_key,
                    job_id = %job_id,
                    outcome = %outcome.kind(),
                    "AI job finished"
                );
            }

            self.context.emit(AnnotaEvent::JobFinished {
                session_id,
                taxonomy_key: taxonomy_key.clone(),
                job_id: job_id.clone(),
                outcome: outcome.kind(),
                timestamp: Utc::now(),
            });
            self.refresher.refresh_records().await;

            report.outcomes.push(TaxonomyOutcome {
                taxonomy_key: taxonomy_key.clone(),
                job_id,
                outcome,
            });
        }

        self.finish_run(&report);
        Ok(report)
    }

    /// Records, active taxonomies and sync state; returns the taxonomies to run
    async fn check_preconditions(
        &self,
        record_ids: &[String],
        only: Option<&[String]>,
    ) -> EngineResult<Vec<Taxonomy>> {
        if record_ids.is_empty() {
            return Err(EngineError::Precondition("no records selected".to_string()));
        }

        let taxonomies: Vec<Taxonomy> = self
            .sync_state
            .taxonomies()
            .await?
            .into_iter()
            .filter(|t| t.is_active)
            .filter(|t| only.map_or(true, |keys| keys.iter().any(|k| k == &t.key)))
            .collect();

        if taxonomies.is_empty() {
            return Err(EngineError::Precondition(
                "no active taxonomies".to_string(),
            ));
        }

        let unsynced: Vec<String> = taxonomies
            .iter()
            .filter(|t| !t.sync_status.is_synced())
            .map(|t| t.name().to_string())
            .collect();
        if !unsynced.is_empty() {
            tracing::warn!(
                session_id = %self.context.session_id(),
                unsynced = ?unsynced,
                "Taxonomies not synced, run blocked"
            );
            return Err(EngineError::UnsyncedTaxonomies(unsynced));
        }

        Ok(taxonomies)
    }

    /// Poll until a terminal status or the attempt budget runs out
    ///
    /// Each attempt waits one interval first. A failed poll still counts.
    async fn await_job(&self, job_id: &str) -> JobOutcome {
        let max_attempts = self.settings.max_poll_attempts;

        for attempt in 1..=max_attempts {
            tokio::time::sleep(self.settings.poll_interval).await;

            match self.jobs.job_status(job_id).await {
                Ok(status) => {
                    if let Some(outcome) = JobOutcome::from_status(status) {
                        return outcome;
                    }
                    tracing::trace!(job_id, attempt, status = status.as_str(), "Job still running");
                }
                Err(e) => {
                    tracing::warn!(job_id, attempt, error = %e, "Job status poll failed");
                }
            }
        }

        JobOutcome::TimedOut {
            attempts: max_attempts,
        }
    }

    /// Clear progress, selection and cancellation state; announce the end
    fn finish_run(&self, report: &RunReport) {
        let session_id = self.context.session_id();

        if let Err(e) = self.context.clear_progress() {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to clear progress");
        }
        lock(&self.selection).clear();
        *lock(&self.cancel_token) = CancellationToken::new();

        self.context.emit(AnnotaEvent::OrchestrationFinished {
            session_id,
            cancelled: report.cancelled,
            error: report.aborted.as_ref().map(ToString::to_string),
            timestamp: Utc::now(),
        });

        tracing::info!(
            session_id = %session_id,
            dispatched = report.outcomes.len(),
            cancelled = report.cancelled,
            aborted = report.aborted.is_some(),
            "AI labeling run finished"
        );
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
