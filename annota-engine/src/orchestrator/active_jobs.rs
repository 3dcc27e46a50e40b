//! Background visibility of AI jobs outside a run
//!
//! Tracked job ids live in the session's job registry, so jobs dispatched by
//! a run stay visible after it ends. Each cycle the poller asks the backend
//! for every pending/processing job and adopts ids it has not seen, whoever
//! started them. Tracked ids missing from that list are settled and trigger a
//! record refresh. Failures are logged and retried on the next tick.

use crate::error::EngineResult;
use crate::models::JobStatus;
use crate::services::{AiJobService, RecordRefresher};
use annota_common::events::AnnotaEvent;
use annota_common::SessionContext;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct ActiveJobPoller {
    jobs: Arc<dyn AiJobService>,
    refresher: Arc<dyn RecordRefresher>,
    context: SessionContext,
    interval: Duration,
}

impl ActiveJobPoller {
    pub fn new(
        jobs: Arc<dyn AiJobService>,
        refresher: Arc<dyn RecordRefresher>,
        context: SessionContext,
        interval: Duration,
    ) -> Self {
        Self {
            jobs,
            refresher,
            context,
            interval,
        }
    }

    /// Start tracking a job id (idempotent)
    pub fn track(&self, job_id: &str) -> EngineResult<()> {
        self.context.register_job(job_id)?;
        Ok(())
    }

    pub fn tracked(&self) -> EngineResult<Vec<String>> {
        Ok(self.context.registered_jobs()?)
    }

    /// One poll cycle; returns the job ids that settled
    pub async fn poll_once(&self) -> EngineResult<Vec<String>> {
        let active: Vec<String> = self
            .jobs
            .list_jobs_by_status(&JobStatus::ACTIVE)
            .await?
            .into_iter()
            .map(|job| job.id)
            .collect();
        let active_set: HashSet<&str> = active.iter().map(String::as_str).collect();

        let tracked = self.context.registered_jobs()?;
        let settled: Vec<String> = tracked
            .iter()
            .filter(|id| !active_set.contains(id.as_str()))
            .cloned()
            .collect();

        for job_id in active.iter().filter(|id| !tracked.contains(*id)) {
            tracing::debug!(
                session_id = %self.context.session_id(),
                job_id = %job_id,
                "Tracking AI job"
            );
            self.context.register_job(job_id)?;
        }

        if settled.is_empty() {
            return Ok(settled);
        }

        for job_id in &settled {
            self.context.unregister_job(job_id)?;
        }

        tracing::info!(
            session_id = %self.context.session_id(),
            settled = ?settled,
            "Tracked AI jobs settled"
        );
        self.context.emit(AnnotaEvent::ActiveJobsSettled {
            session_id: self.context.session_id(),
            job_ids: settled.clone(),
            timestamp: Utc::now(),
        });
        self.refresher.refresh_records().await;

        Ok(settled)
    }

    /// Poll every interval until `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; the first poll waits one period
        ticker.tick().await;

        tracing::debug!(
            session_id = %self.context.session_id(),
            interval_ms = self.interval.as_millis() as u64,
            "Active job poller started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        tracing::warn!(
                            session_id = %self.context.session_id(),
                            error = %e,
                            "Active job poll failed, retrying next interval"
                        );
                    }
                }
            }
        }

        tracing::debug!(session_id = %self.context.session_id(), "Active job poller stopped");
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Periodic record-list refresh running alongside the poller
pub fn spawn_refresh_ticker(
    refresher: Arc<dyn RecordRefresher>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => refresher.refresh_records().await,
            }
        }
    })
}
