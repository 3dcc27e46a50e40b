//! In-memory fakes for the engine's service traits

use annota_engine::models::{
    AiJob, JobStatus, RecordStatus, SubmissionRequest, SubmissionResponse, Taxonomy, TaxonomyNode,
};
use annota_engine::services::{
    AiJobService, AnnotationSubmission, NodeLookup, RecordRefresher, ServiceError,
    TaxonomySyncState,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Node lookup
// ============================================================================

#[derive(Default)]
pub struct FakeNodeLookup {
    nodes: Vec<TaxonomyNode>,
    pub fail: AtomicBool,
    pub level_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl FakeNodeLookup {
    pub fn new(nodes: Vec<TaxonomyNode>) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeLookup for FakeNodeLookup {
    async fn nodes_at_level(
        &self,
        _taxonomy_key: &str,
        level: u32,
        parent_code: Option<&str>,
    ) -> Result<Vec<TaxonomyNode>, ServiceError> {
        self.level_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.level == level)
            .filter(|n| parent_code.map_or(true, |p| n.parent_code.as_deref() == Some(p)))
            .cloned()
            .collect())
    }

    async fn search_nodes(
        &self,
        _taxonomy_key: &str,
        query: &str,
    ) -> Result<Vec<TaxonomyNode>, ServiceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let query = query.to_lowercase();
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.label.to_lowercase().contains(&query) || n.code.contains(&query))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Submission
// ============================================================================

/// Records requests; answers from a queue, else echoes the request
#[derive(Default)]
pub struct FakeSubmission {
    pub requests: Mutex<Vec<SubmissionRequest>>,
    responses: Mutex<VecDeque<Result<SubmissionResponse, ServiceError>>>,
}

impl FakeSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, response: Result<SubmissionResponse, ServiceError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<SubmissionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnnotationSubmission for FakeSubmission {
    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResponse, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        Ok(SubmissionResponse {
            status: request.status,
            completed_taxonomies: request.taxonomy_key.iter().cloned().collect(),
            all_completed: request.status == RecordStatus::Submitted,
        })
    }
}

// ============================================================================
// AI jobs
// ============================================================================

/// One scripted answer to a status poll
#[derive(Debug, Clone, Copy)]
pub enum Poll {
    Status(JobStatus),
    Error,
}

/// Observable call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobCall {
    Created(String),
    Polled(String),
}

/// Job ids are `job-{taxonomy}`; polls follow a per-taxonomy script whose
/// last entry repeats
#[derive(Default)]
pub struct FakeJobService {
    scripts: Mutex<HashMap<String, VecDeque<Poll>>>,
    failing_creates: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<JobCall>>,
    pub active: Mutex<HashSet<String>>,
    pub fail_list: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl FakeJobService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_id(taxonomy_key: &str) -> String {
        format!("job-{}", taxonomy_key)
    }

    pub fn script(&self, taxonomy_key: &str, polls: Vec<Poll>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(Self::job_id(taxonomy_key), polls.into());
    }

    pub fn fail_create(&self, taxonomy_key: &str) {
        self.failing_creates
            .lock()
            .unwrap()
            .insert(taxonomy_key.to_string());
    }

    pub fn set_active(&self, job_ids: &[&str]) {
        *self.active.lock().unwrap() = job_ids.iter().map(|id| id.to_string()).collect();
    }

    pub fn calls(&self) -> Vec<JobCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                JobCall::Created(key) => Some(key),
                JobCall::Polled(_) => None,
            })
            .collect()
    }

    pub fn poll_count(&self, job_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, JobCall::Polled(id) if id == job_id))
            .count()
    }
}

#[async_trait]
impl AiJobService for FakeJobService {
    async fn create_job(
        &self,
        taxonomy_key: &str,
        _sentence_ids: &[String],
    ) -> Result<String, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(JobCall::Created(taxonomy_key.to_string()));
        if self.failing_creates.lock().unwrap().contains(taxonomy_key) {
            return Err(ServiceError::Api(500, "job runner unavailable".to_string()));
        }
        Ok(Self::job_id(taxonomy_key))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(JobCall::Polled(job_id.to_string()));

        let mut scripts = self.scripts.lock().unwrap();
        let poll = match scripts.get_mut(job_id) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().copied(),
            None => Some(Poll::Status(JobStatus::Completed)),
        };
        match poll {
            Some(Poll::Status(status)) => Ok(status),
            Some(Poll::Error) | None => Err(ServiceError::Network("timeout".to_string())),
        }
    }

    async fn list_jobs_by_status(
        &self,
        statuses: &[JobStatus],
    ) -> Result<Vec<AiJob>, ServiceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(statuses, &JobStatus::ACTIVE[..]);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ServiceError::Api(503, "unavailable".to_string()));
        }
        Ok(self
            .active
            .lock()
            .unwrap()
            .iter()
            .map(|id| AiJob {
                id: id.clone(),
                taxonomy_key: None,
                sentence_ids: Vec::new(),
                status: JobStatus::Processing,
            })
            .collect())
    }
}

// ============================================================================
// Sync state and refresh
// ============================================================================

pub struct FakeSyncState {
    pub taxonomies: Mutex<Vec<Taxonomy>>,
    delay: Duration,
}

impl FakeSyncState {
    pub fn new(taxonomies: Vec<Taxonomy>) -> Self {
        Self {
            taxonomies: Mutex::new(taxonomies),
            delay: Duration::ZERO,
        }
    }

    /// Catalogue fetch that takes `delay` to answer
    pub fn slow(taxonomies: Vec<Taxonomy>, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(taxonomies)
        }
    }
}

#[async_trait]
impl TaxonomySyncState for FakeSyncState {
    async fn taxonomies(&self) -> Result<Vec<Taxonomy>, ServiceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.taxonomies.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct CountingRefresher {
    pub count: AtomicUsize,
}

impl CountingRefresher {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordRefresher for CountingRefresher {
    async fn refresh_records(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
