//! JSON/HTTP client for the labeling backend
//!
//! Implements every service trait the engine consumes. Endpoints:
//!
//! | operation    | request                                                  |
//! |--------------|----------------------------------------------------------|
//! | level nodes  | `GET /taxonomies/{key}/nodes?level=L[&parent_code=P]`    |
//! | search       | `GET /taxonomies/{key}/nodes/search?q=Q`                 |
//! | submit       | `POST /sentences/{id}/annotations`                       |
//! | create job   | `POST /ai-jobs` → `{job_id}`                             |
//! | job status   | `GET /ai-jobs/{id}` → `{status}`                         |
//! | list jobs    | `GET /ai-jobs?status=pending,processing`                 |
//! | taxonomies   | `GET /taxonomies`                                        |

use super::{
    AiJobService, AnnotationSubmission, NodeLookup, ServiceError, TaxonomySyncState,
};
use crate::models::{
    AiJob, JobStatus, SubmissionRequest, SubmissionResponse, Taxonomy, TaxonomyNode,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("annota-engine/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct CreateJobRequest<'a> {
    taxonomy_key: &'a str,
    sentence_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    /// Backends may return numeric or string ids
    #[serde(default)]
    job_id: Option<serde_json::Value>,
}

impl CreateJobResponse {
    fn into_job_id(self) -> Option<String> {
        match self.job_id? {
            serde_json::Value::String(id) if !id.is_empty() => Some(id),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: JobStatus,
}

/// HTTP backend client
#[derive(Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let base_url = base_url.into();
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ServiceError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each percent-encoded as one segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Map non-2xx to `ServiceError::Api` and decode the JSON body
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ServiceError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(url = %url, "POST");

        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Self::decode(response).await
    }
}

#[async_trait]
impl NodeLookup for BackendClient {
    async fn nodes_at_level(
        &self,
        taxonomy_key: &str,
        level: u32,
        parent_code: Option<&str>,
    ) -> Result<Vec<TaxonomyNode>, ServiceError> {
        let mut query = vec![("level", level.to_string())];
        if let Some(parent) = parent_code {
            query.push(("parent_code", parent.to_string()));
        }
        self.get_json(&["taxonomies", taxonomy_key, "nodes"], &query)
            .await
    }

    async fn search_nodes(
        &self,
        taxonomy_key: &str,
        query: &str,
    ) -> Result<Vec<TaxonomyNode>, ServiceError> {
        self.get_json(
            &["taxonomies", taxonomy_key, "nodes", "search"],
            &[("q", query.to_string())],
        )
        .await
    }
}

#[async_trait]
impl AnnotationSubmission for BackendClient {
    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResponse, ServiceError> {
        self.post_json(
            &["sentences", request.record_id.as_str(), "annotations"],
            request,
        )
        .await
    }
}

#[async_trait]
impl AiJobService for BackendClient {
    async fn create_job(
        &self,
        taxonomy_key: &str,
        sentence_ids: &[String],
    ) -> Result<String, ServiceError> {
        let body = CreateJobRequest {
            taxonomy_key,
            sentence_ids,
        };
        let response: CreateJobResponse = self.post_json(&["ai-jobs"], &body).await?;
        response
            .into_job_id()
            .ok_or(ServiceError::MissingField("job_id"))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        let response: JobStatusResponse =
            self.get_json(&["ai-jobs", job_id], &[]).await?;
        Ok(response.status)
    }

    async fn list_jobs_by_status(
        &self,
        statuses: &[JobStatus],
    ) -> Result<Vec<AiJob>, ServiceError> {
        let status_list = statuses
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.get_json(&["ai-jobs"], &[("status", status_list)]).await
    }
}

#[async_trait]
impl TaxonomySyncState for BackendClient {
    async fn taxonomies(&self) -> Result<Vec<Taxonomy>, ServiceError> {
        self.get_json(&["taxonomies"], &[]).await
    }
}
