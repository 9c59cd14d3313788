use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use pipeline_core::{
    config::CircleCiConfig, Artifact, CiProvider, Job, Pipeline, PipelineResult, ProjectSlug,
    TestResult, Workflow,
};

use crate::error::CiError;
use crate::http::{fetch_all_pages, with_retry, Page, RetryPolicy};
use crate::models::{ArtifactDto, JobDto, PipelineDto, TestDto, WorkflowDto};

const TOKEN_HEADER: &str = "Circle-Token";

/// HTTP client for the CircleCI v2 API
pub struct CircleCiClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
    max_records: usize,
}

impl CircleCiClient {
    pub fn new(config: &CircleCiConfig) -> Result<Self, CiError> {
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CiError::MissingToken)?
            .to_string();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("e2e-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CiError::Transport {
                path: config.base_url.clone(),
                source,
            })?;

        info!("CircleCI client targeting {}", config.base_url);

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            retry: RetryPolicy::from_config(config),
            max_records: config.max_records,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|source| CiError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CiError::NotFound {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|source| CiError::Transport {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| CiError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CiError> {
        debug!("GET {}", path);
        with_retry(&self.retry, path, || self.get_once(path, query)).await
    }

    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(&str, String)>,
    ) -> Result<Vec<T>, CiError> {
        fetch_all_pages(path, self.max_records, |token| {
            let mut page_query = query.clone();
            if let Some(token) = token {
                page_query.push(("page-token", token));
            }
            async move { self.get_json::<Page<T>>(path, &page_query).await }
        })
        .await
    }
}

#[async_trait]
impl CiProvider for CircleCiClient {
    async fn list_pipelines(
        &self,
        slug: &ProjectSlug,
        branch: &str,
    ) -> PipelineResult<Vec<Pipeline>> {
        let path = format!("/project/{slug}/pipeline");
        let pipelines: Vec<PipelineDto> = self
            .get_paged(&path, vec![("branch", branch.to_string())])
            .await?;
        Ok(pipelines.into_iter().map(Pipeline::from).collect())
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> PipelineResult<Pipeline> {
        let dto: PipelineDto = self
            .get_json(&format!("/pipeline/{pipeline_id}"), &[])
            .await?;
        Ok(dto.into())
    }

    async fn list_workflows(&self, pipeline_id: &str) -> PipelineResult<Vec<Workflow>> {
        let workflows: Vec<WorkflowDto> = self
            .get_paged(&format!("/pipeline/{pipeline_id}/workflow"), Vec::new())
            .await?;
        Ok(workflows.into_iter().map(Workflow::from).collect())
    }

    async fn get_workflow(&self, workflow_id: &str) -> PipelineResult<Workflow> {
        let dto: WorkflowDto = self
            .get_json(&format!("/workflow/{workflow_id}"), &[])
            .await?;
        Ok(dto.into())
    }

    async fn list_jobs(&self, workflow_id: &str) -> PipelineResult<Vec<Job>> {
        let jobs: Vec<JobDto> = self
            .get_paged(&format!("/workflow/{workflow_id}/job"), Vec::new())
            .await?;
        Ok(jobs.into_iter().map(Job::from).collect())
    }

    async fn list_tests(
        &self,
        slug: &ProjectSlug,
        job_number: u64,
    ) -> PipelineResult<Vec<TestResult>> {
        let tests: Vec<TestDto> = self
            .get_paged(&format!("/project/{slug}/{job_number}/tests"), Vec::new())
            .await?;
        Ok(tests.into_iter().map(TestResult::from).collect())
    }

    async fn list_artifacts(
        &self,
        slug: &ProjectSlug,
        job_number: u64,
    ) -> PipelineResult<Vec<Artifact>> {
        let artifacts: Vec<ArtifactDto> = self
            .get_paged(
                &format!("/project/{slug}/{job_number}/artifacts"),
                Vec::new(),
            )
            .await?;
        Ok(artifacts.into_iter().map(Artifact::from).collect())
    }
}
