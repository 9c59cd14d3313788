use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use pipeline_core::{
    config::GitHubConfig, CodeHost, CommitStatus, IssueComment, PipelineResult, PullRequestRef,
};

use crate::auth::{app_jwt, Credentials, InstallationToken};
use crate::error::GitHubError;

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;
/// Guard against a server that keeps returning full pages.
const MAX_COMMENT_PAGES: u32 = 50;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for one repository
pub struct GitHubClient {
    http_client: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
    request_timeout: Duration,
}

impl GitHubClient {
    /// Build a client with an already issued token.
    pub fn with_token(
        api_url: &str,
        owner: &str,
        repo: &str,
        token: String,
    ) -> Result<Self, GitHubError> {
        if owner.trim().is_empty() || repo.trim().is_empty() {
            return Err(GitHubError::MissingRepository);
        }
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("e2e-pipeline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| GitHubError::Transport {
                path: api_url.to_string(),
                source,
            })?;
        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: owner.trim().to_string(),
            repo: repo.trim().to_string(),
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Upper bound for a single request, so a stalled endpoint cannot hang the caller.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve credentials from config and, for a GitHub App, exchange the JWT for an
    /// installation token.
    pub async fn connect(
        config: &GitHubConfig,
        owner: &str,
        repo: &str,
    ) -> Result<Self, GitHubError> {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        match Credentials::from_config(config)? {
            Credentials::Token(token) => {
                debug!("Authenticating to GitHub with a personal token");
                Ok(Self::with_token(&config.api_url, owner, repo, token)?
                    .with_request_timeout(timeout))
            }
            Credentials::App {
                app_id,
                installation_id,
                private_key,
            } => {
                let jwt = app_jwt(&app_id, &private_key, Utc::now())?;
                let mut client = Self::with_token(&config.api_url, owner, repo, jwt)?
                    .with_request_timeout(timeout);
                let path = format!("/app/installations/{installation_id}/access_tokens");
                let issued: InstallationToken =
                    client.send_json(Method::POST, &path, None).await?;
                info!(
                    "Obtained installation token for GitHub App {} (expires {:?})",
                    app_id, issued.expires_at
                );
                client.token = issued.token;
                Ok(client)
            }
        }
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.repo, rest)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.api_url, path))
            .timeout(self.request_timeout)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, GitHubError> {
        let response = request.send().await.map_err(|source| GitHubError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|source| GitHubError::Transport {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| GitHubError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, GitHubError> {
        debug!("{} {}", method, path);
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.execute(request, path).await
    }
}

#[async_trait]
impl CodeHost for GitHubClient {
    async fn list_issue_comments(&self, pr_number: u64) -> PipelineResult<Vec<IssueComment>> {
        let path = self.repo_path(&format!("/issues/{pr_number}/comments"));
        let mut comments = Vec::new();
        for page in 1..=MAX_COMMENT_PAGES {
            let request = self
                .request(Method::GET, &path)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())]);
            let batch: Vec<IssueComment> = self.execute(request, &path).await?;
            let last_page = batch.len() < PER_PAGE;
            comments.extend(batch);
            if last_page {
                break;
            }
        }
        debug!("PR #{} has {} comments", pr_number, comments.len());
        Ok(comments)
    }

    async fn create_issue_comment(
        &self,
        pr_number: u64,
        body: &str,
    ) -> PipelineResult<IssueComment> {
        let path = self.repo_path(&format!("/issues/{pr_number}/comments"));
        let comment = self
            .send_json(Method::POST, &path, Some(json!({ "body": body })))
            .await?;
        Ok(comment)
    }

    async fn update_issue_comment(
        &self,
        comment_id: u64,
        body: &str,
    ) -> PipelineResult<IssueComment> {
        let path = self.repo_path(&format!("/issues/comments/{comment_id}"));
        let comment = self
            .send_json(Method::PATCH, &path, Some(json!({ "body": body })))
            .await?;
        Ok(comment)
    }

    async fn pull_requests_for_commit(&self, sha: &str) -> PipelineResult<Vec<PullRequestRef>> {
        let path = self.repo_path(&format!("/commits/{sha}/pulls"));
        let pulls = self.send_json(Method::GET, &path, None).await?;
        Ok(pulls)
    }

    async fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> PipelineResult<()> {
        let path = self.repo_path(&format!("/statuses/{sha}"));
        let body = serde_json::to_value(status)?;
        let _: serde_json::Value = self.send_json(Method::POST, &path, Some(body)).await?;
        Ok(())
    }
}
