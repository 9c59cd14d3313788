//! In-memory implementations of the provider traits
//!
//! These fakes hold their state behind `Arc<Mutex<_>>` so a test can keep a clone,
//! hand another clone to the code under test, and inspect recorded calls afterwards.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pipeline_core::{
    Artifact, CiProvider, CodeHost, CommitStatus, IssueComment, Job, Pipeline, PipelineError,
    PipelineResult, ProjectSlug, PullRequestRef, TestResult, Workflow,
};

#[derive(Debug, Default)]
struct CiState {
    pipelines: HashMap<(String, String), Vec<Pipeline>>,
    pipeline_by_id: HashMap<String, Pipeline>,
    workflows: HashMap<String, Vec<Workflow>>,
    workflow_by_id: HashMap<String, Workflow>,
    job_snapshots: HashMap<String, VecDeque<Vec<Job>>>,
    tests: HashMap<u64, Vec<TestResult>>,
    artifacts: HashMap<u64, Vec<Artifact>>,
    failing_jobs: HashSet<u64>,
    calls: HashMap<&'static str, usize>,
}

/// Fake CI provider
#[derive(Debug, Clone, Default)]
pub struct FakeCiProvider {
    state: Arc<Mutex<CiState>>,
}

impl FakeCiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register pipelines for a slug/branch pair, newest first
    pub fn with_pipelines(self, slug: &str, branch: &str, pipelines: Vec<Pipeline>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for pipeline in &pipelines {
                state
                    .pipeline_by_id
                    .insert(pipeline.id.clone(), pipeline.clone());
            }
            state
                .pipelines
                .insert((slug.to_string(), branch.to_string()), pipelines);
        }
        self
    }

    pub fn with_workflow(self, workflow: Workflow) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .workflows
                .entry(workflow.pipeline_id.clone())
                .or_default()
                .push(workflow.clone());
            state.workflow_by_id.insert(workflow.id.clone(), workflow);
        }
        self
    }

    /// Queue a job listing; each `list_jobs` call consumes one snapshot and the last
    /// snapshot repeats forever.
    pub fn push_jobs(self, workflow_id: &str, jobs: Vec<Job>) -> Self {
        self.state
            .lock()
            .unwrap()
            .job_snapshots
            .entry(workflow_id.to_string())
            .or_default()
            .push_back(jobs);
        self
    }

    pub fn with_tests(self, job_number: u64, tests: Vec<TestResult>) -> Self {
        self.state.lock().unwrap().tests.insert(job_number, tests);
        self
    }

    pub fn with_artifacts(self, job_number: u64, artifacts: Vec<Artifact>) -> Self {
        self.state
            .lock()
            .unwrap()
            .artifacts
            .insert(job_number, artifacts);
        self
    }

    /// Make every test/artifact fetch for the job fail with a server error
    pub fn fail_job(self, job_number: u64) -> Self {
        self.state.lock().unwrap().failing_jobs.insert(job_number);
        self
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, method: &'static str) {
        *self.state.lock().unwrap().calls.entry(method).or_insert(0) += 1;
    }

    fn check_job(&self, job_number: u64, path: String) -> PipelineResult<()> {
        if self.state.lock().unwrap().failing_jobs.contains(&job_number) {
            return Err(PipelineError::Remote {
                path,
                status: Some(502),
                message: "bad gateway".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CiProvider for FakeCiProvider {
    async fn list_pipelines(
        &self,
        slug: &ProjectSlug,
        branch: &str,
    ) -> PipelineResult<Vec<Pipeline>> {
        self.record("list_pipelines");
        let state = self.state.lock().unwrap();
        let known_slug = state.pipelines.keys().any(|(s, _)| s == slug.as_str());
        if !known_slug {
            return Err(PipelineError::NotFound(format!("/project/{slug}/pipeline")));
        }
        Ok(state
            .pipelines
            .get(&(slug.as_str().to_string(), branch.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> PipelineResult<Pipeline> {
        self.record("get_pipeline");
        self.state
            .lock()
            .unwrap()
            .pipeline_by_id
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(format!("/pipeline/{pipeline_id}")))
    }

    async fn list_workflows(&self, pipeline_id: &str) -> PipelineResult<Vec<Workflow>> {
        self.record("list_workflows");
        Ok(self
            .state
            .lock()
            .unwrap()
            .workflows
            .get(pipeline_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_workflow(&self, workflow_id: &str) -> PipelineResult<Workflow> {
        self.record("get_workflow");
        self.state
            .lock()
            .unwrap()
            .workflow_by_id
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(format!("/workflow/{workflow_id}")))
    }

    async fn list_jobs(&self, workflow_id: &str) -> PipelineResult<Vec<Job>> {
        self.record("list_jobs");
        let mut state = self.state.lock().unwrap();
        let Some(snapshots) = state.job_snapshots.get_mut(workflow_id) else {
            return Err(PipelineError::NotFound(format!("/workflow/{workflow_id}/job")));
        };
        if snapshots.len() > 1 {
            Ok(snapshots.pop_front().unwrap_or_default())
        } else {
            Ok(snapshots.front().cloned().unwrap_or_default())
        }
    }

    async fn list_tests(
        &self,
        slug: &ProjectSlug,
        job_number: u64,
    ) -> PipelineResult<Vec<TestResult>> {
        self.record("list_tests");
        self.check_job(job_number, format!("/project/{slug}/{job_number}/tests"))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .tests
            .get(&job_number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_artifacts(
        &self,
        slug: &ProjectSlug,
        job_number: u64,
    ) -> PipelineResult<Vec<Artifact>> {
        self.record("list_artifacts");
        self.check_job(job_number, format!("/project/{slug}/{job_number}/artifacts"))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .artifacts
            .get(&job_number)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
struct HostState {
    comments: BTreeMap<u64, Vec<IssueComment>>,
    next_comment_id: u64,
    prs_by_sha: HashMap<String, Vec<PullRequestRef>>,
    unknown_commits: HashSet<String>,
    statuses: Vec<(String, CommitStatus)>,
    fail_statuses: bool,
    fail_comment_writes: bool,
    created: usize,
    updated: usize,
}

/// Fake code host
#[derive(Debug, Clone, Default)]
pub struct FakeCodeHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeCodeHost {
    pub fn new() -> Self {
        let host = Self::default();
        host.state.lock().unwrap().next_comment_id = 1000;
        host
    }

    /// Seed an existing comment, returning its id
    pub fn add_comment(&self, pr_number: u64, body: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_comment_id;
        state.next_comment_id += 1;
        state.comments.entry(pr_number).or_default().push(IssueComment {
            id,
            body: body.to_string(),
        });
        id
    }

    pub fn with_pull_requests(self, sha: &str, prs: Vec<PullRequestRef>) -> Self {
        self.state
            .lock()
            .unwrap()
            .prs_by_sha
            .insert(sha.to_string(), prs);
        self
    }

    /// Commits the host has never seen answer the PR lookup with NotFound
    pub fn with_unknown_commit(self, sha: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .unknown_commits
            .insert(sha.to_string());
        self
    }

    pub fn fail_statuses(self) -> Self {
        self.state.lock().unwrap().fail_statuses = true;
        self
    }

    pub fn fail_comment_writes(self) -> Self {
        self.state.lock().unwrap().fail_comment_writes = true;
        self
    }

    pub fn comments(&self, pr_number: u64) -> Vec<IssueComment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&pr_number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn statuses(&self) -> Vec<(String, CommitStatus)> {
        self.state.lock().unwrap().statuses.clone()
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn updated_count(&self) -> usize {
        self.state.lock().unwrap().updated
    }

    fn write_error(path: String) -> PipelineError {
        PipelineError::Remote {
            path,
            status: Some(403),
            message: "Resource not accessible by integration".to_string(),
        }
    }
}

#[async_trait]
impl CodeHost for FakeCodeHost {
    async fn list_issue_comments(&self, pr_number: u64) -> PipelineResult<Vec<IssueComment>> {
        Ok(self.comments(pr_number))
    }

    async fn create_issue_comment(
        &self,
        pr_number: u64,
        body: &str,
    ) -> PipelineResult<IssueComment> {
        if self.state.lock().unwrap().fail_comment_writes {
            return Err(Self::write_error(format!("/issues/{pr_number}/comments")));
        }
        let id = self.add_comment(pr_number, body);
        self.state.lock().unwrap().created += 1;
        Ok(IssueComment {
            id,
            body: body.to_string(),
        })
    }

    async fn update_issue_comment(
        &self,
        comment_id: u64,
        body: &str,
    ) -> PipelineResult<IssueComment> {
        let mut state = self.state.lock().unwrap();
        if state.fail_comment_writes {
            return Err(Self::write_error(format!("/issues/comments/{comment_id}")));
        }
        let comment = state
            .comments
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| PipelineError::NotFound(format!("/issues/comments/{comment_id}")))?;
        comment.body = body.to_string();
        let updated = comment.clone();
        state.updated += 1;
        Ok(updated)
    }

    async fn pull_requests_for_commit(&self, sha: &str) -> PipelineResult<Vec<PullRequestRef>> {
        let state = self.state.lock().unwrap();
        if state.unknown_commits.contains(sha) {
            return Err(PipelineError::NotFound(format!("/commits/{sha}/pulls")));
        }
        Ok(state
            .prs_by_sha
            .get(sha)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> PipelineResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_statuses {
            return Err(Self::write_error(format!("/statuses/{sha}")));
        }
        state.statuses.push((sha.to_string(), status.clone()));
        Ok(())
    }
}
