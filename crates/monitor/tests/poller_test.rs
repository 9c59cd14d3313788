use std::time::Duration;

use async_trait::async_trait;
use mockall::{mock, predicate::eq, Sequence};

use pipeline_core::{
    Artifact, CiProvider, Job, Pipeline, PipelineError, PipelineResult, PollReason, ProjectSlug,
    TestResult, Workflow,
};
use pipeline_monitor::{CompletionPoller, PollerOptions};
use pipeline_testing_utils::job;

mock! {
    pub Ci {}

    #[async_trait]
    impl CiProvider for Ci {
        async fn list_pipelines(&self, slug: &ProjectSlug, branch: &str) -> PipelineResult<Vec<Pipeline>>;
        async fn get_pipeline(&self, pipeline_id: &str) -> PipelineResult<Pipeline>;
        async fn list_workflows(&self, pipeline_id: &str) -> PipelineResult<Vec<Workflow>>;
        async fn get_workflow(&self, workflow_id: &str) -> PipelineResult<Workflow>;
        async fn list_jobs(&self, workflow_id: &str) -> PipelineResult<Vec<Job>>;
        async fn list_tests(&self, slug: &ProjectSlug, job_number: u64) -> PipelineResult<Vec<TestResult>>;
        async fn list_artifacts(&self, slug: &ProjectSlug, job_number: u64) -> PipelineResult<Vec<Artifact>>;
    }
}

fn options(max_empty_polls: u32, timeout: Duration) -> PollerOptions {
    PollerOptions {
        prefixes: vec!["e2e".to_string()],
        poll_interval: Duration::ZERO,
        timeout,
        max_empty_polls,
    }
}

fn expect_jobs(ci: &mut MockCi, seq: &mut Sequence, jobs: Vec<Job>) {
    ci.expect_list_jobs()
        .with(eq("wf-1"))
        .times(1)
        .in_sequence(seq)
        .returning(move |_| Ok(jobs.clone()));
}

#[tokio::test]
async fn test_pending_then_done() {
    let mut ci = MockCi::new();
    let mut seq = Sequence::new();
    expect_jobs(
        &mut ci,
        &mut seq,
        vec![job("e2e (0)", 1, "success"), job("e2e (1)", 2, "running")],
    );
    expect_jobs(
        &mut ci,
        &mut seq,
        vec![job("e2e (0)", 1, "success"), job("e2e (1)", 2, "failed")],
    );

    let outcome = CompletionPoller::new(&ci, options(10, Duration::from_secs(3600)))
        .wait("wf-1")
        .await;
    assert_eq!(outcome.reason, PollReason::Completed);
    assert_eq!(outcome.ticks, 2);
    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.pending, 0);
    assert!(!outcome.is_incomplete());
}

#[tokio::test]
async fn test_non_matching_jobs_are_ignored() {
    let mut ci = MockCi::new();
    let mut seq = Sequence::new();
    expect_jobs(
        &mut ci,
        &mut seq,
        vec![job("build", 1, "running"), job("e2e (0)", 2, "success")],
    );

    let outcome = CompletionPoller::new(&ci, options(10, Duration::from_secs(3600)))
        .wait("wf-1")
        .await;
    assert_eq!(outcome.reason, PollReason::Completed);
    assert_eq!(outcome.total, 1);
}

#[tokio::test]
async fn test_gives_up_after_empty_polls() {
    let mut ci = MockCi::new();
    ci.expect_list_jobs()
        .times(3)
        .returning(|_| Ok(vec![job("lint", 1, "running")]));

    let outcome = CompletionPoller::new(&ci, options(3, Duration::from_secs(3600)))
        .wait("wf-1")
        .await;
    assert_eq!(outcome.reason, PollReason::NoJobs);
    assert_eq!(outcome.ticks, 3);
    assert!(outcome.jobs.is_empty());
}

#[tokio::test]
async fn test_timeout_reports_pending_jobs() {
    let mut ci = MockCi::new();
    ci.expect_list_jobs()
        .times(1)
        .returning(|_| Ok(vec![job("e2e (0)", 1, "running"), job("e2e (1)", 2, "success")]));

    let outcome = CompletionPoller::new(&ci, options(10, Duration::ZERO))
        .wait("wf-1")
        .await;
    assert_eq!(outcome.reason, PollReason::TimedOut);
    assert_eq!(outcome.pending, 1);
    assert!(outcome.is_incomplete());
}

#[tokio::test]
async fn test_fetch_errors_do_not_stop_polling() {
    let mut ci = MockCi::new();
    let mut seq = Sequence::new();
    ci.expect_list_jobs()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Err(PipelineError::Remote {
                path: "/workflow/wf-1/job".to_string(),
                status: Some(502),
                message: "bad gateway".to_string(),
            })
        });
    expect_jobs(&mut ci, &mut seq, vec![job("e2e (0)", 1, "success")]);

    let outcome = CompletionPoller::new(&ci, options(10, Duration::from_secs(3600)))
        .wait("wf-1")
        .await;
    assert_eq!(outcome.reason, PollReason::Completed);
    assert_eq!(outcome.ticks, 2);
}

#[tokio::test]
async fn test_not_found_counts_as_empty() {
    let mut ci = MockCi::new();
    ci.expect_list_jobs()
        .times(2)
        .returning(|id| Err(PipelineError::NotFound(format!("/workflow/{id}/job"))));

    let outcome = CompletionPoller::new(&ci, options(2, Duration::from_secs(3600)))
        .wait("wf-1")
        .await;
    assert_eq!(outcome.reason, PollReason::NoJobs);
}
