use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pipeline_core::{
    config::AggregatorConfig, Artifact, CiProvider, Job, Pipeline, PipelineError, PipelineResult,
    ProjectSlug, TestResult, Workflow,
};
use pipeline_monitor::FailureAggregator;
use pipeline_testing_utils::{artifact, job, test_result, unnumbered_job, FakeCiProvider};

fn slug() -> ProjectSlug {
    ProjectSlug::parse("gh/acme/app", "gh").unwrap()
}

#[tokio::test]
async fn test_records_sorted_by_job_number() {
    let ci = FakeCiProvider::new()
        .with_tests(
            12,
            vec![
                test_result("e2e/search.e2e.ts", "finds channel", "failure"),
                test_result("e2e/search.e2e.ts", "opens search", "success"),
            ],
        )
        .with_artifacts(12, vec![artifact("artifacts/search_FAILED.png")])
        .with_tests(
            11,
            vec![
                test_result("e2e/login.e2e.ts", "logs in", "failure"),
                test_result("e2e/logout.e2e.ts", "logs out", "failed"),
            ],
        )
        .with_artifacts(
            11,
            vec![
                artifact("artifacts/logout_FAILED.png"),
                artifact("artifacts/login_logs_in_FAILED.png"),
            ],
        );

    let jobs = vec![
        job("e2e (1)", 12, "failed"),
        job("e2e (0)", 11, "failed"),
        job("build", 3, "failed"),
    ];
    let aggregator = FailureAggregator::new(&ci, AggregatorConfig::default());
    let report = aggregator.aggregate(&slug(), &jobs).await;

    assert_eq!(report.jobs_examined, 2);
    let summary: Vec<(u64, &str, Option<&str>)> = report
        .records
        .iter()
        .map(|r| {
            (
                r.job.number.unwrap(),
                r.test.name.as_str(),
                r.image.as_ref().map(|a| a.file_name()),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (11, "logs in", Some("login_logs_in_FAILED.png")),
            (11, "logs out", Some("logout_FAILED.png")),
            (12, "finds channel", Some("search_FAILED.png")),
        ]
    );
    assert!(report.orphans.is_empty());
    assert!(report.omissions.is_empty());
    assert_eq!(ci.call_count("list_tests"), 2);
}

#[tokio::test]
async fn test_job_failure_becomes_omission() {
    let ci = FakeCiProvider::new()
        .with_tests(21, vec![test_result("e2e/a.e2e.ts", "a", "failure")])
        .fail_job(22);

    let jobs = vec![job("e2e (0)", 21, "failed"), job("e2e (1)", 22, "failed")];
    let report = FailureAggregator::new(&ci, AggregatorConfig::default())
        .aggregate(&slug(), &jobs)
        .await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].image, None);
    assert_eq!(report.omissions.len(), 1);
    assert_eq!(report.omissions[0].job_number, Some(22));
    assert!(report.omissions[0].reason.contains("502"));
}

#[tokio::test]
async fn test_pending_and_unnumbered_jobs_are_skipped() {
    let ci = FakeCiProvider::new();
    let jobs = vec![
        job("e2e (0)", 31, "running"),
        unnumbered_job("e2e (1)", "failed"),
    ];
    let report = FailureAggregator::new(&ci, AggregatorConfig::default())
        .aggregate(&slug(), &jobs)
        .await;
    assert_eq!(report.jobs_examined, 0);
    assert!(report.is_clean());
    assert_eq!(ci.call_count("list_tests"), 0);
}

#[tokio::test]
async fn test_passing_job_skips_artifacts() {
    let ci = FakeCiProvider::new()
        .with_tests(41, vec![test_result("e2e/a.e2e.ts", "a", "success")])
        .with_artifacts(41, vec![artifact("artifacts/a_FAILED.png")]);
    let report = FailureAggregator::new(&ci, AggregatorConfig::default())
        .aggregate(&slug(), &[job("e2e (0)", 41, "success")])
        .await;
    assert!(report.is_clean());
    assert_eq!(ci.call_count("list_artifacts"), 0);
}

#[tokio::test]
async fn test_failed_job_without_results_reports_orphans() {
    let ci = FakeCiProvider::new()
        .with_artifacts(51, vec![artifact("screenshots/crash_FAILED.png")]);
    let report = FailureAggregator::new(&ci, AggregatorConfig::default())
        .aggregate(&slug(), &[job("e2e (0)", 51, "failed")])
        .await;
    assert!(report.records.is_empty());
    assert_eq!(report.orphans.len(), 1);
    assert_eq!(report.orphans[0].job_number, 51);
}

#[tokio::test]
async fn test_skipped_results_respect_config() {
    let ci = FakeCiProvider::new()
        .with_tests(61, vec![test_result("e2e/a.e2e.ts", "a", "skipped")]);
    let jobs = [job("e2e (0)", 61, "failed")];

    let counted = FailureAggregator::new(&ci, AggregatorConfig::default())
        .aggregate(&slug(), &jobs)
        .await;
    assert_eq!(counted.records.len(), 1);

    let config = AggregatorConfig {
        ignore_skipped: true,
        ..AggregatorConfig::default()
    };
    let ignored = FailureAggregator::new(&ci, config)
        .aggregate(&slug(), &jobs)
        .await;
    assert!(ignored.records.is_empty());
}

/// 拉取测试结果时按作业编号倒序耗时，并记录同时在途的请求数
#[derive(Default)]
struct SlowCi {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl CiProvider for SlowCi {
    async fn list_pipelines(&self, slug: &ProjectSlug, _: &str) -> PipelineResult<Vec<Pipeline>> {
        Err(PipelineError::NotFound(slug.to_string()))
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> PipelineResult<Pipeline> {
        Err(PipelineError::NotFound(pipeline_id.to_string()))
    }

    async fn list_workflows(&self, _: &str) -> PipelineResult<Vec<Workflow>> {
        Ok(Vec::new())
    }

    async fn get_workflow(&self, workflow_id: &str) -> PipelineResult<Workflow> {
        Err(PipelineError::NotFound(workflow_id.to_string()))
    }

    async fn list_jobs(&self, _: &str) -> PipelineResult<Vec<Job>> {
        Ok(Vec::new())
    }

    async fn list_tests(&self, _: &ProjectSlug, job_number: u64) -> PipelineResult<Vec<TestResult>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20 * (7 - job_number))).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![test_result(
            &format!("e2e/case{job_number}.e2e.ts"),
            "fails",
            "failure",
        )])
    }

    async fn list_artifacts(&self, _: &ProjectSlug, _: u64) -> PipelineResult<Vec<Artifact>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_job_fetches_are_bounded_and_ordered() {
    let ci = SlowCi::default();
    let jobs: Vec<Job> = (1..=6)
        .map(|n| job(&format!("e2e ({n})"), n, "failed"))
        .collect();
    let config = AggregatorConfig {
        max_concurrent_jobs: 3,
        ..AggregatorConfig::default()
    };

    let aggregator = FailureAggregator::new(&ci, config);
    let report = aggregator.aggregate(&slug(), &jobs).await;

    let peak = ci.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak {peak}");
    assert!(peak > 1, "peak {peak}");
    assert_eq!(report.jobs_examined, 6);
    let numbers: Vec<u64> = report.records.iter().filter_map(|r| r.job.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
}
