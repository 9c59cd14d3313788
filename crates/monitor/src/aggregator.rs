use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use pipeline_core::{
    config::AggregatorConfig, AggregateReport, Artifact, CiProvider, FailureRecord, Job,
    JobOmission, JobStatus, OrphanArtifact, PipelineResult, ProjectSlug, TestOutcome, TestResult,
};

use crate::correlation::correlate;

/// 单个作业的聚合结果
struct JobFindings {
    job: Job,
    number: u64,
    result: Result<(Vec<FailureRecord>, Vec<OrphanArtifact>), String>,
}

/// 失败聚合器
///
/// 对每个已结束且匹配前缀的作业并发拉取测试结果与产物，关联出失败记录。
/// 单个作业拉取失败只记为缺失，不影响其他作业。
pub struct FailureAggregator<'a> {
    ci: &'a dyn CiProvider,
    config: AggregatorConfig,
}

impl<'a> FailureAggregator<'a> {
    pub fn new(ci: &'a dyn CiProvider, config: AggregatorConfig) -> Self {
        Self { ci, config }
    }

    /// 参与聚合的作业：终态、匹配前缀、有编号
    pub fn eligible<'j>(&self, jobs: &'j [Job]) -> Vec<&'j Job> {
        jobs.iter()
            .filter(|job| job.status.is_terminal())
            .filter(|job| job.matches_prefix(&self.config.job_prefixes))
            .filter(|job| {
                if job.number.is_none() {
                    debug!("作业 {} 没有编号，跳过", job.name);
                }
                job.number.is_some()
            })
            .collect()
    }

    pub async fn aggregate(&self, slug: &ProjectSlug, jobs: &[Job]) -> AggregateReport {
        let eligible = self.eligible(jobs);
        let jobs_examined = eligible.len();
        info!(
            "开始聚合 {} 个作业的失败信息，并发上限 {}",
            jobs_examined, self.config.max_concurrent_jobs
        );

        let mut findings: Vec<JobFindings> = stream::iter(eligible)
            .map(|job| self.examine(slug, job))
            .buffer_unordered(self.config.max_concurrent_jobs.max(1))
            .collect()
            .await;
        findings.sort_by_key(|f| f.number);

        let mut report = AggregateReport {
            jobs_examined,
            ..AggregateReport::default()
        };
        for finding in findings {
            match finding.result {
                Ok((records, orphans)) => {
                    report.records.extend(records);
                    report.orphans.extend(orphans);
                }
                Err(reason) => {
                    warn!("作业 {} (#{}) 数据缺失: {}", finding.job.name, finding.number, reason);
                    report.omissions.push(JobOmission {
                        job_name: finding.job.name,
                        job_number: Some(finding.number),
                        reason,
                    });
                }
            }
        }

        info!(
            "聚合完成: {} 个失败，{} 个孤立产物，{} 个作业缺失",
            report.records.len(),
            report.orphans.len(),
            report.omissions.len()
        );
        report
    }

    async fn examine(&self, slug: &ProjectSlug, job: &Job) -> JobFindings {
        let number = job.number.unwrap_or_default();
        JobFindings {
            job: job.clone(),
            number,
            result: self
                .collect_job(slug, job, number)
                .await
                .map_err(|e| e.to_string()),
        }
    }

    fn is_failure(&self, test: &TestResult) -> bool {
        match test.result {
            TestOutcome::Success => false,
            TestOutcome::Skipped => !self.config.ignore_skipped,
            _ => true,
        }
    }

    async fn collect_job(
        &self,
        slug: &ProjectSlug,
        job: &Job,
        number: u64,
    ) -> PipelineResult<(Vec<FailureRecord>, Vec<OrphanArtifact>)> {
        let tests = or_empty(self.ci.list_tests(slug, number).await)?;
        let failing: Vec<TestResult> = tests
            .into_iter()
            .filter(|test| self.is_failure(test))
            .collect();

        // 通过的作业且没有失败测试时不必拉取产物
        if failing.is_empty() && job.status == JobStatus::Success {
            return Ok((Vec::new(), Vec::new()));
        }

        let artifacts: Vec<Artifact> = or_empty(self.ci.list_artifacts(slug, number).await)?;
        let correlation = correlate(&failing, &artifacts, &self.config);
        debug!(
            "作业 {} (#{}) 有 {} 个失败测试，{} 个产物",
            job.name,
            number,
            failing.len(),
            artifacts.len()
        );

        let records = failing
            .into_iter()
            .zip(correlation.images)
            .map(|(test, image)| FailureRecord {
                job: job.clone(),
                test,
                image,
            })
            .collect();
        let orphans = correlation
            .orphans
            .into_iter()
            .map(|artifact| OrphanArtifact {
                job_name: job.name.clone(),
                job_number: number,
                artifact,
            })
            .collect();
        Ok((records, orphans))
    }
}

/// 404 视为没有数据
fn or_empty<T>(result: PipelineResult<Vec<T>>) -> PipelineResult<Vec<T>> {
    match result {
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        other => other,
    }
}
