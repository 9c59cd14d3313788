use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pipeline_core::{AggregateReport, PollOutcome, RunIdentity};

/// 摘要中的一条失败记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    pub job_number: u64,
    pub file: String,
    pub name: String,
    /// 诊断图片地址
    pub image: Option<String>,
    #[serde(default)]
    pub job_name: String,
}

/// 数据缺失的作业
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmittedJob {
    pub job_name: String,
    pub job_number: Option<u64>,
    pub reason: String,
}

/// 运行摘要文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub pipeline_number: u64,
    pub pipeline_id: String,
    pub workflow_id: String,
    pub branch: Option<String>,
    pub workflow_status: String,
    pub workflow_name: String,
    pub failures: Vec<FailureEntry>,
    /// 等待超时时仍有作业未结束
    #[serde(default)]
    pub incomplete: bool,
    #[serde(default)]
    pub omitted_jobs: Vec<OmittedJob>,
    #[serde(default)]
    pub orphan_count: usize,
}

impl RunSummary {
    pub fn build(
        identity: &RunIdentity,
        report: &AggregateReport,
        outcome: Option<&PollOutcome>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            generated_at,
            pipeline_number: identity.pipeline_number,
            pipeline_id: identity.pipeline_id.clone(),
            workflow_id: identity.workflow_id.clone(),
            branch: identity.branch.clone(),
            workflow_status: identity.workflow_status.clone(),
            workflow_name: identity.workflow_name.clone(),
            failures: report
                .records
                .iter()
                .map(|record| FailureEntry {
                    job_number: record.job.number.unwrap_or_default(),
                    file: record.test.file.clone(),
                    name: record.test.name.clone(),
                    image: record.image.as_ref().map(|a| a.url.clone()),
                    job_name: record.job.name.clone(),
                })
                .collect(),
            incomplete: outcome.is_some_and(PollOutcome::is_incomplete),
            omitted_jobs: report
                .omissions
                .iter()
                .map(|o| OmittedJob {
                    job_name: o.job_name.clone(),
                    job_number: o.job_number,
                    reason: o.reason.clone(),
                })
                .collect(),
            orphan_count: report.orphans.len(),
        }
    }

    /// 没有失败、没有缺失且运行完整
    pub fn is_green(&self) -> bool {
        self.failures.is_empty() && self.omitted_jobs.is_empty() && !self.incomplete
    }
}
