use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CI项目标识，形如 `gh/org/repo`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectSlug(String);

impl ProjectSlug {
    /// 接受 `vcs/org/repo` 或 `org/repo`（后者补上 vcs 前缀）
    pub fn parse(raw: &str, default_vcs: &str) -> Option<Self> {
        let segments: Vec<&str> = raw
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        match segments.as_slice() {
            [vcs, org, repo] => Some(Self(format!("{vcs}/{org}/{repo}"))),
            [org, repo] => Some(Self(format!("{default_vcs}/{org}/{repo}"))),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 返回 (org, repo)
    pub fn owner_and_repo(&self) -> (&str, &str) {
        let mut parts = self.0.splitn(3, '/').skip(1);
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default();
        (owner, repo)
    }
}

impl fmt::Display for ProjectSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// CI流水线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub number: u64,
    pub state: String,
    pub branch: Option<String>,
    pub revision: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// 流水线下的工作流
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub status: String,
    pub pipeline_id: String,
    pub pipeline_number: u64,
    pub project_slug: Option<String>,
}

/// 作业状态
///
/// 只有 success/failed/error/canceled 及其供应商别名是终态，其余一律视为进行中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Success,
    Failed,
    Error,
    Canceled,
    Pending(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
            JobStatus::Canceled => "canceled",
            JobStatus::Pending(raw) => raw,
        }
    }
}

impl From<&str> for JobStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "success" => JobStatus::Success,
            "failed" | "failure" => JobStatus::Failed,
            "error" | "infrastructure_fail" | "timedout" => JobStatus::Error,
            "canceled" | "cancelled" => JobStatus::Canceled,
            other => JobStatus::Pending(other.to_string()),
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        JobStatus::from(raw.as_str())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 工作流中的单个作业（矩阵展开后如 `e2e (0)`、`e2e (1)`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Option<String>,
    pub name: String,
    /// 尚未开始或审批类作业没有编号
    pub number: Option<u64>,
    pub status: JobStatus,
}

impl Job {
    pub fn matches_prefix(&self, prefixes: &[String]) -> bool {
        prefixes.is_empty() || prefixes.iter().any(|p| self.name.starts_with(p.as_str()))
    }
}

/// 一次运行的身份信息，用于报告与通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub pipeline_id: String,
    pub pipeline_number: u64,
    pub workflow_id: String,
    pub workflow_name: String,
    pub workflow_status: String,
    pub branch: Option<String>,
    pub revision: Option<String>,
}

/// 轮询结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollReason {
    /// 所有匹配作业均已进入终态
    Completed,
    /// 多次轮询都没有匹配到作业
    NoJobs,
    /// 超过截止时间，仍有作业未结束
    TimedOut,
}

/// 完成轮询的结果，写入文件供报告阶段使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOutcome {
    pub reason: PollReason,
    pub total: usize,
    pub pending: usize,
    pub ticks: u32,
    pub jobs: Vec<Job>,
}

impl PollOutcome {
    pub fn is_incomplete(&self) -> bool {
        self.reason == PollReason::TimedOut && self.pending > 0
    }
}
