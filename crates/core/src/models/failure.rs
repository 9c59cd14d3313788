use serde::{Deserialize, Serialize};

use super::{Artifact, Job, TestResult};

/// 失败测试与其最匹配的诊断图片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub job: Job,
    pub test: TestResult,
    pub image: Option<Artifact>,
}

/// 被选中但没有对应失败记录的诊断产物
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanArtifact {
    pub job_name: String,
    pub job_number: u64,
    pub artifact: Artifact,
}

/// 因拉取失败而缺失数据的作业
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOmission {
    pub job_name: String,
    pub job_number: Option<u64>,
    pub reason: String,
}

/// 失败聚合结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub records: Vec<FailureRecord>,
    pub orphans: Vec<OrphanArtifact>,
    pub omissions: Vec<JobOmission>,
    /// 参与聚合的终态作业数量
    pub jobs_examined: usize,
}

impl AggregateReport {
    pub fn is_clean(&self) -> bool {
        self.records.is_empty() && self.orphans.is_empty() && self.omissions.is_empty()
    }
}
