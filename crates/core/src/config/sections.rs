use serde::{Deserialize, Serialize};

use super::validation::{ConfigValidator, ValidationUtils};
use crate::{PipelineError, PipelineResult};

/// 分片规划配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// 没有任何历史耗时数据时的默认权重（秒）
    pub fallback_weight: f64,
    /// 为 true 时越界的分片索引被钳制为 0，否则直接报配置错误
    pub clamp_out_of_range_index: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            fallback_weight: 15.0,
            clamp_out_of_range_index: false,
        }
    }
}

impl ConfigValidator for PlannerConfig {
    fn validate(&self) -> PipelineResult<()> {
        if !self.fallback_weight.is_finite() || self.fallback_weight <= 0.0 {
            return Err(PipelineError::Configuration(
                "planner.fallback_weight must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

/// CircleCI 访问配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleCiConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// 显式指定的项目 slug，优先级最高
    pub project_slug: Option<String>,
    pub vcs_type: String,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// 单个列表接口累计拉取的记录上限
    pub max_records: usize,
    pub request_timeout_seconds: u64,
}

impl Default for CircleCiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://circleci.com/api/v2".to_string(),
            token: None,
            project_slug: None,
            vcs_type: "gh".to_string(),
            max_attempts: 3,
            retry_base_delay_ms: 2000,
            max_records: 1000,
            request_timeout_seconds: 30,
        }
    }
}

impl ConfigValidator for CircleCiConfig {
    fn validate(&self) -> PipelineResult<()> {
        ValidationUtils::validate_http_url(&self.base_url, "circleci.base_url")?;
        ValidationUtils::validate_not_empty(&self.vcs_type, "circleci.vcs_type")?;
        ValidationUtils::validate_count(self.max_attempts as usize, "circleci.max_attempts", 10)?;
        ValidationUtils::validate_count(self.max_records, "circleci.max_records", 100_000)?;
        ValidationUtils::validate_seconds(
            self.request_timeout_seconds,
            "circleci.request_timeout_seconds",
            600,
        )?;
        Ok(())
    }
}

/// 完成轮询配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// 需要等待的作业名前缀（矩阵作业如 `e2e (0)` 按前缀匹配）
    pub job_prefixes: Vec<String>,
    pub poll_interval_seconds: u64,
    pub timeout_seconds: u64,
    /// 连续多少次没有匹配到作业后直接结束
    pub max_empty_polls: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            job_prefixes: vec!["e2e".to_string()],
            poll_interval_seconds: 30,
            timeout_seconds: 3 * 3600,
            max_empty_polls: 10,
        }
    }
}

impl ConfigValidator for PollerConfig {
    fn validate(&self) -> PipelineResult<()> {
        ValidationUtils::validate_entries(&self.job_prefixes, "poller.job_prefixes")?;
        ValidationUtils::validate_seconds(
            self.poll_interval_seconds,
            "poller.poll_interval_seconds",
            600,
        )?;
        ValidationUtils::validate_seconds(self.timeout_seconds, "poller.timeout_seconds", 24 * 3600)?;
        ValidationUtils::validate_count(
            self.max_empty_polls as usize,
            "poller.max_empty_polls",
            1000,
        )?;
        Ok(())
    }
}

/// 产物匹配打分策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// 产物名包含测试文件派生名
    pub derived_name_weight: i32,
    /// 产物名包含测试显示名
    pub display_name_weight: i32,
    /// 产物名包含任一失败提示词
    pub hint_weight: i32,
    pub hints: Vec<String>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            derived_name_weight: 5,
            display_name_weight: 3,
            hint_weight: 1,
            hints: ["fail", "error", "assert", "timeout"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// 失败聚合配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub job_prefixes: Vec<String>,
    /// 诊断产物路径中必须出现的目录标记（不区分大小写）
    pub path_markers: Vec<String>,
    pub image_extensions: Vec<String>,
    /// 没有结构化测试记录时仍然保留的产物标记
    pub failed_marker: String,
    pub max_concurrent_jobs: usize,
    /// 为 true 时 skipped 结果不计入失败
    pub ignore_skipped: bool,
    pub scoring: ScoringPolicy,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            job_prefixes: vec!["e2e".to_string()],
            path_markers: vec!["artifacts".to_string(), "screenshots".to_string()],
            image_extensions: ["png", "jpg", "jpeg", "gif", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            failed_marker: "FAILED".to_string(),
            max_concurrent_jobs: 4,
            ignore_skipped: false,
            scoring: ScoringPolicy::default(),
        }
    }
}

impl ConfigValidator for AggregatorConfig {
    fn validate(&self) -> PipelineResult<()> {
        ValidationUtils::validate_entries(&self.job_prefixes, "aggregator.job_prefixes")?;
        ValidationUtils::validate_entries(&self.path_markers, "aggregator.path_markers")?;
        if self.image_extensions.is_empty() {
            return Err(PipelineError::Configuration(
                "aggregator.image_extensions cannot be empty".to_string(),
            ));
        }
        ValidationUtils::validate_entries(&self.image_extensions, "aggregator.image_extensions")?;
        ValidationUtils::validate_not_empty(&self.failed_marker, "aggregator.failed_marker")?;
        ValidationUtils::validate_count(
            self.max_concurrent_jobs,
            "aggregator.max_concurrent_jobs",
            64,
        )?;
        Ok(())
    }
}

/// GitHub 访问与通知配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub app_id: Option<String>,
    pub installation_id: Option<String>,
    /// PEM 私钥，允许字面换行或 `\n` 转义
    pub private_key: Option<String>,
    pub token: Option<String>,
    pub status_enabled: bool,
    pub status_context: String,
    /// 置顶评论的唯一标记
    pub marker: String,
    /// 单次请求超时，评论失败不能拖住 CI
    pub request_timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: None,
            repo: None,
            app_id: None,
            installation_id: None,
            private_key: None,
            token: None,
            status_enabled: false,
            status_context: "e2e/tests".to_string(),
            marker: "<!-- e2e-pipeline:sticky-report -->".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl GitHubConfig {
    /// App 凭据是否完整
    pub fn has_app_credentials(&self) -> bool {
        [&self.app_id, &self.installation_id, &self.private_key]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

impl ConfigValidator for GitHubConfig {
    fn validate(&self) -> PipelineResult<()> {
        ValidationUtils::validate_http_url(&self.api_url, "github.api_url")?;
        ValidationUtils::validate_not_empty(&self.status_context, "github.status_context")?;
        ValidationUtils::validate_seconds(
            self.request_timeout_seconds,
            "github.request_timeout_seconds",
            300,
        )?;
        ValidationUtils::validate_not_empty(&self.marker, "github.marker")?;
        if !(self.marker.starts_with("<!--") && self.marker.ends_with("-->")) {
            return Err(PipelineError::Configuration(
                "github.marker must be an HTML comment so it never renders as text".to_string(),
            ));
        }
        if self.marker.contains('\n') {
            return Err(PipelineError::Configuration(
                "github.marker must be a single line".to_string(),
            ));
        }
        Ok(())
    }
}
