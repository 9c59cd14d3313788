use async_trait::async_trait;

use crate::{
    models::{Artifact, Job, Pipeline, ProjectSlug, TestResult, Workflow},
    PipelineResult,
};

/// 远程CI服务接口
///
/// 列表接口返回的都是分页拉取后合并的完整序列。资源不存在时返回
/// `PipelineError::NotFound`，由调用方决定是否当作空数据处理。
#[async_trait]
pub trait CiProvider: Send + Sync {
    /// 按分支列出流水线，最新的在前
    async fn list_pipelines(
        &self,
        slug: &ProjectSlug,
        branch: &str,
    ) -> PipelineResult<Vec<Pipeline>>;

    /// 获取单条流水线
    async fn get_pipeline(&self, pipeline_id: &str) -> PipelineResult<Pipeline>;

    /// 列出流水线下的工作流
    async fn list_workflows(&self, pipeline_id: &str) -> PipelineResult<Vec<Workflow>>;

    /// 获取单个工作流
    async fn get_workflow(&self, workflow_id: &str) -> PipelineResult<Workflow>;

    /// 列出工作流下的作业
    async fn list_jobs(&self, workflow_id: &str) -> PipelineResult<Vec<Job>>;

    /// 列出作业的测试结果
    async fn list_tests(
        &self,
        slug: &ProjectSlug,
        job_number: u64,
    ) -> PipelineResult<Vec<TestResult>>;

    /// 列出作业的产物
    async fn list_artifacts(
        &self,
        slug: &ProjectSlug,
        job_number: u64,
    ) -> PipelineResult<Vec<Artifact>>;
}
